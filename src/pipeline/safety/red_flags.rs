//! Red-flag rules over questionnaire answers and visual metrics.
//!
//! Every rule is evaluated (no short-circuit); each contributes at most one
//! flag, in registry order.

use serde::{Deserialize, Serialize};

use crate::models::{EscalationLevel, SymptomContext, SymptomDuration};
use crate::pipeline::signals::SkinMetrics;

/// Redness above this combined with spreading is a flag.
pub const HIGH_REDNESS: f64 = 0.7;

/// Flag count at or above which escalation is urgent care.
const URGENT_FLAG_COUNT: usize = 3;

/// Outcome of red-flag evaluation for one check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedFlagResult {
    /// True iff `flags` is non-empty.
    pub triggered: bool,
    pub flags: Vec<String>,
    pub escalation_level: EscalationLevel,
    /// Fixed message for `escalation_level`. Empty for `none`.
    pub message: String,
}

/// A hard-coded red-flag rule.
struct RedFlagRule {
    /// Stable identifier for logs.
    id: &'static str,
    condition: RedFlagCondition,
    flag: &'static str,
}

enum RedFlagCondition {
    /// Fever reported.
    Fever,
    /// Spreading and not new today.
    PersistentSpread,
    /// Pain (alone or with itch) for more than a week.
    PersistentPain,
    /// High visual redness and spreading.
    HighRednessSpreading,
}

impl RedFlagCondition {
    fn matches(&self, symptoms: &SymptomContext, metrics: &SkinMetrics) -> bool {
        match self {
            Self::Fever => symptoms.fever,
            Self::PersistentSpread => {
                symptoms.spreading && symptoms.duration != SymptomDuration::Today
            }
            Self::PersistentPain => {
                symptoms.itch_or_pain.involves_pain()
                    && symptoms.duration == SymptomDuration::MoreThanWeek
            }
            Self::HighRednessSpreading => metrics.redness > HIGH_REDNESS && symptoms.spreading,
        }
    }
}

// ── Rule registry ───────────────────────────────────────────

const RULES: &[RedFlagRule] = &[
    RedFlagRule {
        id: "RF-FEVER",
        condition: RedFlagCondition::Fever,
        flag: "Fever combined with skin changes — may need medical attention",
    },
    RedFlagRule {
        id: "RF-SPREAD",
        condition: RedFlagCondition::PersistentSpread,
        flag: "Spreading rash that has persisted — worth getting checked",
    },
    RedFlagRule {
        id: "RF-PAIN",
        condition: RedFlagCondition::PersistentPain,
        flag: "Persistent pain lasting over a week — consider seeing someone",
    },
    RedFlagRule {
        id: "RF-REDNESS",
        condition: RedFlagCondition::HighRednessSpreading,
        flag: "High redness with spreading pattern — may benefit from professional evaluation",
    },
];

// ── Evaluation ──────────────────────────────────────────────

/// Evaluate all red-flag rules and derive the escalation level.
pub fn detect_red_flags(symptoms: &SymptomContext, metrics: &SkinMetrics) -> RedFlagResult {
    let fired: Vec<&RedFlagRule> = RULES
        .iter()
        .filter(|rule| rule.condition.matches(symptoms, metrics))
        .collect();

    let escalation_level = escalation_for(fired.len(), symptoms.fever);

    if !fired.is_empty() {
        let ids: Vec<&str> = fired.iter().map(|r| r.id).collect();
        tracing::warn!(
            rules = ?ids,
            escalation = escalation_level.as_str(),
            "Red flags triggered"
        );
    }

    RedFlagResult {
        triggered: !fired.is_empty(),
        flags: fired.iter().map(|r| r.flag.to_string()).collect(),
        escalation_level,
        message: escalation_message(escalation_level).to_string(),
    }
}

/// Precedence: fever or 3+ flags, then 2 flags, then 1 flag.
pub fn escalation_for(flag_count: usize, fever: bool) -> EscalationLevel {
    if fever || flag_count >= URGENT_FLAG_COUNT {
        EscalationLevel::UrgentCare
    } else if flag_count == 2 {
        EscalationLevel::Nurse
    } else if flag_count == 1 {
        EscalationLevel::Guardian
    } else {
        EscalationLevel::None
    }
}

/// Fixed user-facing message per escalation level.
pub fn escalation_message(level: EscalationLevel) -> &'static str {
    match level {
        EscalationLevel::None => "",
        EscalationLevel::Monitor => "Keep an eye on this and check in again in a few days.",
        EscalationLevel::Guardian => {
            "It might be a good idea to mention this to a parent or guardian — they can help you decide next steps."
        }
        EscalationLevel::Nurse => {
            "Consider talking to your school nurse or a trusted adult. They can take a quick look and let you know if you should see a doctor."
        }
        EscalationLevel::UrgentCare => {
            "We'd recommend having a doctor or clinic look at this soon — some of what you described could benefit from professional guidance."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItchOrPain, StressLevel};

    fn metrics(redness: f64) -> SkinMetrics {
        SkinMetrics {
            redness,
            texture: 0.2,
            spot_count: 0,
            uniformity: 0.8,
            reliability: 0.55,
        }
    }

    fn quiet() -> SymptomContext {
        SymptomContext::default()
    }

    #[test]
    fn no_symptoms_no_flags() {
        let result = detect_red_flags(&quiet(), &metrics(0.9));
        assert!(!result.triggered);
        assert!(result.flags.is_empty());
        assert_eq!(result.escalation_level, EscalationLevel::None);
        assert_eq!(result.message, "");
    }

    #[test]
    fn fever_alone_is_urgent_care() {
        let symptoms = SymptomContext {
            fever: true,
            ..quiet()
        };
        let result = detect_red_flags(&symptoms, &metrics(0.0));
        assert!(result.triggered);
        assert_eq!(result.flags.len(), 1);
        assert_eq!(result.escalation_level, EscalationLevel::UrgentCare);
        assert!(result.message.contains("doctor or clinic"));
    }

    #[test]
    fn fever_wins_regardless_of_other_fields() {
        for itch in [ItchOrPain::None, ItchOrPain::Itch, ItchOrPain::Pain, ItchOrPain::Both] {
            for duration in [
                SymptomDuration::Today,
                SymptomDuration::FewDays,
                SymptomDuration::Week,
                SymptomDuration::MoreThanWeek,
            ] {
                for spreading in [false, true] {
                    let symptoms = SymptomContext {
                        itch_or_pain: itch,
                        duration,
                        spreading,
                        fever: true,
                        stress_level: StressLevel::Low,
                        ..quiet()
                    };
                    let result = detect_red_flags(&symptoms, &metrics(0.9));
                    assert_eq!(result.escalation_level, EscalationLevel::UrgentCare);
                }
            }
        }
    }

    #[test]
    fn spreading_today_is_not_persistent() {
        let symptoms = SymptomContext {
            spreading: true,
            ..quiet()
        };
        let result = detect_red_flags(&symptoms, &metrics(0.0));
        assert!(!result.triggered);
    }

    #[test]
    fn two_flags_is_nurse_in_rule_order() {
        let symptoms = SymptomContext {
            spreading: true,
            duration: SymptomDuration::FewDays,
            ..quiet()
        };
        let result = detect_red_flags(&symptoms, &metrics(0.8));
        assert_eq!(result.escalation_level, EscalationLevel::Nurse);
        assert_eq!(
            result.flags,
            vec![
                "Spreading rash that has persisted — worth getting checked",
                "High redness with spreading pattern — may benefit from professional evaluation",
            ]
        );
    }

    #[test]
    fn three_flags_without_fever_is_urgent_care() {
        let symptoms = SymptomContext {
            spreading: true,
            duration: SymptomDuration::MoreThanWeek,
            itch_or_pain: ItchOrPain::Both,
            ..quiet()
        };
        let result = detect_red_flags(&symptoms, &metrics(0.75));
        assert_eq!(result.flags.len(), 3);
        assert_eq!(result.escalation_level, EscalationLevel::UrgentCare);
    }

    #[test]
    fn single_pain_flag_is_guardian() {
        let symptoms = SymptomContext {
            itch_or_pain: ItchOrPain::Pain,
            duration: SymptomDuration::MoreThanWeek,
            ..quiet()
        };
        let result = detect_red_flags(&symptoms, &metrics(0.1));
        assert_eq!(result.escalation_level, EscalationLevel::Guardian);
        assert!(result.message.contains("parent or guardian"));
    }

    #[test]
    fn redness_threshold_is_strict() {
        let symptoms = SymptomContext {
            spreading: true,
            ..quiet()
        };
        assert!(!detect_red_flags(&symptoms, &metrics(0.7)).triggered);
        assert!(detect_red_flags(&symptoms, &metrics(0.71)).triggered);
    }

    #[test]
    fn adding_a_symptom_never_lowers_escalation() {
        let durations = [
            SymptomDuration::Today,
            SymptomDuration::FewDays,
            SymptomDuration::Week,
            SymptomDuration::MoreThanWeek,
        ];
        for itch in [ItchOrPain::None, ItchOrPain::Itch, ItchOrPain::Pain, ItchOrPain::Both] {
            for duration in durations {
                for redness in [0.2, 0.9] {
                    for spreading in [false, true] {
                        let base = SymptomContext {
                            itch_or_pain: itch,
                            duration,
                            spreading,
                            ..quiet()
                        };
                        let level = detect_red_flags(&base, &metrics(redness)).escalation_level;

                        let with_fever = SymptomContext { fever: true, ..base.clone() };
                        assert!(detect_red_flags(&with_fever, &metrics(redness)).escalation_level >= level);

                        let with_spread = SymptomContext { spreading: true, ..base.clone() };
                        assert!(detect_red_flags(&with_spread, &metrics(redness)).escalation_level >= level);

                        let with_pain = SymptomContext { itch_or_pain: ItchOrPain::Both, ..base.clone() };
                        assert!(detect_red_flags(&with_pain, &metrics(redness)).escalation_level >= level);
                    }
                }
            }
        }
    }

    #[test]
    fn monitor_has_a_message_but_no_rule_yields_it() {
        assert!(!escalation_message(EscalationLevel::Monitor).is_empty());
        for count in 0..5 {
            for fever in [false, true] {
                assert_ne!(escalation_for(count, fever), EscalationLevel::Monitor);
            }
        }
    }
}
