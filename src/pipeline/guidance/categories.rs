//! Category classifier.
//!
//! Educational labels, not diagnoses. Thresholds here are the definition of
//! each category and must not drift.

use serde::{Deserialize, Serialize};

use crate::models::{CategorySeverity, SymptomContext};
use crate::pipeline::signals::SkinMetrics;

pub const ACNE_LIKE: &str = "Acne-like breakout";
pub const IRRITATION: &str = "Irritation or sensitivity";
pub const DRYNESS: &str = "Dryness or texture changes";
pub const MILD_OR_UNCLEAR: &str = "Mild or unclear pattern";

pub const MAX_CATEGORIES: usize = 3;

const FALLBACK_CONFIDENCE: f64 = 0.4;

const ACNE_DESCRIPTION: &str = "Looks like it could be common breakouts — very normal for teens. \
Gentle cleansing and patience usually help most.";
const IRRITATION_DESCRIPTION: &str = "Redness + itchiness can mean your skin is reacting to something — \
a product, weather, or stress. Simplifying your routine often helps.";
const DRYNESS_DESCRIPTION: &str = "Uneven texture or dry patches are super common. A basic moisturizer \
and avoiding harsh products can make a big difference.";
const MILD_DESCRIPTION: &str = "Nothing stands out strongly from the photo, which is usually a good sign! \
Keep up a gentle routine and check in again if anything changes.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinCategory {
    pub name: String,
    /// In [0, 1].
    pub confidence: f64,
    pub description: String,
    pub severity: CategorySeverity,
}

impl SkinCategory {
    fn new(name: &str, confidence: f64, description: &str, severity: CategorySeverity) -> Self {
        Self {
            name: name.to_string(),
            confidence,
            description: description.to_string(),
            severity,
        }
    }

    pub fn fallback() -> Self {
        Self::new(MILD_OR_UNCLEAR, FALLBACK_CONFIDENCE, MILD_DESCRIPTION, CategorySeverity::Low)
    }
}

/// Candidate rules, in evaluation (and tie-break) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CategoryRule {
    AcneLike,
    Irritation,
    Dryness,
}

const RULES: [CategoryRule; 3] = [
    CategoryRule::AcneLike,
    CategoryRule::Irritation,
    CategoryRule::Dryness,
];

impl CategoryRule {
    fn evaluate(self, symptoms: &SymptomContext, m: &SkinMetrics) -> Option<SkinCategory> {
        match self {
            Self::AcneLike => {
                if !(m.spot_count > 5 || (m.redness > 0.3 && m.texture > 0.4)) {
                    return None;
                }
                let confidence = (0.4 + m.spot_count as f64 * 0.03 + m.redness * 0.2).min(0.85);
                let severity = if m.spot_count > 15 || m.redness > 0.6 {
                    CategorySeverity::Medium
                } else {
                    CategorySeverity::Low
                };
                Some(SkinCategory::new(ACNE_LIKE, confidence, ACNE_DESCRIPTION, severity))
            }
            Self::Irritation => {
                if !(m.redness > 0.4 && symptoms.itch_or_pain.involves_itch()) {
                    return None;
                }
                let confidence = (0.35 + m.redness * 0.3).min(0.8);
                let severity = if symptoms.spreading {
                    CategorySeverity::Medium
                } else {
                    CategorySeverity::Low
                };
                Some(SkinCategory::new(IRRITATION, confidence, IRRITATION_DESCRIPTION, severity))
            }
            Self::Dryness => {
                if !(m.texture > 0.5 && m.uniformity < 0.4) {
                    return None;
                }
                Some(SkinCategory::new(
                    DRYNESS,
                    0.5 + m.texture * 0.2,
                    DRYNESS_DESCRIPTION,
                    CategorySeverity::Low,
                ))
            }
        }
    }
}

/// Ranked categories: 1 to 3 entries, confidence non-increasing, ties in
/// rule order. Falls back to "Mild or unclear pattern" when nothing fires.
pub fn classify(symptoms: &SymptomContext, metrics: &SkinMetrics) -> Vec<SkinCategory> {
    let mut categories: Vec<SkinCategory> = RULES
        .iter()
        .filter_map(|rule| rule.evaluate(symptoms, metrics))
        .collect();

    if categories.is_empty() {
        categories.push(SkinCategory::fallback());
    }

    // Stable sort keeps rule order for equal confidences.
    categories.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    categories.truncate(MAX_CATEGORIES);
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItchOrPain;

    fn metrics(spot_count: u32, redness: f64, texture: f64, uniformity: f64) -> SkinMetrics {
        SkinMetrics {
            redness,
            texture,
            spot_count,
            uniformity,
            reliability: 0.55,
        }
    }

    fn itchy() -> SymptomContext {
        SymptomContext {
            itch_or_pain: ItchOrPain::Itch,
            ..SymptomContext::default()
        }
    }

    #[test]
    fn acne_outranks_irritation() {
        let cats = classify(&itchy(), &metrics(20, 0.7, 0.5, 0.3));

        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].name, ACNE_LIKE);
        assert_eq!(cats[0].severity, CategorySeverity::Medium);
        assert!((cats[0].confidence - 0.85).abs() < 1e-9);
        assert_eq!(cats[1].name, IRRITATION);
        assert!((cats[1].confidence - 0.56).abs() < 1e-9);
        assert_eq!(cats[1].severity, CategorySeverity::Low);
    }

    #[test]
    fn quiet_metrics_give_only_fallback() {
        let cats = classify(&SymptomContext::default(), &metrics(0, 0.1, 0.1, 0.9));
        assert_eq!(cats, vec![SkinCategory::fallback()]);
        assert!((cats[0].confidence - 0.4).abs() < 1e-9);
        assert_eq!(cats[0].severity, CategorySeverity::Low);
    }

    #[test]
    fn all_three_rules_fire() {
        let symptoms = SymptomContext {
            itch_or_pain: ItchOrPain::Both,
            spreading: true,
            ..SymptomContext::default()
        };
        let cats = classify(&symptoms, &metrics(2, 0.5, 0.9, 0.1));
        let names: Vec<&str> = cats.iter().map(|c| c.name.as_str()).collect();

        // acne 0.4 + 0.06 + 0.1 = 0.56, irritation 0.35 + 0.15 = 0.5, dryness 0.5 + 0.18 = 0.68
        assert_eq!(names, vec![DRYNESS, ACNE_LIKE, IRRITATION]);
        assert_eq!(cats[2].severity, CategorySeverity::Medium);
    }

    #[test]
    fn acne_severity_thresholds() {
        let low = classify(&SymptomContext::default(), &metrics(15, 0.6, 0.1, 0.9));
        assert_eq!(low[0].name, ACNE_LIKE);
        assert_eq!(low[0].severity, CategorySeverity::Low);

        let many_spots = classify(&SymptomContext::default(), &metrics(16, 0.0, 0.1, 0.9));
        assert_eq!(many_spots[0].severity, CategorySeverity::Medium);
    }

    #[test]
    fn acne_confidence_is_capped() {
        let cats = classify(&SymptomContext::default(), &metrics(30, 1.0, 0.1, 0.9));
        assert!((cats[0].confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn irritation_requires_itch() {
        let pain_only = SymptomContext {
            itch_or_pain: ItchOrPain::Pain,
            ..SymptomContext::default()
        };
        let cats = classify(&pain_only, &metrics(0, 0.9, 0.1, 0.9));
        assert!(cats.iter().all(|c| c.name != IRRITATION));
    }

    #[test]
    fn list_is_bounded_and_sorted() {
        for spots in [0, 3, 6, 16, 30] {
            for redness in [0.0, 0.35, 0.45, 0.65, 1.0] {
                for texture in [0.0, 0.45, 0.6, 1.0] {
                    let m = metrics(spots, redness, texture, 1.0 - texture);
                    let cats = classify(&itchy(), &m);
                    assert!(!cats.is_empty() && cats.len() <= MAX_CATEGORIES);
                    assert!(cats.windows(2).all(|w| w[0].confidence >= w[1].confidence));
                    assert!(cats.iter().all(|c| (0.0..=1.0).contains(&c.confidence)));
                }
            }
        }
    }
}
