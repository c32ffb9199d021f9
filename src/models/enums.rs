use serde::{Deserialize, Serialize};

use super::InputError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
///
/// Variant order is declaration order, so `Ord` follows it.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InputError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InputError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(
    /// Whether the area itches, hurts, both, or neither.
    ItchOrPain {
        None => "none",
        Itch => "itch",
        Pain => "pain",
        Both => "both",
    }
);

str_enum!(
    /// How long the user has noticed the change.
    SymptomDuration {
        Today => "today",
        FewDays => "fewDays",
        Week => "week",
        MoreThanWeek => "moreThanWeek",
    }
);

str_enum!(StressLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
    Skip => "skip",
});

str_enum!(CategorySeverity {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(
    /// Recommended human follow-up, totally ordered from `None` to `UrgentCare`.
    EscalationLevel {
        None => "none",
        Monitor => "monitor",
        Guardian => "guardian",
        Nurse => "nurse",
        UrgentCare => "urgentCare",
    }
);

impl ItchOrPain {
    pub fn involves_pain(&self) -> bool {
        matches!(self, Self::Pain | Self::Both)
    }

    pub fn involves_itch(&self) -> bool {
        matches!(self, Self::Itch | Self::Both)
    }
}
