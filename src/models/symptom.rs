use serde::{Deserialize, Serialize};

use super::enums::{ItchOrPain, StressLevel, SymptomDuration};

/// Questionnaire answers for one check-in. Supplied once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomContext {
    pub itch_or_pain: ItchOrPain,
    pub duration: SymptomDuration,
    pub spreading: bool,
    pub fever: bool,
    /// Free text, may be empty.
    pub new_products: String,
    /// Body area.
    pub location: String,
    pub stress_level: StressLevel,
}

impl Default for SymptomContext {
    fn default() -> Self {
        Self {
            itch_or_pain: ItchOrPain::None,
            duration: SymptomDuration::Today,
            spreading: false,
            fever: false,
            new_products: String::new(),
            location: String::new(),
            stress_level: StressLevel::Skip,
        }
    }
}
