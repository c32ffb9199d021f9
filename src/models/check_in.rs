use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::symptom::SymptomContext;
use crate::pipeline::guidance::{ActionPlan, SkinCategory};
use crate::pipeline::quality::QualityReport;
use crate::pipeline::safety::RedFlagResult;
use crate::pipeline::signals::SkinMetrics;

/// Everything a check-in derives from its inputs. Identity-free, so two
/// runs over identical inputs compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInAssessment {
    pub quality: QualityReport,
    pub metrics: SkinMetrics,
    pub symptoms: SymptomContext,
    pub categories: Vec<SkinCategory>,
    pub red_flags: RedFlagResult,
    pub action_plan: ActionPlan,
}

/// One completed check-in, handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResult {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub assessment: CheckInAssessment,
}

impl CheckInResult {
    /// Stamp an assessment with a fresh identity and the current time.
    pub fn new(assessment: CheckInAssessment) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            assessment,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
