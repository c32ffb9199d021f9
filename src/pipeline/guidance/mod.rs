//! Educational guidance: non-diagnostic categories and a conservative plan.

pub mod categories;
pub mod action_plan;

pub use action_plan::*;
pub use categories::*;

use crate::models::{CheckInAssessment, SymptomContext};
use super::quality::QualityReport;
use super::safety::detect_red_flags;
use super::signals::SkinMetrics;

/// Combine the post-extraction stages into one assessment.
pub fn assemble_check_in(
    metrics: SkinMetrics,
    symptoms: SymptomContext,
    quality: QualityReport,
) -> CheckInAssessment {
    let red_flags = detect_red_flags(&symptoms, &metrics);
    let categories = classify(&symptoms, &metrics);
    let action_plan = compose_action_plan(&categories, &symptoms);

    tracing::info!(
        top_category = categories.first().map(|c| c.name.as_str()).unwrap_or(""),
        escalation = red_flags.escalation_level.as_str(),
        reliability = metrics.reliability,
        quality_pass = quality.pass,
        "Check-in assessed"
    );

    CheckInAssessment {
        quality,
        metrics,
        symptoms,
        categories,
        red_flags,
        action_plan,
    }
}
