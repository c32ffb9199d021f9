use serde::{Deserialize, Serialize};

use super::categories::{SkinCategory, ACNE_LIKE, IRRITATION};
use crate::models::{StressLevel, SymptomContext};

const BASELINE_DO: [&str; 3] = [
    "Wash with a gentle, fragrance-free cleanser (morning and night)",
    "Apply a basic moisturizer after cleansing",
    "Use SPF 30+ sunscreen during the day",
];

const BASELINE_AVOID: [&str; 3] = [
    "Harsh scrubs or exfoliants",
    "Layering multiple new products at once",
    "Touching or picking at the area",
];

const BASELINE_TRACK: [&str; 3] = [
    "Take a follow-up photo in 5–7 days (same lighting)",
    "Note any new products or changes",
    "Watch for spreading, increased pain, or fever",
];

const PRODUCT_TIPS: [&str; 3] = [
    "Look for 'non-comedogenic' and 'fragrance-free' on labels",
    "Introduce only ONE new product at a time",
    "Always patch-test on your inner wrist for 24 hours first",
];

const ACNE_DO: &str =
    "If you want to try a spot treatment, benzoyl peroxide 2.5% is a gentle starting point";
const ACNE_AVOID: &str = "Heavy or oily sunscreens — look for gel-based instead";
const IRRITATION_DO: &str =
    "Consider applying a thin layer of plain petroleum jelly on the area at night";
const IRRITATION_AVOID: &str = "Any active ingredients (acids, retinoids) until irritation calms down";
const STRESS_DO: &str = "Stress can affect skin — even 5 min of deep breathing or a walk can help";

/// Four ordered lists, displayed verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    pub do_items: Vec<String>,
    pub avoid_items: Vec<String>,
    pub track_items: Vec<String>,
    pub product_tips: Vec<String>,
}

/// Baseline lists, then top-category tips, then the stress tip.
pub fn compose_action_plan(categories: &[SkinCategory], symptoms: &SymptomContext) -> ActionPlan {
    let mut plan = ActionPlan {
        do_items: owned(&BASELINE_DO),
        avoid_items: owned(&BASELINE_AVOID),
        track_items: owned(&BASELINE_TRACK),
        product_tips: owned(&PRODUCT_TIPS),
    };

    match categories.first().map(|c| c.name.as_str()) {
        Some(ACNE_LIKE) => {
            plan.do_items.push(ACNE_DO.into());
            plan.avoid_items.push(ACNE_AVOID.into());
        }
        Some(IRRITATION) => {
            plan.do_items.push(IRRITATION_DO.into());
            plan.avoid_items.push(IRRITATION_AVOID.into());
        }
        _ => {}
    }

    if symptoms.stress_level == StressLevel::High {
        plan.do_items.push(STRESS_DO.into());
    }

    plan
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
