//! Quality Gate: four independent checks over pixel statistics.
//!
//! Advisory, not a hard stop. The report is surfaced to the caller so a
//! retake can be offered; analysis may still proceed after a failure.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::imaging::PixelStatistics;

/// Laplacian variance below this = blurry.
pub const SHARPNESS_THRESHOLD: f64 = 15.0;

/// Mean luminance below this = too dark.
pub const LIGHTING_LOW: f64 = 60.0;

/// Mean luminance above this = too bright.
pub const LIGHTING_HIGH: f64 = 220.0;

/// Bright-pixel fraction at or above this = glare.
pub const GLARE_THRESHOLD: f64 = 0.08;

pub const MIN_WIDTH: u32 = 200;
pub const MIN_HEIGHT: u32 = 200;

const SHARPNESS_OK: &str = "Sharpness looks good";
const SHARPNESS_BLURRY: &str = "Image is too blurry — try holding your phone steady";
const LIGHTING_OK: &str = "Lighting looks good";
const LIGHTING_DARK: &str = "Too dark — move to better lighting";
const LIGHTING_BRIGHT: &str = "Too bright — reduce direct light";
const GLARE_OK: &str = "No significant glare";
const GLARE_DETECTED: &str = "Glare detected — tilt to avoid reflections";
const RESOLUTION_OK: &str = "Resolution is sufficient";
const OVERALL_OK: &str = "Image quality is good — ready to continue";
const OVERALL_ISSUES: &str = "Some issues detected — retaking may give better guidance";

/// One scored check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Display score (rounded; see `assess_quality`).
    pub score: f64,
    pub pass: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCheck {
    pub pass: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QualityCheck {
    Sharpness,
    Lighting,
    Glare,
    Resolution,
}

/// Quality verdict for one captured image. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub pass: bool,
    pub sharpness: CheckResult,
    pub lighting: CheckResult,
    pub glare: CheckResult,
    pub resolution: ResolutionCheck,
    /// User-facing summary; names the failing checks when there are any.
    pub overall: String,
}

impl QualityReport {
    /// Failing checks in fixed order: sharpness, lighting, glare, resolution.
    pub fn failing_checks(&self) -> Vec<QualityCheck> {
        [
            (QualityCheck::Sharpness, self.sharpness.pass),
            (QualityCheck::Lighting, self.lighting.pass),
            (QualityCheck::Glare, self.glare.pass),
            (QualityCheck::Resolution, self.resolution.pass),
        ]
        .into_iter()
        .filter(|(_, pass)| !pass)
        .map(|(check, _)| check)
        .collect()
    }

    /// Messages of the failing checks, same order as `failing_checks`.
    pub fn issues(&self) -> Vec<&str> {
        self.failing_checks()
            .into_iter()
            .map(|check| match check {
                QualityCheck::Sharpness => self.sharpness.message.as_str(),
                QualityCheck::Lighting => self.lighting.message.as_str(),
                QualityCheck::Glare => self.glare.message.as_str(),
                QualityCheck::Resolution => self.resolution.message.as_str(),
            })
            .collect()
    }
}

/// Evaluate the four checks.
///
/// `native_width` / `native_height` are the caller's buffer dimensions
/// before the analysis downscale. Pass flags use unrounded statistics;
/// display scores are rounded: sharpness to 0.1, lighting to an integer,
/// glare as a percentage to 0.1.
pub fn assess_quality(
    stats: &PixelStatistics,
    native_width: u32,
    native_height: u32,
) -> QualityReport {
    let sharpness_pass = stats.laplacian_variance >= SHARPNESS_THRESHOLD;
    let lighting_pass =
        stats.mean_brightness >= LIGHTING_LOW && stats.mean_brightness <= LIGHTING_HIGH;
    let glare_pass = stats.bright_fraction < GLARE_THRESHOLD;
    let resolution_pass = native_width >= MIN_WIDTH && native_height >= MIN_HEIGHT;

    let pass = sharpness_pass && lighting_pass && glare_pass && resolution_pass;

    let lighting_message = if lighting_pass {
        LIGHTING_OK
    } else if stats.mean_brightness < LIGHTING_LOW {
        LIGHTING_DARK
    } else {
        LIGHTING_BRIGHT
    };

    debug!(
        sharpness_pass,
        lighting_pass,
        glare_pass,
        resolution_pass,
        pass,
        "Quality gate evaluated"
    );

    let mut report = QualityReport {
        pass,
        sharpness: CheckResult {
            score: round_to(stats.laplacian_variance, 1),
            pass: sharpness_pass,
            message: if sharpness_pass { SHARPNESS_OK } else { SHARPNESS_BLURRY }.into(),
        },
        lighting: CheckResult {
            score: stats.mean_brightness.round(),
            pass: lighting_pass,
            message: lighting_message.into(),
        },
        glare: CheckResult {
            score: round_to(stats.bright_fraction * 100.0, 1),
            pass: glare_pass,
            message: if glare_pass { GLARE_OK } else { GLARE_DETECTED }.into(),
        },
        resolution: ResolutionCheck {
            pass: resolution_pass,
            message: if resolution_pass {
                RESOLUTION_OK.into()
            } else {
                format!("Image too small (need at least {MIN_WIDTH}×{MIN_HEIGHT}px)")
            },
        },
        overall: OVERALL_OK.into(),
    };

    if !pass {
        let summary = format!("{OVERALL_ISSUES}: {}", report.issues().join("; "));
        report.overall = summary;
    }
    report
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
