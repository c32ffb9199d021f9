//! Check-in analysis pipeline.
//!
//! Stages, leaves first:
//! ```text
//! imaging (pixel statistics) → quality (gate) → signals (metrics)
//!   → safety (red flags) → guidance (categories + action plan)
//! ```
//! Every stage is a pure function of its inputs. The session state machine
//! in `crate::session` sequences them for one check-in.

pub mod imaging;
pub mod quality;
pub mod signals;
pub mod safety;
pub mod guidance;

use std::sync::Arc;

use thiserror::Error;

use crate::config::PipelineConfig;
use crate::models::{CheckInAssessment, CheckInResult, SymptomContext};
use imaging::{prepare_frame, AnalysisFrame, RasterBuffer};
use quality::{assess_quality, QualityReport};
use signals::{extract_with_fallback, SignalExtractor};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Empty or malformed raster. The caller must re-capture.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Model-backed extraction has no usable model. Recovered locally.
    #[error("Model-backed analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    #[error("Image decoding failed: {0}")]
    Decode(String),

    #[error("Analysis task failed: {0}")]
    TaskFailed(String),
}

/// Run the post-quality stages on a prepared frame.
///
/// Consumes the frame so no pixel data outlives signal extraction.
pub fn assess_frame(
    frame: AnalysisFrame,
    quality: QualityReport,
    symptoms: &SymptomContext,
    extractor: &dyn SignalExtractor,
) -> Result<CheckInAssessment, AnalysisError> {
    let metrics = extract_with_fallback(extractor, &frame);
    drop(frame);
    Ok(guidance::assemble_check_in(metrics?, symptoms.clone(), quality))
}

/// Full pipeline over one decoded raster and one questionnaire.
///
/// The quality verdict is advisory: analysis proceeds after a failed gate,
/// the report travels with the result.
pub fn run_check_in(
    raster: &RasterBuffer,
    symptoms: &SymptomContext,
    extractor: &dyn SignalExtractor,
    config: &PipelineConfig,
) -> Result<CheckInResult, AnalysisError> {
    let frame = prepare_frame(raster, config.max_analysis_dimension)?;
    let quality = assess_quality(&frame.stats, frame.native_width, frame.native_height);
    let assessment = assess_frame(frame, quality, symptoms, extractor)?;
    Ok(CheckInResult::new(assessment))
}

/// `run_check_in` on the tokio blocking pool, for async hosts.
pub async fn run_check_in_async(
    raster: RasterBuffer,
    symptoms: SymptomContext,
    extractor: Arc<dyn SignalExtractor>,
    config: PipelineConfig,
) -> Result<CheckInResult, AnalysisError> {
    tokio::task::spawn_blocking(move || {
        run_check_in(&raster, &symptoms, extractor.as_ref(), &config)
    })
    .await
    .map_err(|e| AnalysisError::TaskFailed(e.to_string()))?
}
