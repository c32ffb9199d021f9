//! Signal Extractor: derived visual metrics for one check-in.
//!
//! One interface, interchangeable backends selected once per deployment:
//! - `HeuristicSignalExtractor`: pixel-statistics approximation, fixed
//!   moderate reliability.
//! - `SegmentationSignalExtractor`: metrics restricted to a segmentation
//!   mask; reliability comes from the segmenter.
//!
//! Downstream stages only ever see `SkinMetrics`.

pub mod heuristic;
pub mod segmentation;
#[cfg(feature = "onnx-segmentation")]
pub mod onnx;

pub use heuristic::*;
pub use segmentation::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::imaging::{AnalysisFrame, ColorSignals};
use super::AnalysisError;
use crate::config::{PipelineConfig, SignalBackend};

/// Redness saturates once this share of pixels is red-dominant (1 / 5).
const REDNESS_GAIN: f64 = 5.0;

/// Mean absolute color deviation mapping to texture 1.0.
const TEXTURE_SCALE: f64 = 200.0;

/// Spots per unit of dark fraction.
const SPOT_GAIN: f64 = 50.0;

pub const MAX_SPOT_COUNT: u32 = 30;

/// Below this the UI collaborator shows a retake hint.
pub const MODERATE_RELIABILITY: f64 = 0.6;

/// Visual indices for one check-in. Bounded to [0, 1] except `spot_count`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinMetrics {
    pub redness: f64,
    pub texture: f64,
    pub spot_count: u32,
    pub uniformity: f64,
    /// How trustworthy this reading is. Not a medical likelihood.
    pub reliability: f64,
}

impl SkinMetrics {
    /// Hint shown next to a moderate-reliability reading.
    pub fn reliability_note(&self) -> Option<&'static str> {
        (self.reliability < MODERATE_RELIABILITY).then_some(
            "🔎 Reliability is moderate — consider retaking with better lighting \
             or checking in again in a few days for a clearer picture.",
        )
    }
}

/// Derives `SkinMetrics` from an analysis frame.
pub trait SignalExtractor: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn extract(&self, frame: &AnalysisFrame) -> Result<SkinMetrics, AnalysisError>;
}

/// Build the deployment's extractor from config.
///
/// The segmentation backend uses the ONNX model when compiled with
/// `onnx-segmentation` and the model loads; otherwise the stub segmenter,
/// whose `AnalysisUnavailable` is recovered by `extract_with_fallback`.
pub fn build_extractor(config: &PipelineConfig) -> Arc<dyn SignalExtractor> {
    match config.signal_backend {
        SignalBackend::Heuristic => Arc::new(HeuristicSignalExtractor),
        SignalBackend::Segmentation => build_segmentation_extractor(config),
    }
}

#[cfg(feature = "onnx-segmentation")]
fn build_segmentation_extractor(config: &PipelineConfig) -> Arc<dyn SignalExtractor> {
    let loaded = crate::config::segmentation_model_path()
        .ok_or_else(|| AnalysisError::AnalysisUnavailable("no home directory".into()))
        .and_then(|path| {
            onnx::OnnxSegmenter::load(&path, config.segmentation_input_size, config.mask_threshold)
        });

    match loaded {
        Ok(segmenter) => Arc::new(SegmentationSignalExtractor::new(segmenter)),
        Err(e) => {
            warn!(error = %e, "Segmentation model not loaded, extractor will fall back");
            Arc::new(SegmentationSignalExtractor::new(UnavailableSegmenter))
        }
    }
}

#[cfg(not(feature = "onnx-segmentation"))]
fn build_segmentation_extractor(_config: &PipelineConfig) -> Arc<dyn SignalExtractor> {
    Arc::new(SegmentationSignalExtractor::new(UnavailableSegmenter))
}

/// Run `extractor`, recovering `AnalysisUnavailable` with the heuristic.
///
/// The recovery is logged, never surfaced; the lower `reliability` of the
/// heuristic reading is the only trace the caller sees. Any other error
/// (an invalid image above all) is returned as is.
pub fn extract_with_fallback(
    extractor: &dyn SignalExtractor,
    frame: &AnalysisFrame,
) -> Result<SkinMetrics, AnalysisError> {
    match extractor.extract(frame) {
        Ok(metrics) => Ok(metrics),
        Err(AnalysisError::AnalysisUnavailable(reason)) => {
            warn!(
                backend = extractor.name(),
                reason = %reason,
                "Signal extraction unavailable, using pixel-statistics approximation"
            );
            Ok(heuristic_metrics(&frame.stats))
        }
        Err(e) => Err(e),
    }
}

/// Shared metric formulas over color readings.
pub(crate) fn metrics_from_signals(
    red_dominance_fraction: f64,
    color_deviation: f64,
    dark_fraction: f64,
    reliability: f64,
) -> SkinMetrics {
    let redness = (red_dominance_fraction * REDNESS_GAIN).min(1.0);
    let texture = (color_deviation / TEXTURE_SCALE).min(1.0);
    let uniformity = (1.0 - texture).max(0.0);
    let spot_count = ((dark_fraction * SPOT_GAIN).round() as u32).min(MAX_SPOT_COUNT);

    SkinMetrics {
        redness: round2(redness),
        texture: round2(texture),
        spot_count,
        uniformity: round2(uniformity),
        reliability: reliability.clamp(0.0, 1.0),
    }
}

pub(crate) fn metrics_from_color_signals(signals: &ColorSignals, reliability: f64) -> SkinMetrics {
    metrics_from_signals(
        signals.red_dominance_fraction,
        signals.color_deviation,
        signals.dark_fraction,
        reliability,
    )
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::imaging::{prepare_frame, RasterBuffer};
    use image::{Rgba, RgbaImage};

    struct BrokenExtractor;

    struct RejectingExtractor;

    impl SignalExtractor for RejectingExtractor {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        fn extract(&self, _frame: &AnalysisFrame) -> Result<SkinMetrics, AnalysisError> {
            Err(AnalysisError::InvalidImage("corrupt tensor input".into()))
        }
    }

    impl SignalExtractor for BrokenExtractor {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn extract(&self, _frame: &AnalysisFrame) -> Result<SkinMetrics, AnalysisError> {
            Err(AnalysisError::AnalysisUnavailable("no weights".into()))
        }
    }

    fn frame() -> AnalysisFrame {
        let raster = RasterBuffer::from_image(RgbaImage::from_pixel(64, 64, Rgba([200, 90, 90, 255])));
        prepare_frame(&raster, 512).unwrap()
    }

    #[test]
    fn formulas_saturate_and_cap() {
        let m = metrics_from_signals(0.5, 500.0, 0.9, 0.55);
        assert_eq!(m.redness, 1.0);
        assert_eq!(m.texture, 1.0);
        assert_eq!(m.uniformity, 0.0);
        assert_eq!(m.spot_count, MAX_SPOT_COUNT);
    }

    #[test]
    fn formulas_scale_linearly_below_caps() {
        let m = metrics_from_signals(0.1, 60.0, 0.1, 0.55);
        assert!((m.redness - 0.5).abs() < 1e-9);
        assert!((m.texture - 0.3).abs() < 1e-9);
        assert!((m.uniformity - 0.7).abs() < 1e-9);
        assert_eq!(m.spot_count, 5);
    }

    #[test]
    fn metrics_rounded_to_two_decimals() {
        let m = metrics_from_signals(0.01234, 33.3, 0.0, 0.55);
        assert!((m.redness - 0.06).abs() < 1e-9);
        assert!((m.texture - 0.17).abs() < 1e-9);
        assert!((m.uniformity - 0.83).abs() < 1e-9);
    }

    #[test]
    fn unavailable_backend_falls_back_to_heuristic() {
        let frame = frame();
        let metrics = extract_with_fallback(&BrokenExtractor, &frame).unwrap();
        assert_eq!(metrics, heuristic_metrics(&frame.stats));
        assert!((metrics.reliability - HEURISTIC_RELIABILITY).abs() < 1e-9);
    }

    #[test]
    fn invalid_image_is_not_recovered() {
        let err = extract_with_fallback(&RejectingExtractor, &frame()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidImage(_)));
    }

    #[test]
    fn default_config_builds_heuristic() {
        let extractor = build_extractor(&PipelineConfig::default());
        assert_eq!(extractor.name(), "heuristic");
    }

    #[test]
    fn segmentation_backend_without_model_still_yields_metrics() {
        let config = PipelineConfig {
            signal_backend: SignalBackend::Segmentation,
            ..PipelineConfig::default()
        };
        let extractor = build_extractor(&config);
        let frame = frame();
        let metrics = extract_with_fallback(extractor.as_ref(), &frame).unwrap();
        assert!(metrics.reliability <= HEURISTIC_RELIABILITY + 1e-9);
    }

    #[test]
    fn reliability_note_only_when_moderate() {
        let low = metrics_from_signals(0.0, 0.0, 0.0, 0.55);
        let high = metrics_from_signals(0.0, 0.0, 0.0, 0.9);
        assert!(low.reliability_note().is_some());
        assert!(high.reliability_note().is_none());
    }
}
