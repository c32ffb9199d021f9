use super::{metrics_from_signals, SignalExtractor, SkinMetrics};
use crate::pipeline::imaging::{AnalysisFrame, PixelStatistics};
use crate::pipeline::AnalysisError;

/// Fixed reliability of the pixel-statistics approximation.
pub const HEURISTIC_RELIABILITY: f64 = 0.55;

/// Whole-image approximation over precomputed pixel statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSignalExtractor;

impl SignalExtractor for HeuristicSignalExtractor {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn extract(&self, frame: &AnalysisFrame) -> Result<SkinMetrics, AnalysisError> {
        Ok(heuristic_metrics(&frame.stats))
    }
}

/// Metrics straight from whole-image statistics. Never fails.
pub fn heuristic_metrics(stats: &PixelStatistics) -> SkinMetrics {
    metrics_from_signals(
        stats.red_dominance_fraction,
        stats.color_deviation,
        stats.dark_fraction,
        HEURISTIC_RELIABILITY,
    )
}
