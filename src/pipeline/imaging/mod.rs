//! Raster intake and pixel statistics.
//!
//! Pure read-only analysis: the caller's buffer is never mutated, only read
//! into transient derived buffers (grayscale, downscaled copy).

pub mod raster;
pub mod stats;
pub mod decode;

pub use decode::*;
pub use raster::*;
pub use stats::*;

use super::AnalysisError;

/// A downscaled raster plus its statistics, ready for the analysis stages.
///
/// Owned by one session until signal extraction consumes it.
#[derive(Debug, Clone)]
pub struct AnalysisFrame {
    /// Working raster (longest side capped).
    pub raster: RasterBuffer,
    pub stats: PixelStatistics,
    /// Dimensions of the caller's buffer before downscaling.
    pub native_width: u32,
    pub native_height: u32,
}

/// Downscale the caller's raster and compute its statistics.
pub fn prepare_frame(
    raster: &RasterBuffer,
    max_dimension: u32,
) -> Result<AnalysisFrame, AnalysisError> {
    raster.ensure_not_empty()?;

    let working = raster.downscaled(max_dimension);
    let stats = compute_statistics(&working)?;

    Ok(AnalysisFrame {
        raster: working.into_owned(),
        stats,
        native_width: raster.width(),
        native_height: raster.height(),
    })
}
