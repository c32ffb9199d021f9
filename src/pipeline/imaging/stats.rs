use serde::{Deserialize, Serialize};
use tracing::debug;

use super::raster::RasterBuffer;
use crate::pipeline::AnalysisError;

/// Luminance above this counts toward the glare fraction.
pub const BRIGHT_LUMINANCE: f64 = 245.0;

/// Luminance below this counts toward the dark (spot) fraction.
pub const DARK_LUMINANCE: f64 = 80.0;

/// Red channel floor for a red-dominant pixel.
pub const RED_CHANNEL_FLOOR: f64 = 140.0;

/// Red must exceed green and blue by this factor.
pub const RED_DOMINANCE_RATIO: f64 = 1.3;

/// Aggregate statistics of one analysed raster.
///
/// Deterministic: identical buffers give bit-identical values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelStatistics {
    /// Dimensions of the analysed (downscaled) raster.
    pub width: u32,
    pub height: u32,
    /// Population mean of luminance (0-255).
    pub mean_brightness: f64,
    /// Population variance of the 3x3 Laplacian over interior pixels.
    pub laplacian_variance: f64,
    /// Fraction of pixels with luminance > 245.
    pub bright_fraction: f64,
    /// Fraction of red-dominant pixels.
    pub red_dominance_fraction: f64,
    /// Fraction of pixels with luminance < 80.
    pub dark_fraction: f64,
    /// Mean over pixels of the summed absolute channel deviations from the
    /// buffer-wide channel means.
    pub color_deviation: f64,
}

/// Color-only readings over an arbitrary set of pixels.
///
/// Shared by the whole-image statistics and the mask-restricted path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSignals {
    pub pixel_count: usize,
    pub red_dominance_fraction: f64,
    pub dark_fraction: f64,
    pub color_deviation: f64,
}

/// ITU-R BT.601 luminance.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

#[inline]
pub fn is_red_dominant(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    r > RED_CHANNEL_FLOOR && r > g * RED_DOMINANCE_RATIO && r > b * RED_DOMINANCE_RATIO
}

/// Compute pixel statistics for a raster. Fails on an empty raster.
pub fn compute_statistics(raster: &RasterBuffer) -> Result<PixelStatistics, AnalysisError> {
    raster.ensure_not_empty()?;

    let (w, h) = (raster.width(), raster.height());
    let gray = to_luminance(raster);
    let count = gray.len() as f64;

    let mut sum = 0.0f64;
    let mut bright = 0usize;
    for &lum in &gray {
        sum += lum;
        if lum > BRIGHT_LUMINANCE {
            bright += 1;
        }
    }

    let colors = color_signals(raster.rgba_chunks())
        .ok_or_else(|| AnalysisError::InvalidImage("raster has no pixels".into()))?;

    let stats = PixelStatistics {
        width: w,
        height: h,
        mean_brightness: sum / count,
        laplacian_variance: laplacian_variance(&gray, w as usize, h as usize),
        bright_fraction: bright as f64 / count,
        red_dominance_fraction: colors.red_dominance_fraction,
        dark_fraction: colors.dark_fraction,
        color_deviation: colors.color_deviation,
    };

    debug!(
        size = format!("{w}x{h}"),
        mean_brightness = stats.mean_brightness,
        laplacian_variance = stats.laplacian_variance,
        bright_fraction = stats.bright_fraction,
        "Pixel statistics computed"
    );

    Ok(stats)
}

/// Grayscale copy as floating-point luminance, row-major.
pub fn to_luminance(raster: &RasterBuffer) -> Vec<f64> {
    raster
        .rgba_chunks()
        .map(|p| luminance(p[0], p[1], p[2]))
        .collect()
}

/// Laplacian variance: higher = sharper.
///
/// 3x3 kernel `[0,-1,0; -1,4,-1; 0,-1,0]` at every interior pixel; border
/// pixels excluded. Rasters without interior pixels score 0.
pub fn laplacian_variance(gray: &[f64], w: usize, h: usize) -> f64 {
    if w < 3 || h < 3 || gray.len() < w * h {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = gray[y * w + x];
            let lap = 4.0 * center
                - gray[(y - 1) * w + x]
                - gray[y * w + (x - 1)]
                - gray[y * w + (x + 1)]
                - gray[(y + 1) * w + x];
            sum += lap;
            sum_sq += lap * lap;
            count += 1;
        }
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64) - (mean * mean);
    variance.max(0.0)
}

/// Red-dominance, dark fraction and mean absolute color deviation over a
/// set of RGBA pixels (four bytes each). `None` for an empty set.
///
/// Two passes: channel means first, deviations second.
pub fn color_signals<'a, I>(pixels: I) -> Option<ColorSignals>
where
    I: Iterator<Item = &'a [u8]> + Clone,
{
    let mut count = 0usize;
    let mut channel_sums = [0.0f64; 3];
    let mut red = 0usize;
    let mut dark = 0usize;

    for p in pixels.clone() {
        let (r, g, b) = (p[0], p[1], p[2]);
        channel_sums[0] += r as f64;
        channel_sums[1] += g as f64;
        channel_sums[2] += b as f64;
        if is_red_dominant(r, g, b) {
            red += 1;
        }
        if luminance(r, g, b) < DARK_LUMINANCE {
            dark += 1;
        }
        count += 1;
    }

    if count == 0 {
        return None;
    }

    let n = count as f64;
    let means = channel_sums.map(|s| s / n);

    let deviation_sum: f64 = pixels
        .map(|p| {
            (p[0] as f64 - means[0]).abs()
                + (p[1] as f64 - means[1]).abs()
                + (p[2] as f64 - means[2]).abs()
        })
        .sum();

    Some(ColorSignals {
        pixel_count: count,
        red_dominance_fraction: red as f64 / n,
        dark_fraction: dark as f64 / n,
        color_deviation: deviation_sum / n,
    })
}
