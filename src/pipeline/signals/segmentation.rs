//! Mask-restricted signal extraction.
//!
//! A `Segmenter` marks which pixels belong to the skin region; the metric
//! formulas then run over those pixels only.

use image::{Rgba, RgbaImage};
use tracing::debug;

use super::{metrics_from_color_signals, SignalExtractor, SkinMetrics, HEURISTIC_RELIABILITY};
use crate::pipeline::imaging::{color_signals, AnalysisFrame, RasterBuffer};
use crate::pipeline::AnalysisError;

/// Ellipse radii of the placeholder mask, as fractions of width / height.
const ELLIPSE_RX: f64 = 0.28;
const ELLIPSE_RY: f64 = 0.18;

pub const DEFAULT_OVERLAY_COLOR: [u8; 3] = [255, 0, 0];
pub const DEFAULT_OVERLAY_OPACITY: f64 = 0.35;

/// Binary region mask, row-major, one byte per cell (0 or 1).
///
/// Callers build it through `new`, which checks `data` holds `width * height`
/// cells; lookups still treat missing cells as background.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
    confidence: f64,
}

impl SegmentationMask {
    pub fn new(width: u32, height: u32, data: Vec<u8>, confidence: f64) -> Result<Self, AnalysisError> {
        let expected = (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(AnalysisError::AnalysisUnavailable(format!(
                "mask has {} cells, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Segmenter's confidence in this mask, in [0, 1].
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Whether cell `(mx, my)` is foreground. Out-of-range cells are not.
    fn cell(&self, mx: usize, my: usize) -> bool {
        self.data
            .get(my * self.width as usize + mx)
            .is_some_and(|&v| v != 0)
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Nearest-neighbour lookup of raster pixel `(x, y)` in a
    /// `raster_w` x `raster_h` raster.
    pub fn covers(&self, x: u32, y: u32, raster_w: u32, raster_h: u32) -> bool {
        if self.width == 0 || self.height == 0 || raster_w == 0 || raster_h == 0 {
            return false;
        }
        let mx = ((x as u64 * self.width as u64) / raster_w as u64).min(self.width as u64 - 1);
        let my = ((y as u64 * self.height as u64) / raster_h as u64).min(self.height as u64 - 1);
        self.cell(mx as usize, my as usize)
    }
}

/// Produces a skin-region mask for a raster.
pub trait Segmenter: Send + Sync {
    fn name(&self) -> &'static str;

    fn segment(&self, raster: &RasterBuffer) -> Result<SegmentationMask, AnalysisError>;
}

/// Shipped stub: no trained weights, always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSegmenter;

impl Segmenter for UnavailableSegmenter {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn segment(&self, _raster: &RasterBuffer) -> Result<SegmentationMask, AnalysisError> {
        Err(AnalysisError::AnalysisUnavailable(
            "no segmentation model installed".into(),
        ))
    }
}

/// Centred-ellipse placeholder mask. Confidence never exceeds the heuristic's.
#[derive(Debug, Clone, Copy, Default)]
pub struct EllipseSegmenter;

impl Segmenter for EllipseSegmenter {
    fn name(&self) -> &'static str {
        "ellipse"
    }

    fn segment(&self, raster: &RasterBuffer) -> Result<SegmentationMask, AnalysisError> {
        let (w, h) = (raster.width(), raster.height());
        SegmentationMask::new(w, h, ellipse_mask(w, h), HEURISTIC_RELIABILITY)
    }
}

/// Cells inside the ellipse centred at (w/2, h/2) with radii 0.28w, 0.18h.
pub fn ellipse_mask(width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as f64, height as f64);
    let (cx, cy) = (w * 0.5, h * 0.5);
    let (rx, ry) = (w * ELLIPSE_RX, h * ELLIPSE_RY);

    let mut mask = vec![0u8; (width as usize) * (height as usize)];
    if rx <= 0.0 || ry <= 0.0 {
        return mask;
    }
    for y in 0..height as usize {
        for x in 0..width as usize {
            let dx = (x as f64 - cx) / rx;
            let dy = (y as f64 - cy) / ry;
            if dx * dx + dy * dy <= 1.0 {
                mask[y * width as usize + x] = 1;
            }
        }
    }
    mask
}

/// Metrics over the pixels a `Segmenter` marks as skin.
pub struct SegmentationSignalExtractor<S> {
    segmenter: S,
}

impl<S: Segmenter> SegmentationSignalExtractor<S> {
    pub fn new(segmenter: S) -> Self {
        Self { segmenter }
    }

    pub fn segmenter(&self) -> &S {
        &self.segmenter
    }
}

impl<S: Segmenter> SignalExtractor for SegmentationSignalExtractor<S> {
    fn name(&self) -> &'static str {
        "segmentation"
    }

    fn extract(&self, frame: &AnalysisFrame) -> Result<SkinMetrics, AnalysisError> {
        let mask = self.segmenter.segment(&frame.raster)?;
        let (w, h) = (frame.raster.width(), frame.raster.height());

        let masked = frame
            .raster
            .rgba_chunks()
            .enumerate()
            .filter(|(i, _)| {
                let (x, y) = ((*i as u32) % w, (*i as u32) / w);
                mask.covers(x, y, w, h)
            })
            .map(|(_, p)| p);

        let signals = color_signals(masked).ok_or_else(|| {
            AnalysisError::AnalysisUnavailable(format!(
                "{} produced an empty mask",
                self.segmenter.name()
            ))
        })?;

        debug!(
            segmenter = self.segmenter.name(),
            masked_pixels = signals.pixel_count,
            confidence = mask.confidence,
            "Mask-restricted signals computed"
        );

        Ok(metrics_from_color_signals(&signals, mask.confidence))
    }
}

/// Render a mask as a translucent RGBA layer for display over the photo.
///
/// Covered cells get `color` at alpha `floor(255 * opacity)`; the rest stay
/// fully transparent.
pub fn overlay_rgba(mask: &SegmentationMask, color: [u8; 3], opacity: f64) -> RgbaImage {
    let alpha = (255.0 * opacity.clamp(0.0, 1.0)).floor() as u8;
    let on = Rgba([color[0], color[1], color[2], alpha]);
    let off = Rgba([0, 0, 0, 0]);

    RgbaImage::from_fn(mask.width, mask.height, |x, y| {
        if mask.cell(x as usize, y as usize) {
            on
        } else {
            off
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::imaging::prepare_frame;
    use crate::pipeline::signals::extract_with_fallback;

    struct FixedSegmenter(SegmentationMask);

    impl Segmenter for FixedSegmenter {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn segment(&self, _raster: &RasterBuffer) -> Result<SegmentationMask, AnalysisError> {
            Ok(self.0.clone())
        }
    }

    /// Left half red, right half mid gray.
    fn split_frame() -> AnalysisFrame {
        let mut img = RgbaImage::from_pixel(20, 10, Rgba([128, 128, 128, 255]));
        for y in 0..10 {
            for x in 0..10 {
                img.put_pixel(x, y, Rgba([220, 60, 60, 255]));
            }
        }
        prepare_frame(&RasterBuffer::from_image(img), 512).unwrap()
    }

    #[test]
    fn ellipse_mask_is_centred() {
        let mask = ellipse_mask(100, 100);
        assert_eq!(mask[50 * 100 + 50], 1);
        assert_eq!(mask[0], 0);
        // rx = 28, ry = 18
        assert_eq!(mask[50 * 100 + 77], 1);
        assert_eq!(mask[50 * 100 + 79], 0);
        assert_eq!(mask[67 * 100 + 50], 1);
        assert_eq!(mask[69 * 100 + 50], 0);
    }

    #[test]
    fn mask_restricts_pixels() {
        // Coarse 2x1 mask covering only the left (red) half.
        let mask = SegmentationMask::new(2, 1, vec![1, 0], 0.9).unwrap();
        let extractor = SegmentationSignalExtractor::new(FixedSegmenter(mask));
        let m = extractor.extract(&split_frame()).unwrap();

        assert_eq!(m.redness, 1.0);
        assert_eq!(m.texture, 0.0);
        assert!((m.reliability - 0.9).abs() < 1e-9);
    }

    #[test]
    fn empty_mask_is_unavailable() {
        let mask = SegmentationMask::new(2, 1, vec![0, 0], 0.9).unwrap();
        let extractor = SegmentationSignalExtractor::new(FixedSegmenter(mask));
        assert!(matches!(
            extractor.extract(&split_frame()),
            Err(AnalysisError::AnalysisUnavailable(_))
        ));
    }

    #[test]
    fn mask_shape_mismatch_rejected() {
        assert!(SegmentationMask::new(4, 4, vec![1; 3], 0.5).is_err());
    }

    #[test]
    fn short_mask_data_reads_as_background() {
        // Bypasses `new` to hold fewer cells than 4x4.
        let mask = SegmentationMask {
            width: 4,
            height: 4,
            data: vec![1; 3],
            confidence: 0.5,
        };
        assert!(mask.covers(0, 0, 4, 4));
        assert!(!mask.covers(3, 3, 4, 4));

        let layer = overlay_rgba(&mask, DEFAULT_OVERLAY_COLOR, 1.0);
        assert_eq!(layer.get_pixel(2, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(layer.get_pixel(3, 3), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn accessors_expose_validated_mask() {
        let mask = SegmentationMask::new(2, 1, vec![1, 0], 1.7).unwrap();
        assert_eq!((mask.width(), mask.height()), (2, 1));
        assert_eq!(mask.data(), &[1, 0]);
        assert_eq!(mask.confidence(), 1.0);
    }

    #[test]
    fn unavailable_segmenter_recovers_via_heuristic() {
        let extractor = SegmentationSignalExtractor::new(UnavailableSegmenter);
        let frame = split_frame();
        assert!(extractor.extract(&frame).is_err());

        let m = extract_with_fallback(&extractor, &frame).unwrap();
        assert!((m.reliability - HEURISTIC_RELIABILITY).abs() < 1e-9);
    }

    #[test]
    fn ellipse_confidence_never_exceeds_heuristic() {
        let extractor = SegmentationSignalExtractor::new(EllipseSegmenter);
        let m = extractor.extract(&split_frame()).unwrap();
        assert!(m.reliability <= HEURISTIC_RELIABILITY);
    }

    #[test]
    fn overlay_uses_floor_alpha() {
        let mask = SegmentationMask::new(2, 1, vec![1, 0], 1.0).unwrap();
        let layer = overlay_rgba(&mask, DEFAULT_OVERLAY_COLOR, DEFAULT_OVERLAY_OPACITY);
        assert_eq!(layer.get_pixel(0, 0), &Rgba([255, 0, 0, 89]));
        assert_eq!(layer.get_pixel(1, 0), &Rgba([0, 0, 0, 0]));
    }
}
