use std::borrow::Cow;
use std::slice::ChunksExact;

use image::imageops::FilterType;
use image::RgbaImage;
use tracing::debug;

use crate::pipeline::AnalysisError;

/// Immutable RGBA pixel grid supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    image: RgbaImage,
}

impl RasterBuffer {
    /// Wrap an already-decoded image.
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Build from packed RGBA bytes (`width * height * 4`).
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, AnalysisError> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(AnalysisError::InvalidImage(format!(
                "expected {expected} bytes for {width}x{height} RGBA, got {}",
                data.len()
            )));
        }

        RgbaImage::from_raw(width, height, data)
            .map(Self::from_image)
            .ok_or_else(|| AnalysisError::InvalidImage("raw buffer rejected".into()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel_count(&self) -> usize {
        (self.width() as usize) * (self.height() as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Packed RGBA pixels, four bytes per item, row-major.
    pub fn rgba_chunks(&self) -> ChunksExact<'_, u8> {
        self.image.as_raw().chunks_exact(4)
    }

    pub(crate) fn ensure_not_empty(&self) -> Result<(), AnalysisError> {
        if self.is_empty() {
            return Err(AnalysisError::InvalidImage(format!(
                "empty raster ({}x{})",
                self.width(),
                self.height()
            )));
        }
        Ok(())
    }

    /// Aspect-preserving downscale so the longest side is at most `max_dim`.
    /// Uses `Cow` to avoid cloning when no downscale is needed.
    pub fn downscaled(&self, max_dim: u32) -> Cow<'_, RasterBuffer> {
        let (w, h) = (self.width(), self.height());
        let largest = w.max(h);

        if largest <= max_dim || max_dim == 0 {
            return Cow::Borrowed(self);
        }

        let (new_w, new_h) = fit_dimensions(w, h, max_dim);

        debug!(
            from = format!("{w}x{h}"),
            to = format!("{new_w}x{new_h}"),
            "Downscaling raster for analysis"
        );

        Cow::Owned(Self::from_image(image::imageops::resize(
            &self.image,
            new_w,
            new_h,
            FilterType::Triangle,
        )))
    }
}

/// Scale so the longest edge equals `max_dim`; never upscales, never below 1px.
pub fn fit_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let largest = width.max(height);
    if largest == 0 || largest <= max_dim {
        return (width, height);
    }

    let scale = max_dim as f64 / largest as f64;
    let new_w = ((width as f64 * scale).round() as u32).max(1);
    let new_h = ((height as f64 * scale).round() as u32).max(1);
    (new_w, new_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_accepts_exact_length() {
        let raster = RasterBuffer::from_rgba(2, 3, vec![0; 24]).unwrap();
        assert_eq!(raster.width(), 2);
        assert_eq!(raster.height(), 3);
        assert_eq!(raster.pixel_count(), 6);
    }

    #[test]
    fn from_rgba_rejects_short_buffer() {
        let err = RasterBuffer::from_rgba(4, 4, vec![0; 10]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidImage(_)));
        assert!(err.to_string().contains("expected 64 bytes"));
    }

    #[test]
    fn zero_sized_raster_is_empty() {
        let raster = RasterBuffer::from_rgba(0, 0, Vec::new()).unwrap();
        assert!(raster.is_empty());
        assert!(raster.ensure_not_empty().is_err());
    }

    #[test]
    fn small_raster_not_copied() {
        let raster = RasterBuffer::from_image(RgbaImage::new(300, 200));
        assert!(matches!(raster.downscaled(512), Cow::Borrowed(_)));
    }

    #[test]
    fn large_raster_downscaled_preserving_aspect() {
        let raster = RasterBuffer::from_image(RgbaImage::new(2000, 1000));
        let scaled = raster.downscaled(512);
        assert_eq!(scaled.width(), 512);
        assert_eq!(scaled.height(), 256);
    }

    #[test]
    fn fit_dimensions_never_below_one() {
        assert_eq!(fit_dimensions(5000, 2, 512), (512, 1));
        assert_eq!(fit_dimensions(100, 100, 512), (100, 100));
        assert_eq!(fit_dimensions(768, 1024, 512), (384, 512));
    }
}
