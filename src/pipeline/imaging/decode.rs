//! Optional inbound helper: encoded bytes to `RasterBuffer`.
//!
//! The analysis core works on decoded pixels; hosts that only hold file
//! bytes (camera roll, file picker) can use this instead of their own decoder.
//! Phone photos embed rotation in EXIF tag 0x0112, applied here so the
//! analysed raster matches what the user saw.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView};
use tracing::debug;

use super::raster::RasterBuffer;
use crate::pipeline::AnalysisError;

/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// Smallest valid PNG is ~67 bytes.
const MIN_IMAGE_BYTES: usize = 67;

/// Decode PNG/JPEG bytes, apply EXIF orientation, convert to RGBA.
pub fn decode_image(bytes: &[u8]) -> Result<RasterBuffer, AnalysisError> {
    validate_image_bytes(bytes)?;

    let img = image::load_from_memory(bytes)
        .map_err(|e| AnalysisError::Decode(format!("Failed to decode image: {e}")))?;
    let (orig_w, orig_h) = img.dimensions();

    let orientation = read_exif_orientation(bytes);
    let img = apply_orientation(img, orientation);

    debug!(
        original = format!("{orig_w}x{orig_h}"),
        orientation,
        "Decoded captured image"
    );

    Ok(RasterBuffer::from_image(img.to_rgba8()))
}

pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), AnalysisError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(AnalysisError::InvalidImage(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AnalysisError::InvalidImage(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// EXIF orientation tag, 1 (normal) when absent.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// 1 = normal, 2 = mirrored, 3 = 180, 4 = flipped V, 5 = mirrored + 90 CW,
/// 6 = 90 CW, 7 = mirrored + 270 CW, 8 = 270 CW.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
