//! ONNX Runtime skin segmenter (`onnx-segmentation` feature).

use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use ort::session::Session;

use super::segmentation::{SegmentationMask, Segmenter};
use crate::pipeline::imaging::RasterBuffer;
use crate::pipeline::AnalysisError;

/// Segmentation model loaded into ONNX Runtime.
///
/// Input: `[1, 3, S, S]` float32, RGB in [0, 1], channel-major.
/// Output: per-pixel foreground probability, `[1, 1, H, W]` or `[1, H, W]`.
///
/// `Session::run` needs `&mut self`, hence the Mutex behind the `&self` trait.
pub struct OnnxSegmenter {
    session: Mutex<Session>,
    input_size: u32,
    threshold: f32,
}

impl OnnxSegmenter {
    pub fn load(model_path: &Path, input_size: u32, threshold: f32) -> Result<Self, AnalysisError> {
        if !model_path.exists() {
            return Err(AnalysisError::AnalysisUnavailable(format!(
                "model not found: {}",
                model_path.display()
            )));
        }
        if input_size == 0 {
            return Err(AnalysisError::AnalysisUnavailable(
                "segmentation input size must be positive".into(),
            ));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| AnalysisError::AnalysisUnavailable(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e: ort::Error| AnalysisError::AnalysisUnavailable(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e: ort::Error| {
                AnalysisError::AnalysisUnavailable(format!("ONNX load failed: {e}"))
            })?;

        tracing::info!("ONNX segmenter loaded from {}", model_path.display());

        Ok(Self {
            session: Mutex::new(session),
            input_size,
            threshold,
        })
    }

    /// Stretch to S x S and lay out as a CHW tensor in [0, 1].
    fn input_tensor(&self, raster: &RasterBuffer) -> Result<ndarray::Array4<f32>, AnalysisError> {
        let size = self.input_size;
        let resized = image::imageops::resize(raster.as_image(), size, size, FilterType::Triangle);

        let plane = (size as usize) * (size as usize);
        let mut chw = vec![0.0f32; 3 * plane];
        for (i, p) in resized.as_raw().chunks_exact(4).enumerate() {
            chw[i] = p[0] as f32 / 255.0;
            chw[i + plane] = p[1] as f32 / 255.0;
            chw[i + 2 * plane] = p[2] as f32 / 255.0;
        }

        ndarray::Array4::from_shape_vec((1, 3, size as usize, size as usize), chw)
            .map_err(|e| AnalysisError::AnalysisUnavailable(e.to_string()))
    }
}

impl Segmenter for OnnxSegmenter {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn segment(&self, raster: &RasterBuffer) -> Result<SegmentationMask, AnalysisError> {
        use ort::value::TensorRef;

        raster.ensure_not_empty()?;
        let input = self.input_tensor(raster)?;
        let tensor = TensorRef::from_array_view(&input)
            .map_err(|e| AnalysisError::AnalysisUnavailable(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| AnalysisError::AnalysisUnavailable("Session lock poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| AnalysisError::AnalysisUnavailable(format!("ONNX inference failed: {e}")))?;

        let (shape, probs) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalysisError::AnalysisUnavailable(format!("Output extraction: {e}")))?;

        if shape.len() < 3 {
            return Err(AnalysisError::AnalysisUnavailable(format!(
                "Unexpected output shape: {shape:?}, expected [1, 1, H, W] or [1, H, W]"
            )));
        }
        let h = shape[shape.len() - 2].max(0) as u32;
        let w = shape[shape.len() - 1].max(0) as u32;
        let cells = (w as usize) * (h as usize);
        if probs.len() < cells {
            return Err(AnalysisError::AnalysisUnavailable(format!(
                "output has {} values, expected at least {cells}",
                probs.len()
            )));
        }

        let mut data = Vec::with_capacity(cells);
        let mut fg_sum = 0.0f64;
        let mut fg_count = 0usize;
        for &p in &probs[..cells] {
            if p >= self.threshold {
                data.push(1);
                fg_sum += p as f64;
                fg_count += 1;
            } else {
                data.push(0);
            }
        }

        let confidence = if fg_count > 0 { fg_sum / fg_count as f64 } else { 0.0 };

        tracing::debug!(
            mask = format!("{w}x{h}"),
            foreground = fg_count,
            confidence,
            "ONNX segmentation complete"
        );

        SegmentationMask::new(w, h, data, confidence)
    }
}
