use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Unfilter";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest side of the raster the analysis stages work on.
pub const DEFAULT_MAX_ANALYSIS_DIMENSION: u32 = 512;

/// Square input edge for the segmentation model.
pub const DEFAULT_SEGMENTATION_INPUT_SIZE: u32 = 256;

/// Probability at or above which a segmentation output pixel is foreground.
pub const DEFAULT_MASK_THRESHOLD: f32 = 0.5;

/// Env var selecting the signal backend (`heuristic` | `segmentation`).
pub const SIGNAL_BACKEND_ENV: &str = "UNFILTER_SIGNAL_BACKEND";

/// Env var overriding the analysis downscale cap.
pub const MAX_ANALYSIS_DIM_ENV: &str = "UNFILTER_MAX_ANALYSIS_DIM";

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "unfilter_lib=info"
}

/// Get the application data directory (~/Unfilter/).
/// `None` when the platform has no home directory.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Get the models directory (for ONNX segmentation weights).
pub fn models_dir() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("models"))
}

/// Default location of the skin segmentation model.
pub fn segmentation_model_path() -> Option<PathBuf> {
    models_dir().map(|dir| dir.join("skin_seg.onnx"))
}

/// Which Signal Extractor implementation a deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalBackend {
    /// Pixel-statistics approximation. Fixed moderate reliability.
    Heuristic,
    /// Segmentation-mask backed metrics. Reliability comes from the model.
    Segmentation,
}

impl SignalBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heuristic => "heuristic",
            Self::Segmentation => "segmentation",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "mock" => Some(Self::Heuristic),
            "segmentation" | "model" => Some(Self::Segmentation),
            _ => None,
        }
    }
}

/// Per-deployment pipeline settings. Selected once, not per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub max_analysis_dimension: u32,
    pub signal_backend: SignalBackend,
    pub segmentation_input_size: u32,
    pub mask_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_analysis_dimension: DEFAULT_MAX_ANALYSIS_DIMENSION,
            signal_backend: SignalBackend::Heuristic,
            segmentation_input_size: DEFAULT_SEGMENTATION_INPUT_SIZE,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `UNFILTER_SIGNAL_BACKEND` / `UNFILTER_MAX_ANALYSIS_DIM`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(SIGNAL_BACKEND_ENV) {
            match SignalBackend::parse(&raw) {
                Some(backend) => config.signal_backend = backend,
                None => tracing::warn!(
                    value = %raw,
                    "Unknown signal backend, keeping {}",
                    config.signal_backend.as_str()
                ),
            }
        }

        if let Some(raw) = lookup(MAX_ANALYSIS_DIM_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(dim) if dim > 0 => config.max_analysis_dimension = dim,
                _ => tracing::warn!(
                    value = %raw,
                    "Invalid analysis dimension, keeping {}",
                    config.max_analysis_dimension
                ),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_dir_under_app_data() {
        if let (Some(models), Some(app)) = (models_dir(), app_data_dir()) {
            assert!(models.starts_with(&app));
            assert!(models.ends_with("models"));
            assert!(app.ends_with("Unfilter"));
        }
    }

    #[test]
    fn segmentation_model_is_onnx_file() {
        if let Some(path) = segmentation_model_path() {
            assert_eq!(path.file_name().unwrap(), "skin_seg.onnx");
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_analysis_dimension, 512);
        assert_eq!(config.signal_backend, SignalBackend::Heuristic);
        assert_eq!(config.segmentation_input_size, 256);
        assert!((config.mask_threshold - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn lookup_overrides_backend_and_dimension() {
        let config = PipelineConfig::from_lookup(|key| match key {
            SIGNAL_BACKEND_ENV => Some("Segmentation".into()),
            MAX_ANALYSIS_DIM_ENV => Some("1024".into()),
            _ => None,
        });
        assert_eq!(config.signal_backend, SignalBackend::Segmentation);
        assert_eq!(config.max_analysis_dimension, 1024);
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = PipelineConfig::from_lookup(|key| match key {
            SIGNAL_BACKEND_ENV => Some("quantum".into()),
            MAX_ANALYSIS_DIM_ENV => Some("0".into()),
            _ => None,
        });
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn backend_serializes_snake_case() {
        let json = serde_json::to_string(&SignalBackend::Segmentation).unwrap();
        assert_eq!(json, "\"segmentation\"");
    }
}
