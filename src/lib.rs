pub mod config;
pub mod models;
pub mod pipeline;
pub mod session;

use tracing_subscriber::EnvFilter;

pub use config::{PipelineConfig, SignalBackend};
pub use models::{CheckInAssessment, CheckInResult, SymptomContext};
pub use pipeline::imaging::{decode_image, RasterBuffer};
pub use pipeline::{run_check_in, run_check_in_async, AnalysisError};
pub use session::{CheckInSession, CheckInStep, MemorySink, ResultSink, SessionError, SinkError};

/// Install the fmt subscriber, filtered by `RUST_LOG` or
/// `config::default_log_filter()`.
///
/// No-op if the host already installed a global subscriber.
pub fn init_logging() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} analysis core v{}", config::APP_NAME, config::APP_VERSION);
    }
}
