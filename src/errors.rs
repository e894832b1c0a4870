use pandl_config::ConfigError;
use pandl_engine::CoreError;
use thiserror::Error;

/// Failures surfaced by the process-facing API.
#[derive(Debug, Error)]
pub enum PnlError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PnlError {
    pub fn is_storage(&self) -> bool {
        matches!(self, PnlError::Core(err) if err.is_storage())
    }
}
