use thiserror::Error;

use finsight_config::ConfigError;
use finsight_core::{CoreError, ErrorKind};

/// Error type returned by the [`crate::InsightEngine`] facade.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Core(err) => err.kind(),
            EngineError::Config(ConfigError::Invalid { .. }) => ErrorKind::Validation,
            EngineError::Config(_) => ErrorKind::Storage,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
