//! Pipeline error types.

use thiserror::Error;
use vshorts_clients::ClientError;
use vshorts_models::ClipParseError;

use crate::credentials::CredentialError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("AI analysis failed: {0}")]
    AiFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Service error: {0}")]
    Client(#[from] ClientError),

    #[error("Invalid clip: {0}")]
    ClipParse(#[from] ClipParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn ai_failed(msg: impl Into<String>) -> Self {
        Self::AiFailed(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Definitive configuration or credential problems; retrying cannot help.
    pub fn is_definitive(&self) -> bool {
        matches!(
            self,
            PipelineError::ConfigError(_) | PipelineError::Credential(_)
        )
    }
}
