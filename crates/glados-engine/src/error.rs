use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Synthesis engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Empty or otherwise unusable request input
    #[error("Invalid input: {0}")]
    Input(String),

    /// Model files missing or corrupt, or warm-up failed
    #[error("Failed to load inference backend: {0}")]
    BackendLoad(String),

    /// The backend failed while encoding or vocoding
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Cache directory unwritable, disk full, encoding failure
    #[error("Audio storage error: {0}")]
    Storage(String),

    /// The request did not finish within the configured bound
    #[error("Synthesis timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// Synthesis requested before `Engine::start`
    #[error("Engine has not been started")]
    NotStarted,

    /// `Engine::start` called again with different settings
    #[error("Engine already started with different settings")]
    AlreadyStarted,
}

impl EngineError {
    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage(format!("{context}: {err}"))
    }

    /// Whether the caller, rather than the service, is at fault
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}
