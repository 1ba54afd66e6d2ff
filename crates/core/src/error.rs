// Error taxonomy for lifecycle commands

use thiserror::Error;

use crate::directory::DirectoryError;
use crate::preset::PresetError;

/// Result type alias for lifecycle operations
pub type Result<T> = std::result::Result<T, ComputeError>;

/// Errors surfaced by the Compute Lifecycle service
#[derive(Debug, Error)]
pub enum ComputeError {
    /// No owner identity on the command
    #[error("owner not authenticated")]
    OwnerNotAuthenticated,

    /// The referenced preset does not exist
    #[error("invalid preset: {0}")]
    InvalidPreset(String),

    /// Pod Directory failure while creating or deleting a pod
    #[error("orchestrator error: {0}")]
    Orchestrator(String),

    /// Event store failure. Fatal for the in-flight command: it breaks the
    /// audit guarantee and must never be reported as partial success.
    #[error("event store error: {0}")]
    EventStore(String),

    /// No such compute for this owner
    #[error("compute not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ComputeError {
    pub fn event_store(err: impl std::fmt::Display) -> Self {
        ComputeError::EventStore(err.to_string())
    }
}

impl From<DirectoryError> for ComputeError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => ComputeError::NotFound(id),
            DirectoryError::Orchestrator(msg) => ComputeError::Orchestrator(msg),
        }
    }
}

impl From<PresetError> for ComputeError {
    fn from(err: PresetError) -> Self {
        ComputeError::InvalidPreset(err.to_string())
    }
}
