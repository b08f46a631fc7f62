use crate::types::{ActionType, LifecycleState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirMapError {
    #[error("not initialized: run 'dirmap init'")]
    NotInitialized,

    /// No table entry for the pair. Either the caller fed back a stale or
    /// fabricated position, or the tracked state is inconsistent.
    #[error("invalid state transition: no step from {state} after {action}")]
    InvalidTransition {
        state: LifecycleState,
        action: ActionType,
    },

    #[error("directory '{directory}' is mid-transition ({state}); wait for it to settle")]
    NotIdle {
        directory: String,
        state: LifecycleState,
    },

    #[error("directory not tracked: {0}")]
    DirectoryNotFound(String),

    #[error("directory already tracked: {0}")]
    DirectoryExists(String),

    #[error("invalid directory path '{0}': must be absolute with no empty, '.' or '..' components")]
    InvalidPath(String),

    #[error("invalid peer '{peer}': {reason}")]
    InvalidPeer { peer: String, reason: String },

    #[error("invalid lifecycle state: {0}")]
    InvalidState(String),

    #[error("invalid action type: {0}")]
    InvalidAction(String),

    #[error("{action} on '{directory}' failed after {attempts} attempt(s): {reason}")]
    ActionFailed {
        directory: String,
        action: ActionType,
        attempts: u32,
        reason: String,
    },

    #[error("backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DirMapError>;
