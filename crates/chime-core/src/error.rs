use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the notification settings core.
///
/// Cloneable so a failure can be stored inside an [`crate::AsyncAction`]
/// and handed to every subscriber of the state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChimeError {
    #[error("Settings service error: {message}")]
    Remote { message: String },
    #[error("Push registration error: {message}")]
    Push { message: String },
    #[error("No active push provider")]
    NoPushProvider,
    #[error("Push provider {provider} has no registered distributor")]
    NoDistributor { provider: String },
    #[error("Storage error: {message}")]
    Storage { message: String },
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

pub type ChimeResult<T> = Result<T, ChimeError>;

impl ChimeError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    pub fn push(message: impl Into<String>) -> Self {
        Self::Push {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ChimeError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChimeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}
