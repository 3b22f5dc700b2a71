use serde::Serialize;

use crate::error::ChimeError;

/// Progress of a single mutation against a remote collaborator.
///
/// `Uninitialized -> Loading -> {Success | Failure}`; a terminal state goes
/// back to `Uninitialized` when the user clears it, or to `Loading` when a
/// new attempt starts and overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum AsyncAction<T> {
    #[default]
    Uninitialized,
    Loading,
    Success(T),
    Failure(ChimeError),
}

impl<T> AsyncAction<T> {
    pub fn from_result(result: Result<T, ChimeError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Failure(e),
        }
    }

    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ChimeError> {
        match self {
            Self::Failure(e) => Some(e),
            _ => None,
        }
    }
}
