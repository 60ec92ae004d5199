use std::path::PathBuf;

use log::warn;
use thiserror::Error;

/// Failures surfaced at the store boundary.
///
/// A missing id is never an error: lookups return `None` and deletes are
/// no-ops.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("shared store at {path} is unavailable: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("failed to encode stored value: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode stored value '{key}': {reason}")]
    Decode { key: String, reason: String },

    #[error("unsupported database schema: {0}")]
    Schema(String),

    #[error("photo limit of {max} reached")]
    CapacityExceeded { max: usize },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database thread terminated unexpectedly")]
    WorkerGone,
}

impl StoreError {
    pub(crate) fn decode(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Collapses a store result into its empty value, logging the failure.
///
/// For callers (widget providers mostly) that would rather render nothing
/// than handle a storage error.
pub trait Absorb<T> {
    fn or_empty(self) -> T;
}

impl<T: Default> Absorb<T> for StoreResult<T> {
    fn or_empty(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                warn!("Shared store error absorbed: {err}");
                T::default()
            }
        }
    }
}
