//! Error types for the ledger engine.
//!
//! Per-record outcomes travel as [`crate::wire::CreateResult`] codes inside
//! result blobs and are never `Err`; `EngineError` covers the failures that
//! abort a whole invocation without committing anything.

use crate::store::StoreError;
use std::error::Error;
use std::fmt;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for engine invocations.
#[derive(Debug)]
pub enum EngineError {
    /// The underlying key-value store failed.
    Store(StoreError),
    /// An argument blob was shorter than the declared record size.
    Malformed {
        /// The declared record size in bytes.
        expected: usize,
        /// The size of the argument in bytes.
        got: usize,
    },
    /// A stored record violated an internal invariant.
    Corrupt(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Store(e) => write!(f, "store error: {}", e),
            EngineError::Malformed { expected, got } => {
                write!(f, "malformed argument: expected {} bytes, got {}", expected, got)
            }
            EngineError::Corrupt(msg) => write!(f, "corrupt record: {}", msg),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EngineError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Store(err)
    }
}
