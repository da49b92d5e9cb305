//! Error types for the mockrest engine.
//!
//! Only construction can fail. Request-time conditions such as a missing
//! record are ordinary responses, never errors.

use thiserror::Error;

/// All possible errors from the mockrest engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("collection must be a JSON array, got {0}")]
    CollectionNotArray(String),

    #[error("invalid rule options: {0}")]
    InvalidOptions(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
