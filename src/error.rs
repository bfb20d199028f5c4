//! Error types for the cache.
//!
//! Programming errors (empty ids, registering the same kind twice) are faults
//! and panic at the offending call site instead of surfacing as `Err` values.

use crate::types::Kind;
use thiserror::Error;

/// Main error type for cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no {kind} named {namespace}/{name}")]
    NotFound {
        kind: Kind,
        namespace: String,
        name: String,
    },

    #[error("{count} {kind} entries match {namespace}/{name}, expected one")]
    Ambiguous {
        kind: Kind,
        namespace: String,
        name: String,
        count: usize,
    },

    #[error("kind not registered: {0}")]
    UnknownKind(Kind),

    #[error("kind {0} is registered with a different resource type")]
    KindMismatch(Kind),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
