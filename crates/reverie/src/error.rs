//! Error types for Reverie

use thiserror::Error;
use uuid::Uuid;

/// Main error type for memory engine operations
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Persistence collaborator errors (backend unreachable, write refused)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Semantic search collaborator errors
    #[error("Search error: {0}")]
    Search(String),

    /// A write was blocked by the content validator
    #[error("Write rejected by validator: {0}")]
    ValidationRejected(String),

    /// A record lookup by id found nothing
    #[error("Record not found: {0}")]
    RecordNotFound(Uuid),

    /// No active record exists for the requested slot
    #[error("No active record for slot '{0}'")]
    SlotNotFound(String),

    /// A record is malformed (e.g. missing full text)
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Configuration errors, fatal at load time
    #[error("Configuration error: {0}")]
    ConfigInvalid(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for memory engine operations
pub type Result<T> = std::result::Result<T, MemoryError>;

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        MemoryError::Serialization(err.to_string())
    }
}
