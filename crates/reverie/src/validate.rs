//! Content validation at write time
//!
//! The validator collaborator screens record text before it is persisted.
//! A rejection blocks the write entirely unless the validator supplies a
//! sanitized replacement, in which case the replacement is stored instead.

use async_trait::async_trait;

use crate::error::Result;

/// Outcome of validating one piece of record text
#[derive(Debug, Clone)]
pub struct Validation {
    /// Whether the text may be stored as-is
    pub valid: bool,
    /// Human-readable problems found
    pub issues: Vec<String>,
    /// Replacement text to store when the original is rejected
    pub sanitized_text: Option<String>,
}

impl Validation {
    /// An unconditional pass
    pub fn ok() -> Self {
        Self {
            valid: true,
            issues: Vec::new(),
            sanitized_text: None,
        }
    }

    /// A rejection with no replacement
    pub fn rejected(issues: Vec<String>) -> Self {
        Self {
            valid: false,
            issues,
            sanitized_text: None,
        }
    }

    /// A rejection that offers sanitized replacement text
    pub fn sanitized(issues: Vec<String>, text: impl Into<String>) -> Self {
        Self {
            valid: false,
            issues,
            sanitized_text: Some(text.into()),
        }
    }
}

/// Safety/consistency screen invoked before every write
#[async_trait]
pub trait ContentValidator: Send + Sync {
    async fn validate(&self, text: &str, agent_id: &str) -> Result<Validation>;
}

/// Passthrough validator that accepts everything; offline/test default
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl ContentValidator for AcceptAll {
    async fn validate(&self, _text: &str, _agent_id: &str) -> Result<Validation> {
        Ok(Validation::ok())
    }
}
