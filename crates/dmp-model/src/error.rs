//! Validation errors for inbound product payloads
//!
//! Every variant carries the batch index of the offending record so the
//! caller can point at it. Validation runs before any storage mutation.

/// Inbound payload rejected before it reaches storage
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Batch payload was not a JSON array
    #[error("expected array of products")]
    NotAnArray,

    /// Batch element was not a JSON object
    #[error("product at index {index} must be an object")]
    NotAnObject { index: usize },

    /// Required `name` missing, null, or blank
    #[error("product at index {index} missing required field: name")]
    MissingName { index: usize },

    /// Field had a shape that cannot be coerced to the record model
    #[error("product at index {index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },
}

impl ValidationError {
    /// Batch index of the offending record, if the error is record-scoped
    #[inline]
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::NotAnArray => None,
            Self::NotAnObject { index }
            | Self::MissingName { index }
            | Self::Malformed { index, .. } => Some(*index),
        }
    }
}
