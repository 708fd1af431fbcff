//! Error types for the slicing engine.
//!
//! Errors fall into two propagation classes:
//!
//! - **Fatal** errors are structural problems with the request or model
//!   (`InvalidRequest`, `SelectionValidation`, `SliceExplosion`, `Model`).
//!   They abort a computation before any solving starts and no partial
//!   response is produced.
//! - **Scoped** errors (`ConstraintTranslation`, `Solver`) concern a single
//!   slice set. They are recorded in the computation status, the affected
//!   slice set falls back to the computation's default result and all other
//!   slice sets are computed as usual.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid slice selection: {0}")]
    SelectionValidation(String),

    #[error("number of slice combinations {count} exceeds the maximum of {max}")]
    SliceExplosion { count: usize, max: usize },

    #[error("invalid rule model: {0}")]
    Model(String),

    #[error("cannot translate constraint '{constraint}': {reason}")]
    ConstraintTranslation { constraint: String, reason: String },

    #[error("solver error: {0}")]
    Solver(String),
}

impl EngineError {
    /// Whether this error aborts the whole computation.
    ///
    /// Scoped errors only degrade the result of the slice set they occurred
    /// in.
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::InvalidRequest(_)
            | EngineError::SelectionValidation(_)
            | EngineError::SliceExplosion { .. }
            | EngineError::Model(_) => true,
            EngineError::ConstraintTranslation { .. } | EngineError::Solver(_) => false,
        }
    }

    pub(crate) fn selection(message: impl Into<String>) -> Self {
        EngineError::SelectionValidation(message.into())
    }

    pub(crate) fn model(message: impl Into<String>) -> Self {
        EngineError::Model(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_are_fatal() {
        assert!(EngineError::selection("x").is_fatal());
        assert!(EngineError::SliceExplosion { count: 2, max: 1 }.is_fatal());
        assert!(EngineError::model("x").is_fatal());
        assert!(!EngineError::Solver("x".into()).is_fatal());
        assert!(
            !EngineError::ConstraintTranslation { constraint: "a".into(), reason: "unknown".into() }.is_fatal()
        );
    }

    #[test]
    fn explosion_message_names_both_counts() {
        let err = EngineError::SliceExplosion { count: 12, max: 10 };
        assert_eq!(err.to_string(), "number of slice combinations 12 exceeds the maximum of 10");
    }
}
