use std::time::Duration;

use thiserror::Error;
use zyncx_privacy::NoteError;

/// Failures while assembling inputs or obtaining a proof
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("withdrawal amount must be greater than zero")]
    ZeroAmount,

    #[error("withdrawal of {requested} exceeds note balance {balance}")]
    AmountExceedsBalance { requested: u64, balance: u64 },

    #[error("note derived values do not match its secrets")]
    InconsistentNote,

    #[error("path depth {found} does not match tree depth {expected}")]
    DepthMismatch { expected: usize, found: usize },

    #[error("path does not authenticate the note commitment")]
    PathMismatch,

    #[error("cannot encode `{field}` as a field element: {reason}")]
    Encoding { field: String, reason: String },

    #[error("change note: {0}")]
    ChangeNote(#[from] NoteError),

    #[error("proof generation failed: {0}")]
    ProofGenerationFailed(#[source] BackendError),

    #[error("proving backend did not answer within {0:?}")]
    Timeout(Duration),
}

impl ProofError {
    /// Local validation failures; retrying with the same input cannot succeed
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ProofError::ZeroAmount
                | ProofError::AmountExceedsBalance { .. }
                | ProofError::InconsistentNote
                | ProofError::DepthMismatch { .. }
                | ProofError::PathMismatch
                | ProofError::Encoding { .. }
        )
    }

    pub(crate) fn encoding(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ProofError::Encoding {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failures reported by a proving backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("witness execution failed: {0}")]
    Witness(String),

    #[error("proving failed: {0}")]
    Proving(String),

    #[error("verification failed: {0}")]
    Verification(String),

    #[error("unexpected backend response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Transport-level failures worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Unavailable(_))
    }
}
