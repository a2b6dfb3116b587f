use std::time::Duration;

use thiserror::Error;
use zyncx_privacy::{Commitment, DepositNote, MerkleError, NoteError, NullifierHash};
use zyncx_prover::ProofError;

use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum DepositError {
    #[error("deposit amount must be greater than zero")]
    InvalidAmount,

    #[error("note generation failed: {0}")]
    Note(#[from] NoteError),

    #[error("failed to encode deposit instruction: {0}")]
    Encode(String),

    /// The ledger may or may not have applied the deposit; keep the note
    #[error("deposit outcome unknown: {reason}")]
    Unconfirmed {
        note: Box<DepositNote>,
        reason: String,
    },

    #[error(transparent)]
    Ledger(LedgerError),
}

#[derive(Debug, Error)]
pub enum WithdrawError {
    #[error("a withdrawal for nullifier {0} is already in progress")]
    InFlight(NullifierHash),

    #[error("commitment {0} is not among the ledger leaves")]
    NoteNotFound(Commitment),

    #[error(transparent)]
    Merkle(MerkleError),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error("failed to encode withdrawal instruction: {0}")]
    Encode(String),

    #[error("note already spent (nullifier {0})")]
    AlreadySpent(NullifierHash),

    /// A ledger read missed its deadline; nothing was submitted
    #[error("ledger did not answer within {0:?}")]
    Timeout(Duration),

    /// The withdrawal was sent but the ledger's answer never arrived. It may
    /// have been applied, so the change note must be kept.
    #[error("withdrawal outcome unknown: {reason}")]
    Unconfirmed {
        nullifier_hash: NullifierHash,
        change_note: Option<Box<DepositNote>>,
        reason: String,
    },

    #[error(transparent)]
    Ledger(LedgerError),
}

impl WithdrawError {
    /// Whether the same request may succeed later.
    ///
    /// A missing commitment may just be a deposit that has not landed yet, and
    /// an unreachable ledger may come back before anything was submitted.
    /// Validation failures, spent notes, proving failures and timeouts are
    /// reported as final. An unconfirmed submission is never retryable: check
    /// the nullifier on the ledger and keep the change note instead.
    pub fn is_retryable(&self) -> bool {
        match self {
            WithdrawError::NoteNotFound(_) | WithdrawError::InFlight(_) => true,
            WithdrawError::Ledger(LedgerError::Unreachable(_)) => true,
            _ => false,
        }
    }
}

impl From<MerkleError> for WithdrawError {
    fn from(e: MerkleError) -> Self {
        match e {
            MerkleError::NotFound(commitment) => WithdrawError::NoteNotFound(commitment),
            other => WithdrawError::Merkle(other),
        }
    }
}

impl From<LedgerError> for WithdrawError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NullifierAlreadySpent(nullifier) => WithdrawError::AlreadySpent(nullifier),
            other => WithdrawError::Ledger(other),
        }
    }
}
