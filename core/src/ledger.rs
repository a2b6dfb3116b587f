//! Ledger Interface
//!
//! The ledger owns the commitment tree, the root history and the nullifier
//! registry. Clients read leaves and roots from it and submit encoded
//! instruction payloads to it.

use std::fmt;
use std::future::Future;

use thiserror::Error;
use zyncx_privacy::{Commitment, NullifierHash};
use zyncx_prover::Recipient;

use crate::instruction::InstructionError;

/// Identifier of one commitment tree (one vault)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(pub [u8; 32]);

impl fmt::Debug for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeId({})", hex::encode(self.0))
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Reference to a confirmed ledger transaction
pub type SettlementReference = String;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    #[error("unknown tree {0}")]
    UnknownTree(TreeId),

    #[error("deposit amount must be greater than zero")]
    InvalidDepositAmount,

    #[error("withdrawal amount must be greater than zero")]
    InvalidWithdrawalAmount,

    #[error("nullifier {0} has already been spent")]
    NullifierAlreadySpent(NullifierHash),

    #[error("proof rejected by the verifier")]
    InvalidProof,

    #[error("tree has reached its capacity of {capacity} leaves")]
    TreeFull { capacity: u64 },

    #[error("insufficient funds in vault")]
    InsufficientFunds,

    #[error("malformed instruction: {0}")]
    Malformed(#[from] InstructionError),

    #[error("ledger rejected the transaction: {0}")]
    Rejected(String),
}

/// Read and write access to the ledger program
pub trait Ledger: Send + Sync {
    /// All commitments of `tree` in insertion order
    fn get_leaves(
        &self,
        tree: &TreeId,
    ) -> impl Future<Output = Result<Vec<Commitment>, LedgerError>> + Send;

    fn get_current_root(
        &self,
        tree: &TreeId,
    ) -> impl Future<Output = Result<[u8; 32], LedgerError>> + Send;

    /// Submit an encoded [`crate::instruction::DepositInstruction`]
    fn submit_deposit(
        &self,
        tree: &TreeId,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<SettlementReference, LedgerError>> + Send;

    /// Submit an encoded [`crate::instruction::WithdrawInstruction`] paying `recipient`
    fn submit_withdrawal(
        &self,
        tree: &TreeId,
        recipient: &Recipient,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<SettlementReference, LedgerError>> + Send;
}
