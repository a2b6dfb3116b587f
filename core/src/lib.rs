//! Zyncx Core
//!
//! Ledger interface, instruction payloads, an in-memory reference ledger and
//! the client flows that tie notes, paths and proofs to the ledger.

pub mod client;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod memory;

pub use client::{ClientTimeouts, PoolClient, WithdrawalReceipt};
pub use error::{DepositError, WithdrawError};
pub use instruction::{DepositInstruction, InstructionError, WithdrawInstruction};
pub use ledger::{Ledger, LedgerError, SettlementReference, TreeId};
pub use memory::InMemoryLedger;
