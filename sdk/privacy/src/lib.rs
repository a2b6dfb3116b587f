//! Zyncx Privacy SDK
//!
//! Client-side note and membership primitives for the Zyncx privacy pool.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Deposit Note                            │
//! │   secret ─┐                                                      │
//! │           ├─► precommitment ─┐                                   │
//! │ nullifier ┘                  ├─► commitment ──► ledger leaf      │
//! │   secret ───► nullifier_hash │                                   │
//! │                     amount ──┘                                   │
//! └──────────────────────────────────────────────────────────────────┘
//!                                   │
//!                                   ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │            Merkle Membership (depth 20, zero padded)             │
//! │  leaves ──► path (siblings + side bits) ──► root                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod encoding;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod note;
pub mod types;

pub use encoding::{NOTE_FORMAT_VERSION, NOTE_PREFIX, decode, encode};
pub use error::{DecodeError, MerkleError, NoteError};
pub use hash::{hash, hash_pair};
pub use merkle::{
    MerkleEngine, MAX_TREE_DEPTH, MerklePath, ROOT_HISTORY_SIZE, RootHistory, TREE_DEPTH,
    compute_root_from_path, verify_path,
};
pub use note::{
    DepositNote, WithdrawalMaterial, create_note, derive_withdrawal_material, generate_secrets,
    generate_secrets_from,
};
pub use types::{Commitment, NullifierHash, NullifierSecret, Precommitment, Secret};
