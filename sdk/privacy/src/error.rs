use thiserror::Error;

use crate::types::Commitment;

/// Failures while creating notes
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("secure randomness unavailable: {0}")]
    RngUnavailable(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Rejections of a transported note string
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing note prefix")]
    MissingPrefix,

    #[error("note is not valid base64")]
    Base64,

    #[error("malformed note body: {0}")]
    Json(String),

    #[error("unsupported note version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("field `{field}` is not valid hex")]
    InvalidHex { field: &'static str },

    #[error("field `{field}` must be {expected} bytes, got {found}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("amount `{0}` is not a decimal u64")]
    InvalidAmount(String),

    #[error("field `{field}` does not match the note secrets")]
    Mismatch { field: &'static str },
}

/// Merkle membership failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("commitment {0} not present in leaf set")]
    NotFound(Commitment),

    #[error("{leaves} leaves exceed tree capacity {capacity}")]
    TreeFull { leaves: usize, capacity: u64 },

    #[error("tree depth must be within 1..={max}, got {depth}")]
    InvalidDepth { depth: usize, max: usize },
}
