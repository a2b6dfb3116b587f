//! Note transport format
//!
//! ```text
//! zyncx-note:<base64(json)>
//!
//! {
//!   "version": 1,
//!   "secret": "<hex32>",
//!   "nullifier_secret": "<hex32>",
//!   "precommitment": "<hex32>",
//!   "amount": "<decimal u64>",
//!   "commitment": "<hex32>",
//!   "settlement_reference": "<string>" | null,
//!   "created_at": <unix seconds>
//! }
//! ```
//!
//! Every key is required and unknown keys are rejected. Derived fields are
//! recomputed on decode and must match.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DecodeError;
use crate::note::DepositNote;
use crate::types::{Commitment, NullifierSecret, Precommitment, Secret};

pub const NOTE_PREFIX: &str = "zyncx-note:";
pub const NOTE_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoteWire {
    version: u32,
    secret: String,
    nullifier_secret: String,
    precommitment: String,
    amount: String,
    commitment: String,
    #[serde(deserialize_with = "required_option")]
    settlement_reference: Option<String>,
    created_at: i64,
}

/// Key must be present, value may be null
fn required_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

/// Serialize a note into its portable string form
pub fn encode(note: &DepositNote) -> String {
    let wire = NoteWire {
        version: NOTE_FORMAT_VERSION,
        secret: hex::encode(note.secret.0),
        nullifier_secret: hex::encode(note.nullifier_secret.0),
        precommitment: hex::encode(note.precommitment.0),
        amount: note.amount.to_string(),
        commitment: hex::encode(note.commitment.0),
        settlement_reference: note.settlement_reference.clone(),
        created_at: note.created_at,
    };

    // Only strings and integers: serialization cannot fail
    let json = serde_json::to_vec(&wire).unwrap_or_default();
    format!("{}{}", NOTE_PREFIX, STANDARD.encode(json))
}

/// Parse a portable note string
pub fn decode(encoded: &str) -> Result<DepositNote, DecodeError> {
    let body = encoded
        .trim()
        .strip_prefix(NOTE_PREFIX)
        .ok_or(DecodeError::MissingPrefix)?;
    let json = STANDARD.decode(body).map_err(|_| DecodeError::Base64)?;
    let wire: NoteWire =
        serde_json::from_slice(&json).map_err(|e| DecodeError::Json(e.to_string()))?;

    if wire.version != NOTE_FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: wire.version,
            expected: NOTE_FORMAT_VERSION,
        });
    }

    let secret = Secret(parse_bytes32("secret", &wire.secret)?);
    let nullifier_secret = NullifierSecret(parse_bytes32("nullifier_secret", &wire.nullifier_secret)?);
    let precommitment = Precommitment(parse_bytes32("precommitment", &wire.precommitment)?);
    let commitment = Commitment(parse_bytes32("commitment", &wire.commitment)?);
    let amount = parse_amount(&wire.amount)?;

    let note = DepositNote {
        secret,
        nullifier_secret,
        precommitment,
        amount,
        commitment,
        settlement_reference: wire.settlement_reference,
        created_at: wire.created_at,
    };

    if Precommitment::derive(&note.secret, &note.nullifier_secret) != note.precommitment {
        return Err(DecodeError::Mismatch {
            field: "precommitment",
        });
    }
    if Commitment::derive(note.amount, &note.precommitment) != note.commitment {
        return Err(DecodeError::Mismatch {
            field: "commitment",
        });
    }

    Ok(note)
}

fn parse_bytes32(field: &'static str, value: &str) -> Result<[u8; 32], DecodeError> {
    let bytes = hex::decode(value).map_err(|_| DecodeError::InvalidHex { field })?;
    let found = bytes.len();
    bytes.try_into().map_err(|_| DecodeError::InvalidLength {
        field,
        expected: 32,
        found,
    })
}

fn parse_amount(value: &str) -> Result<u64, DecodeError> {
    // `u64::from_str` accepts a leading '+', the format does not
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::InvalidAmount(value.to_string()));
    }
    value
        .parse()
        .map_err(|_| DecodeError::InvalidAmount(value.to_string()))
}

impl DepositNote {
    pub fn encode(&self) -> String {
        encode(self)
    }

    pub fn decode(encoded: &str) -> Result<Self, DecodeError> {
        decode(encoded)
    }
}
