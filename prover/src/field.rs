//! Field Encoding
//!
//! The proving backend takes every value as a decimal string of a BN254
//! scalar field element. 32-byte values are read big-endian; side bits are
//! "0" or "1".
//!
//! Hash outputs are always canonical, so a value at or above the modulus is
//! rejected rather than reduced. Recipients are arbitrary ledger identities
//! and are reduced modulo r, matching the ledger's own reduction.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::ProofError;
use crate::inputs::{ProofInputs, PublicInputs, Recipient};

/// BN254 scalar field modulus r, big-endian
pub const BN254_MODULUS: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29, 0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58, 0x5d,
    0x28, 0x33, 0xe8, 0x48, 0x79, 0xb9, 0x70, 0x91, 0x43, 0xe1, 0xf5, 0x93, 0xf0, 0x00, 0x00, 0x01,
];

fn modulus() -> BigUint {
    BigUint::from_bytes_be(&BN254_MODULUS)
}

/// Right-align a field element into a 32-byte big-endian word
fn to_word(value: &BigUint) -> [u8; 32] {
    let bytes = value.to_bytes_be();
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    word
}

/// Decimal form of a value that must already be canonical
pub fn canonical_decimal(field: &str, bytes: &[u8; 32]) -> Result<String, ProofError> {
    let value = BigUint::from_bytes_be(bytes);
    if value >= modulus() {
        return Err(ProofError::encoding(field, "value is not below the field modulus"));
    }
    Ok(value.to_str_radix(10))
}

/// Reduce an arbitrary 32-byte value modulo r
pub fn reduce(bytes: &[u8; 32]) -> [u8; 32] {
    to_word(&(BigUint::from_bytes_be(bytes) % modulus()))
}

pub fn reduced_decimal(bytes: &[u8; 32]) -> String {
    (BigUint::from_bytes_be(bytes) % modulus()).to_str_radix(10)
}

pub fn bit(value: bool) -> String {
    let bit = if value { "1" } else { "0" };
    bit.to_string()
}

/// Parse a canonical decimal field element back into its 32-byte word
pub fn parse_decimal(field: &str, value: &str) -> Result<[u8; 32], ProofError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProofError::encoding(field, "not a decimal integer"));
    }
    let parsed = BigUint::parse_bytes(value.as_bytes(), 10)
        .ok_or_else(|| ProofError::encoding(field, "not a decimal integer"))?;
    if parsed >= modulus() {
        return Err(ProofError::encoding(field, "value is not below the field modulus"));
    }
    Ok(to_word(&parsed))
}

pub fn parse_u64(field: &str, value: &str) -> Result<u64, ProofError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProofError::encoding(field, "not a decimal integer"));
    }
    value
        .parse()
        .map_err(|_| ProofError::encoding(field, "does not fit in 64 bits"))
}

pub fn parse_bit(field: &str, value: &str) -> Result<bool, ProofError> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ProofError::encoding(field, "side bit must be \"0\" or \"1\"")),
    }
}

/// Private witness values in backend form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateFieldInputs {
    pub secret: String,
    pub nullifier_secret: String,
    pub note_amount: String,
    pub path_elements: Vec<String>,
    pub path_indices: Vec<String>,
    pub change_precommitment: String,
}

/// Public values in backend form, in circuit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicFieldInputs {
    pub root: String,
    pub nullifier_hash: String,
    pub recipient: String,
    pub amount: String,
    pub new_commitment: String,
}

impl PublicFieldInputs {
    /// Circuit public input order
    pub fn ordered(&self) -> [&str; 5] {
        [
            self.root.as_str(),
            self.nullifier_hash.as_str(),
            self.recipient.as_str(),
            self.amount.as_str(),
            self.new_commitment.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInputs {
    pub private: PrivateFieldInputs,
    pub public: PublicFieldInputs,
}

impl ProofInputs {
    pub fn to_field_inputs(&self) -> Result<FieldInputs, ProofError> {
        let private = &self.private;

        let path_elements = private
            .siblings
            .iter()
            .enumerate()
            .map(|(i, sibling)| canonical_decimal(&format!("path_elements[{}]", i), sibling))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FieldInputs {
            private: PrivateFieldInputs {
                secret: canonical_decimal("secret", &private.secret.0)?,
                nullifier_secret: canonical_decimal("nullifier_secret", &private.nullifier_secret.0)?,
                note_amount: private.note_amount.to_string(),
                path_elements,
                path_indices: private.path_bits.iter().map(|b| bit(*b)).collect(),
                change_precommitment: canonical_decimal(
                    "change_precommitment",
                    &private.change_precommitment.0,
                )?,
            },
            public: self.public.to_field_inputs()?,
        })
    }
}

impl PublicInputs {
    pub fn to_field_inputs(&self) -> Result<PublicFieldInputs, ProofError> {
        Ok(PublicFieldInputs {
            root: canonical_decimal("root", &self.root)?,
            nullifier_hash: canonical_decimal("nullifier_hash", &self.nullifier_hash.0)?,
            recipient: reduced_decimal(&self.recipient.0),
            amount: self.amount.to_string(),
            new_commitment: canonical_decimal("new_commitment", &self.new_commitment.0)?,
        })
    }

    /// Verifier payload appended after the proof bytes:
    /// `root || nullifier_hash || recipient mod r || amount || new_commitment`,
    /// each a 32-byte big-endian word.
    pub fn public_inputs_bytes(&self) -> Vec<u8> {
        let mut amount = [0u8; 32];
        amount[24..].copy_from_slice(&self.amount.to_be_bytes());

        let mut out = Vec::with_capacity(32 * 5);
        out.extend_from_slice(&self.root);
        out.extend_from_slice(&self.nullifier_hash.0);
        out.extend_from_slice(&reduce(&self.recipient.0));
        out.extend_from_slice(&amount);
        out.extend_from_slice(&self.new_commitment.0);
        out
    }
}

impl Recipient {
    /// The recipient as the circuit sees it
    pub fn to_field_bytes(&self) -> [u8; 32] {
        reduce(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULUS_DECIMAL: &str =
        "21888242871839275222246405745257275088548364400416034343698204186575808495617";

    #[test]
    fn test_modulus_constant() {
        assert_eq!(modulus().to_str_radix(10), MODULUS_DECIMAL);
    }

    #[test]
    fn test_small_values() {
        let mut one = [0u8; 32];
        one[31] = 1;
        assert_eq!(canonical_decimal("x", &[0u8; 32]).unwrap(), "0");
        assert_eq!(canonical_decimal("x", &one).unwrap(), "1");
        assert_eq!(bit(true), "1");
        assert_eq!(bit(false), "0");
    }

    #[test]
    fn test_non_canonical_rejected_with_field_name() {
        let err = canonical_decimal("root", &BN254_MODULUS).unwrap_err();
        assert!(matches!(&err, ProofError::Encoding { field, .. } if field == "root"));

        let mut below = BN254_MODULUS;
        below[31] = 0;
        assert!(canonical_decimal("root", &below).is_ok());
    }

    #[test]
    fn test_recipient_reduction() {
        let all_ones = [0xffu8; 32];
        assert_eq!(
            reduced_decimal(&all_ones),
            "6350874878119819312338956282401532410528162663560392320966563075034087161850"
        );
        assert_eq!(reduce(&BN254_MODULUS), [0u8; 32]);

        let small = [0x01u8; 32];
        assert_eq!(reduce(&small), small);
    }

    #[test]
    fn test_parse_decimal_inverse() {
        let value = [0x0fu8; 32];
        let decimal = canonical_decimal("v", &value).unwrap();
        assert_eq!(parse_decimal("v", &decimal).unwrap(), value);

        assert!(parse_decimal("v", MODULUS_DECIMAL).is_err());
        assert!(parse_decimal("v", "-1").is_err());
        assert!(parse_decimal("v", "").is_err());
        assert!(parse_bit("b", "2").is_err());
        assert_eq!(parse_u64("a", "42").unwrap(), 42);
        assert!(parse_u64("a", "18446744073709551616").is_err());
    }
}
