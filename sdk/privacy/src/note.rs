//! Deposit Notes
//!
//! A note is the only durable record of a deposit. Whoever holds it can
//! withdraw; whoever loses it loses the funds.
//!
//! ```text
//! DepositNote = {
//!     secret:               [u8; 32],  // never leaves the holder
//!     nullifier_secret:     [u8; 32],  // hashed and published on spend
//!     precommitment:        H(secret || nullifier_secret),
//!     amount:               u64,       // smallest unit
//!     commitment:           H(amount_le || precommitment),
//!     settlement_reference: Option<String>,  // set once the deposit confirms
//!     created_at:           i64,       // unix seconds
//! }
//! ```

use rand_core::{OsRng, TryCryptoRng};

use crate::error::NoteError;
use crate::types::{Commitment, NullifierHash, NullifierSecret, Precommitment, Secret};

/// A shielded deposit and all the secret material needed to spend it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositNote {
    pub secret: Secret,
    pub nullifier_secret: NullifierSecret,
    pub precommitment: Precommitment,
    /// Value in the smallest unit
    pub amount: u64,
    pub commitment: Commitment,
    /// Ledger reference of the confirming transaction
    pub settlement_reference: Option<String>,
    /// Creation time, unix seconds
    pub created_at: i64,
}

/// Everything the proof assembler needs from a note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalMaterial {
    pub secret: Secret,
    pub nullifier_secret: NullifierSecret,
    pub precommitment: Precommitment,
    pub amount: u64,
    pub nullifier_hash: NullifierHash,
}

/// Draw a fresh secret pair from the operating system CSPRNG.
///
/// There is no fallback generator: if the OS source fails, so does this.
pub fn generate_secrets() -> Result<(Secret, NullifierSecret), NoteError> {
    generate_secrets_from(&mut OsRng)
}

/// Top byte mask keeping secrets below 2^253, inside the BN254 scalar field
const FIELD_TOP_MASK: u8 = 0x1f;

/// Draw a secret pair from an explicit cryptographic RNG
pub fn generate_secrets_from<R: TryCryptoRng + ?Sized>(
    rng: &mut R,
) -> Result<(Secret, NullifierSecret), NoteError> {
    let mut secret = [0u8; 32];
    let mut nullifier_secret = [0u8; 32];

    rng.try_fill_bytes(&mut secret)
        .map_err(|e| NoteError::RngUnavailable(e.to_string()))?;
    rng.try_fill_bytes(&mut nullifier_secret)
        .map_err(|e| NoteError::RngUnavailable(e.to_string()))?;
    secret[0] &= FIELD_TOP_MASK;
    nullifier_secret[0] &= FIELD_TOP_MASK;

    Ok((Secret(secret), NullifierSecret(nullifier_secret)))
}

/// Build a note from its secrets, stamping the current time
pub fn create_note(secret: Secret, nullifier_secret: NullifierSecret, amount: u64) -> DepositNote {
    DepositNote::with_timestamp(
        secret,
        nullifier_secret,
        amount,
        chrono::Utc::now().timestamp(),
    )
}

/// Pure projection of the values a withdrawal proof consumes
pub fn derive_withdrawal_material(note: &DepositNote) -> WithdrawalMaterial {
    WithdrawalMaterial {
        secret: note.secret,
        nullifier_secret: note.nullifier_secret,
        precommitment: note.precommitment,
        amount: note.amount,
        nullifier_hash: note.nullifier_hash(),
    }
}

impl DepositNote {
    /// Generate fresh secrets and build a note for `amount`
    pub fn generate(amount: u64) -> Result<Self, NoteError> {
        let (secret, nullifier_secret) = generate_secrets()?;
        Ok(create_note(secret, nullifier_secret, amount))
    }

    /// Build a note with an explicit creation time (recovery, tests)
    pub fn with_timestamp(
        secret: Secret,
        nullifier_secret: NullifierSecret,
        amount: u64,
        created_at: i64,
    ) -> Self {
        let precommitment = Precommitment::derive(&secret, &nullifier_secret);
        let commitment = Commitment::derive(amount, &precommitment);

        Self {
            secret,
            nullifier_secret,
            precommitment,
            amount,
            commitment,
            settlement_reference: None,
            created_at,
        }
    }

    /// Attach the ledger reference once the deposit transaction confirms
    pub fn with_settlement_reference(mut self, reference: impl Into<String>) -> Self {
        self.settlement_reference = Some(reference.into());
        self
    }

    pub fn nullifier_hash(&self) -> NullifierHash {
        NullifierHash::derive(&self.nullifier_secret)
    }

    /// Check that the stored derived values match the secrets
    pub fn is_consistent(&self) -> bool {
        let precommitment = Precommitment::derive(&self.secret, &self.nullifier_secret);
        precommitment == self.precommitment
            && Commitment::derive(self.amount, &precommitment) == self.commitment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_note_commitment_deterministic() {
        let n1 = create_note(Secret([1u8; 32]), NullifierSecret([2u8; 32]), 1000);
        let n2 = create_note(Secret([1u8; 32]), NullifierSecret([2u8; 32]), 1000);

        assert_eq!(n1.precommitment, n2.precommitment);
        assert_eq!(n1.commitment, n2.commitment);
        assert!(n1.is_consistent());
    }

    #[test]
    fn test_secrets_are_independent() {
        let mut rng = StdRng::seed_from_u64(7);
        let (s, ns) = generate_secrets_from(&mut rng).unwrap();
        assert_ne!(s.0, ns.0);

        let (s2, _) = generate_secrets_from(&mut rng).unwrap();
        assert_ne!(s.0, s2.0);
    }

    #[test]
    fn test_secrets_fit_the_field() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..64 {
            let (s, ns) = generate_secrets_from(&mut rng).unwrap();
            assert!(s.0[0] <= FIELD_TOP_MASK);
            assert!(ns.0[0] <= FIELD_TOP_MASK);
        }
    }

    #[test]
    fn test_os_rng_available() {
        let (s, ns) = generate_secrets().unwrap();
        assert_ne!(s.0, [0u8; 32]);
        assert_ne!(ns.0, [0u8; 32]);
    }

    #[test]
    fn test_withdrawal_material_projection() {
        let note = create_note(Secret([9u8; 32]), NullifierSecret([8u8; 32]), 42);
        let material = derive_withdrawal_material(&note);

        assert_eq!(material.secret, note.secret);
        assert_eq!(material.precommitment, note.precommitment);
        assert_eq!(material.amount, 42);
        assert_eq!(
            material.nullifier_hash,
            NullifierHash::derive(&NullifierSecret([8u8; 32]))
        );
    }

    #[test]
    fn test_settlement_reference_only_changes_reference() {
        let note = create_note(Secret([1u8; 32]), NullifierSecret([2u8; 32]), 5);
        let settled = note.clone().with_settlement_reference("sig123");

        assert_eq!(settled.settlement_reference.as_deref(), Some("sig123"));
        assert_eq!(settled.commitment, note.commitment);
        assert_eq!(settled.created_at, note.created_at);
    }

    #[test]
    fn test_tampered_note_is_inconsistent() {
        let mut note = create_note(Secret([1u8; 32]), NullifierSecret([2u8; 32]), 5);
        note.amount = 6;
        assert!(!note.is_consistent());
    }
}
