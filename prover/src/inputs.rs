//! Withdrawal Input Assembly
//!
//! Combines a note, a fresh membership path and the withdrawal request into
//! the private and public inputs of the withdrawal circuit.
//!
//! ```text
//! private: secret, nullifier_secret, note_amount,
//!          siblings[depth], path_bits[depth], change_precommitment
//! public:  root, nullifier_hash, recipient, amount, new_commitment
//!
//! new_commitment = H(change_le || change_precommitment)   if change > 0
//!                = 0^32                                    if change == 0
//! ```

use std::fmt;

use rand_core::{OsRng, TryCryptoRng};
use serde::{Deserialize, Serialize};
use zyncx_privacy::{
    Commitment, DepositNote, MerklePath, NullifierHash, NullifierSecret, Precommitment, Secret,
    TREE_DEPTH, create_note, generate_secrets_from,
};

use crate::error::ProofError;

/// Ledger identity that receives withdrawn funds
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient(pub [u8; 32]);

impl Recipient {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recipient({})", self.to_hex())
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Values revealed to the ledger verifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicInputs {
    pub root: [u8; 32],
    pub nullifier_hash: NullifierHash,
    pub recipient: Recipient,
    pub amount: u64,
    /// Change note commitment, all zero on a full withdrawal
    pub new_commitment: Commitment,
}

/// Witness values that never leave the prover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateInputs {
    pub secret: Secret,
    pub nullifier_secret: NullifierSecret,
    pub note_amount: u64,
    pub siblings: Vec<[u8; 32]>,
    pub path_bits: Vec<bool>,
    /// All zero on a full withdrawal
    pub change_precommitment: Precommitment,
}

/// Complete circuit input. Held in memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofInputs {
    pub private: PrivateInputs,
    pub public: PublicInputs,
}

/// Inputs plus the change note the holder must keep if the proof is used
#[derive(Debug, Clone)]
pub struct PreparedWithdrawal {
    pub inputs: ProofInputs,
    pub change_note: Option<DepositNote>,
}

/// Validates withdrawal requests against a fixed tree depth
#[derive(Debug, Clone, Copy)]
pub struct InputAssembler {
    depth: usize,
}

impl InputAssembler {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Assemble inputs, drawing change secrets from the OS CSPRNG
    pub fn build_inputs(
        &self,
        note: &DepositNote,
        path: &MerklePath,
        recipient: Recipient,
        withdraw_amount: u64,
    ) -> Result<PreparedWithdrawal, ProofError> {
        self.build_inputs_with_rng(note, path, recipient, withdraw_amount, &mut OsRng)
    }

    /// Assemble inputs with an explicit cryptographic RNG for change secrets
    pub fn build_inputs_with_rng<R: TryCryptoRng + ?Sized>(
        &self,
        note: &DepositNote,
        path: &MerklePath,
        recipient: Recipient,
        withdraw_amount: u64,
        rng: &mut R,
    ) -> Result<PreparedWithdrawal, ProofError> {
        if withdraw_amount == 0 {
            return Err(ProofError::ZeroAmount);
        }
        if withdraw_amount > note.amount {
            return Err(ProofError::AmountExceedsBalance {
                requested: withdraw_amount,
                balance: note.amount,
            });
        }
        if !note.is_consistent() {
            return Err(ProofError::InconsistentNote);
        }
        if path.depth() != self.depth || path.path_bits.len() != self.depth {
            return Err(ProofError::DepthMismatch {
                expected: self.depth,
                found: path.depth(),
            });
        }
        if !path.verify(&note.commitment) {
            return Err(ProofError::PathMismatch);
        }

        let change = note.amount - withdraw_amount;
        let change_note = if change > 0 {
            let (secret, nullifier_secret) = generate_secrets_from(rng)?;
            Some(create_note(secret, nullifier_secret, change))
        } else {
            None
        };

        let (change_precommitment, new_commitment) = match &change_note {
            Some(change) => (change.precommitment, change.commitment),
            None => (Precommitment([0u8; 32]), Commitment::ZERO),
        };

        log::debug!(
            "assembled withdrawal inputs: leaf {} amount {} change {}",
            path.index,
            withdraw_amount,
            change
        );

        Ok(PreparedWithdrawal {
            inputs: ProofInputs {
                private: PrivateInputs {
                    secret: note.secret,
                    nullifier_secret: note.nullifier_secret,
                    note_amount: note.amount,
                    siblings: path.siblings.clone(),
                    path_bits: path.path_bits.clone(),
                    change_precommitment,
                },
                public: PublicInputs {
                    root: path.root,
                    nullifier_hash: note.nullifier_hash(),
                    recipient,
                    amount: withdraw_amount,
                    new_commitment,
                },
            },
            change_note,
        })
    }
}

impl Default for InputAssembler {
    fn default() -> Self {
        Self::new(TREE_DEPTH)
    }
}

/// Assemble inputs for the default tree depth
pub fn build_inputs(
    note: &DepositNote,
    path: &MerklePath,
    recipient: Recipient,
    withdraw_amount: u64,
) -> Result<PreparedWithdrawal, ProofError> {
    InputAssembler::default().build_inputs(note, path, recipient, withdraw_amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use zyncx_privacy::MerkleEngine;

    const DEPTH: usize = 6;

    fn setup(amount: u64) -> (DepositNote, MerklePath) {
        let note = create_note(Secret([3u8; 32]), NullifierSecret([4u8; 32]), amount);
        let leaves = vec![Commitment([1u8; 32]), note.commitment, Commitment([2u8; 32])];
        let path = MerkleEngine::new(DEPTH)
            .compute_path(&leaves, &note.commitment)
            .unwrap();
        (note, path)
    }

    fn assemble(note: &DepositNote, path: &MerklePath, amount: u64) -> Result<PreparedWithdrawal, ProofError> {
        let mut rng = StdRng::seed_from_u64(1);
        InputAssembler::new(DEPTH).build_inputs_with_rng(
            note,
            path,
            Recipient([7u8; 32]),
            amount,
            &mut rng,
        )
    }

    #[test]
    fn test_full_withdrawal_has_no_change() {
        let (note, path) = setup(1_000);
        let prepared = assemble(&note, &path, 1_000).unwrap();

        assert!(prepared.change_note.is_none());
        assert!(prepared.inputs.public.new_commitment.is_zero());
        assert_eq!(prepared.inputs.private.change_precommitment, Precommitment([0u8; 32]));
        assert_eq!(prepared.inputs.public.root, path.root);
        assert_eq!(prepared.inputs.public.nullifier_hash, note.nullifier_hash());
    }

    #[test]
    fn test_half_withdrawal_keeps_exact_remainder() {
        let (note, path) = setup(1_000);
        let prepared = assemble(&note, &path, 400).unwrap();
        let change = prepared.change_note.unwrap();

        assert_eq!(change.amount, 600);
        assert!(change.is_consistent());
        assert_eq!(prepared.inputs.public.new_commitment, change.commitment);
        assert_eq!(prepared.inputs.private.change_precommitment, change.precommitment);
        assert_eq!(
            prepared.inputs.public.amount + change.amount,
            prepared.inputs.private.note_amount
        );
        assert_ne!(change.secret, note.secret);
    }

    #[test]
    fn test_amount_bounds() {
        let (note, path) = setup(1_000);
        assert!(matches!(assemble(&note, &path, 0), Err(ProofError::ZeroAmount)));
        assert!(matches!(
            assemble(&note, &path, 1_001),
            Err(ProofError::AmountExceedsBalance {
                requested: 1_001,
                balance: 1_000
            })
        ));
    }

    #[test]
    fn test_path_for_other_leaf_rejected() {
        let (note, _) = setup(1_000);
        let leaves = vec![Commitment([1u8; 32]), note.commitment];
        let other = MerkleEngine::new(DEPTH)
            .compute_path(&leaves, &Commitment([1u8; 32]))
            .unwrap();

        let err = assemble(&note, &other, 10).unwrap_err();
        assert!(matches!(err, ProofError::PathMismatch));
        assert!(err.is_validation());
    }

    #[test]
    fn test_depth_mismatch_rejected() {
        let (note, _) = setup(1_000);
        let shallow = MerkleEngine::new(DEPTH - 1)
            .compute_path(&[note.commitment], &note.commitment)
            .unwrap();

        assert!(matches!(
            assemble(&note, &shallow, 10),
            Err(ProofError::DepthMismatch {
                expected: DEPTH,
                found
            }) if found == DEPTH - 1
        ));
    }

    #[test]
    fn test_inconsistent_note_rejected() {
        let (mut note, path) = setup(1_000);
        note.amount = 2_000;
        assert!(matches!(
            assemble(&note, &path, 10),
            Err(ProofError::InconsistentNote)
        ));
    }

    #[test]
    fn test_default_depth() {
        assert_eq!(InputAssembler::default().depth(), TREE_DEPTH);
    }
}
