//! Mock Proving Backend
//!
//! Evaluates the withdrawal relation natively instead of running a circuit:
//!
//! 1. precommitment = H(secret || nullifier_secret)
//! 2. commitment    = H(note_amount_le || precommitment)
//! 3. commitment authenticates to `root` through the path
//! 4. nullifier_hash = H(nullifier_secret)
//! 5. 0 < amount <= note_amount
//! 6. new_commitment commits to the exact change, or is zero when none is left
//!
//! The "proof" is a keyed hash of the public inputs padded to 256 bytes, the
//! size of an uncompressed BN254 Groth16 proof. It proves nothing to anyone
//! who does not trust this process.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use zyncx_privacy::{
    Commitment, NullifierHash, NullifierSecret, Precommitment, Secret, compute_root_from_path,
};

use crate::backend::{ProvingBackend, Witness};
use crate::error::{BackendError, ProofError};
use crate::field::{FieldInputs, PublicFieldInputs, parse_bit, parse_decimal, parse_u64};

/// Proof length, matching the verifier's Groth16 layout
pub const MOCK_PROOF_LEN: usize = 256;

const PROOF_CONTEXT: &str = "zyncx mock withdrawal proof v1";

pub struct MockBackend {
    prove_delay: Duration,
    init_calls: AtomicUsize,
    shutdown_calls: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Simulate proving time
    pub fn with_delay(prove_delay: Duration) -> Self {
        Self {
            prove_delay,
            init_calls: AtomicUsize::new(0),
            shutdown_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Shared counter that outlives the backend
    pub fn shutdown_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.shutdown_calls)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn bind_public(public: &PublicFieldInputs) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new_derive_key(PROOF_CONTEXT);
    for value in public.ordered() {
        hasher.update(value.as_bytes());
        hasher.update(&[0u8]);
    }

    let mut proof = Vec::with_capacity(MOCK_PROOF_LEN);
    proof.extend_from_slice(hasher.finalize().as_bytes());
    proof.resize(MOCK_PROOF_LEN, 0);
    proof
}

fn witness_err(e: ProofError) -> BackendError {
    BackendError::Witness(e.to_string())
}

fn unsatisfied(constraint: &str) -> BackendError {
    BackendError::Witness(format!("constraint not satisfied: {}", constraint))
}

/// Check the withdrawal relation over decoded inputs
pub fn check_relation(inputs: &FieldInputs) -> Result<(), BackendError> {
    let private = &inputs.private;
    let public = &inputs.public;

    let secret = Secret(parse_decimal("secret", &private.secret).map_err(witness_err)?);
    let nullifier_secret = NullifierSecret(
        parse_decimal("nullifier_secret", &private.nullifier_secret).map_err(witness_err)?,
    );
    let note_amount = parse_u64("note_amount", &private.note_amount).map_err(witness_err)?;
    let amount = parse_u64("amount", &public.amount).map_err(witness_err)?;
    let root = parse_decimal("root", &public.root).map_err(witness_err)?;
    let nullifier_hash =
        NullifierHash(parse_decimal("nullifier_hash", &public.nullifier_hash).map_err(witness_err)?);
    let new_commitment =
        Commitment(parse_decimal("new_commitment", &public.new_commitment).map_err(witness_err)?);
    let change_precommitment = Precommitment(
        parse_decimal("change_precommitment", &private.change_precommitment)
            .map_err(witness_err)?,
    );
    parse_decimal("recipient", &public.recipient).map_err(witness_err)?;

    if private.path_elements.len() != private.path_indices.len() {
        return Err(unsatisfied("path length"));
    }
    let siblings = private
        .path_elements
        .iter()
        .map(|s| parse_decimal("path_elements", s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(witness_err)?;
    let path_bits = private
        .path_indices
        .iter()
        .map(|s| parse_bit("path_indices", s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(witness_err)?;

    let precommitment = Precommitment::derive(&secret, &nullifier_secret);
    let commitment = Commitment::derive(note_amount, &precommitment);

    if compute_root_from_path(&commitment.0, &siblings, &path_bits) != root {
        return Err(unsatisfied("membership"));
    }
    if NullifierHash::derive(&nullifier_secret) != nullifier_hash {
        return Err(unsatisfied("nullifier"));
    }
    if amount == 0 || amount > note_amount {
        return Err(unsatisfied("amount range"));
    }

    let change = note_amount - amount;
    let expected_change = if change > 0 {
        Commitment::derive(change, &change_precommitment)
    } else {
        Commitment::ZERO
    };
    if new_commitment != expected_change {
        return Err(unsatisfied("change commitment"));
    }

    Ok(())
}

impl ProvingBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn init(&self) -> Result<(), BackendError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(&self, inputs: &FieldInputs) -> Result<Witness, BackendError> {
        check_relation(inputs)?;
        let public = serde_json::to_vec(&inputs.public)
            .map_err(|e| BackendError::Witness(e.to_string()))?;
        Ok(Witness(public))
    }

    async fn generate_proof(&self, witness: &Witness) -> Result<Vec<u8>, BackendError> {
        if !self.prove_delay.is_zero() {
            tokio::time::sleep(self.prove_delay).await;
        }
        let public: PublicFieldInputs = serde_json::from_slice(&witness.0)
            .map_err(|e| BackendError::Proving(format!("malformed witness: {}", e)))?;
        Ok(bind_public(&public))
    }

    async fn verify_proof(
        &self,
        proof: &[u8],
        public: &PublicFieldInputs,
    ) -> Result<bool, BackendError> {
        Ok(proof == bind_public(public).as_slice())
    }

    async fn shutdown(&self) {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{InputAssembler, Recipient};
    use rand::{SeedableRng, rngs::StdRng};
    use zyncx_privacy::{MerkleEngine, create_note};

    fn field_inputs(withdraw: u64) -> FieldInputs {
        let note = create_note(Secret([5u8; 32]), NullifierSecret([6u8; 32]), 100);
        let leaves = vec![Commitment([1u8; 32]), note.commitment];
        let path = MerkleEngine::new(4)
            .compute_path(&leaves, &note.commitment)
            .unwrap();
        InputAssembler::new(4)
            .build_inputs_with_rng(
                &note,
                &path,
                Recipient([9u8; 32]),
                withdraw,
                &mut StdRng::seed_from_u64(3),
            )
            .unwrap()
            .inputs
            .to_field_inputs()
            .unwrap()
    }

    #[test]
    fn test_honest_inputs_satisfy() {
        check_relation(&field_inputs(100)).unwrap();
        check_relation(&field_inputs(1)).unwrap();
    }

    #[test]
    fn test_wrong_root_fails() {
        let mut inputs = field_inputs(100);
        inputs.public.root = "12345".to_string();
        assert_eq!(
            check_relation(&inputs),
            Err(unsatisfied("membership"))
        );
    }

    #[test]
    fn test_inflated_amount_fails() {
        let mut inputs = field_inputs(50);
        inputs.public.amount = "60".to_string();
        assert_eq!(
            check_relation(&inputs),
            Err(unsatisfied("change commitment"))
        );

        inputs.public.amount = "101".to_string();
        assert_eq!(check_relation(&inputs), Err(unsatisfied("amount range")));
    }

    #[test]
    fn test_foreign_nullifier_fails() {
        let mut inputs = field_inputs(100);
        inputs.public.nullifier_hash = "7".to_string();
        assert_eq!(check_relation(&inputs), Err(unsatisfied("nullifier")));
    }

    #[test]
    fn test_full_withdrawal_requires_zero_change() {
        let mut inputs = field_inputs(100);
        inputs.public.new_commitment = "1".to_string();
        assert_eq!(
            check_relation(&inputs),
            Err(unsatisfied("change commitment"))
        );
    }

    #[test]
    fn test_proof_shape() {
        let public = field_inputs(100).public;
        let proof = bind_public(&public);
        assert_eq!(proof.len(), MOCK_PROOF_LEN);
        assert_eq!(proof, bind_public(&public));
    }
}
