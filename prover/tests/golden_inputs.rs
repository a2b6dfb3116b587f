//! Pinned circuit input encodings for the reference deposit
//! (secret = 1, nullifier secret = 2, amount = 1e9, alone in a depth-20 tree).

use std::time::Duration;

use rand_core::{CryptoRng, RngCore};
use zyncx_privacy::{
    Commitment, DepositNote, MerkleEngine, MerklePath, NullifierSecret, Secret, create_note,
};
use zyncx_prover::field::canonical_decimal;
use zyncx_prover::{InputAssembler, MockBackend, ProverContext, Recipient, build_inputs};

const ROOT_DECIMAL: &str =
    "10265356823984611976550352846054950260166969793781163428234044963477478250732";
const NULLIFIER_DECIMAL: &str =
    "3514809129680493876281089551779667143329927186359309357684235593092171130952";
const COMMITMENT_DECIMAL: &str =
    "6949193191504024721259421664580933013490709428644703178833956316185011526760";
const ZERO0_DECIMAL: &str =
    "9452164242708395306470613271737146286211020129178709886780322681380148088934";
const RECIPIENT_FF_DECIMAL: &str =
    "6350874878119819312338956282401532410528162663560392320966563075034087161850";
const CHANGE_COMMITMENT_HEX: &str =
    "2c93c80faeb797b5c5c467576ce5fdcbc42b6cefadd05ec786675194c5f05aa0";

fn word(last: u8) -> [u8; 32] {
    let mut w = [0u8; 32];
    w[31] = last;
    w
}

fn reference() -> (DepositNote, MerklePath) {
    let note = create_note(Secret(word(1)), NullifierSecret(word(2)), 1_000_000_000);
    let path = MerkleEngine::default()
        .compute_path(&[note.commitment], &note.commitment)
        .unwrap();
    (note, path)
}

/// Replays fixed bytes so change secrets are known in advance
struct ScriptedRng {
    bytes: Vec<u8>,
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        let taken: Vec<u8> = self.bytes.drain(..dst.len()).collect();
        dst.copy_from_slice(&taken);
    }
}

impl CryptoRng for ScriptedRng {}

#[test]
fn commitment_decimal_golden() {
    let (note, _) = reference();
    assert_eq!(
        canonical_decimal("commitment", &note.commitment.0).unwrap(),
        COMMITMENT_DECIMAL
    );
}

#[test]
fn full_withdrawal_field_inputs_golden() {
    let (note, path) = reference();
    let prepared = build_inputs(&note, &path, Recipient([0xff; 32]), 1_000_000_000).unwrap();
    let field = prepared.inputs.to_field_inputs().unwrap();

    assert_eq!(field.private.secret, "1");
    assert_eq!(field.private.nullifier_secret, "2");
    assert_eq!(field.private.note_amount, "1000000000");
    assert_eq!(field.private.change_precommitment, "0");
    assert_eq!(field.private.path_elements.len(), 20);
    assert_eq!(field.private.path_elements[0], ZERO0_DECIMAL);
    assert!(field.private.path_indices.iter().all(|b| b == "0"));

    assert_eq!(field.public.root, ROOT_DECIMAL);
    assert_eq!(field.public.nullifier_hash, NULLIFIER_DECIMAL);
    assert_eq!(field.public.recipient, RECIPIENT_FF_DECIMAL);
    assert_eq!(field.public.amount, "1000000000");
    assert_eq!(field.public.new_commitment, "0");
    assert!(prepared.change_note.is_none());
}

#[test]
fn partial_withdrawal_change_golden() {
    let (note, path) = reference();
    let mut bytes = word(3).to_vec();
    bytes.extend_from_slice(&word(4));
    let mut rng = ScriptedRng { bytes };

    let prepared = InputAssembler::default()
        .build_inputs_with_rng(&note, &path, Recipient(word(9)), 500_000_000, &mut rng)
        .unwrap();
    let change = prepared.change_note.unwrap();

    assert_eq!(change.amount, 500_000_000);
    assert_eq!(change.secret, Secret(word(3)));
    assert_eq!(change.commitment.to_hex(), CHANGE_COMMITMENT_HEX);
    assert_eq!(prepared.inputs.public.new_commitment, change.commitment);
}

#[test]
fn verifier_payload_layout() {
    let (note, path) = reference();
    let prepared = build_inputs(&note, &path, Recipient([0xff; 32]), 1_000_000_000).unwrap();
    let public = &prepared.inputs.public;
    let payload = public.public_inputs_bytes();

    assert_eq!(payload.len(), 160);
    assert_eq!(&payload[..32], &path.root);
    assert_eq!(&payload[32..64], &note.nullifier_hash().0);
    assert_eq!(&payload[64..96], &public.recipient.to_field_bytes());
    assert_eq!(&payload[96..120], &[0u8; 24]);
    assert_eq!(&payload[120..128], &1_000_000_000u64.to_be_bytes());
    assert_eq!(&payload[128..], &Commitment::ZERO.0);
}

#[tokio::test]
async fn reference_withdrawal_proves_on_mock() {
    let (note, path) = reference();
    let prepared = build_inputs(&note, &path, Recipient(word(9)), 250_000_000).unwrap();

    let ctx = ProverContext::new(MockBackend::new());
    let proof = ctx
        .generate_proof(&prepared.inputs, Duration::from_secs(10))
        .await
        .unwrap();
    assert!(
        ctx.verify_proof(&proof, &prepared.inputs.public, Duration::from_secs(10))
            .await
            .unwrap()
    );
    ctx.shutdown().await;
}
