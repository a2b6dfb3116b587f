//! Pinned vectors for the hash wiring. A change here means every deployed
//! note, root and circuit input changes with it.

use zyncx_privacy::{
    Commitment, MerkleEngine, NullifierSecret, Secret, TREE_DEPTH, create_note, decode, encode,
};

fn secret_one() -> Secret {
    let mut s = [0u8; 32];
    s[31] = 1;
    Secret(s)
}

fn nullifier_two() -> NullifierSecret {
    let mut n = [0u8; 32];
    n[31] = 2;
    NullifierSecret(n)
}

#[test]
fn deposit_golden_vector() {
    let note = create_note(secret_one(), nullifier_two(), 1_000_000_000);

    assert_eq!(
        note.precommitment.to_hex(),
        "18b92040579cc3ad41d677846490a4abd8749d5c91968dc52e162538a382d8dc"
    );
    assert_eq!(
        note.commitment.to_hex(),
        "0f5d1a9d484c9940e93bfb4fc2b8b28aba15de623e61e2045e6b63e31b359c68"
    );
    assert_eq!(
        note.nullifier_hash().to_hex(),
        "07c54fbc6c4bd1a02236fff56b26f53b92862dbaa2db27e310b6da532bb56848"
    );
}

#[test]
fn zero_values_golden() {
    let engine = MerkleEngine::new(TREE_DEPTH);

    assert_eq!(
        hex::encode(engine.zero(0)),
        "14e5bc4176af994521f4a0de8835f3e6d5ac784a40ac5cd9333898ae66cc1066"
    );
    assert_eq!(
        hex::encode(engine.zero(1)),
        "09ffc992600d4fb20c332940f719d9238e4e62ff87abed8d5908f1a333484afe"
    );
    assert_eq!(
        hex::encode(engine.empty_root()),
        "19fd9a0b29ee1e40b3245bb74643b64bec2e298c594abec815bbf47bec5655d6"
    );
    assert_eq!(engine.root(&[]).unwrap(), engine.empty_root());
}

#[test]
fn single_deposit_root_golden() {
    let engine = MerkleEngine::default();
    let note = create_note(secret_one(), nullifier_two(), 1_000_000_000);
    let leaves = vec![note.commitment];

    let path = engine.compute_path(&leaves, &note.commitment).unwrap();
    assert_eq!(
        hex::encode(path.root),
        "16b1fc6eb48b24b96aab9533cacdab1565e6c03d6903671bac34640a26dd18ec"
    );
    assert!(path.verify(&note.commitment));
    assert!(path.path_bits.iter().all(|b| !b));
    assert_eq!(path.siblings[0], *engine.zero(0));
}

#[test]
fn golden_note_survives_transport() {
    let note = create_note(secret_one(), nullifier_two(), 1_000_000_000)
        .with_settlement_reference("3nYx1");
    let decoded = decode(&encode(&note)).unwrap();

    assert_eq!(decoded, note);
    assert_eq!(
        decoded.commitment,
        Commitment(
            hex::decode("0f5d1a9d484c9940e93bfb4fc2b8b28aba15de623e61e2045e6b63e31b359c68")
                .unwrap()
                .try_into()
                .unwrap()
        )
    );
}
