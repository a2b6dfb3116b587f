//! Field hash
//!
//! Every commitment, nullifier and Merkle node in the pool is produced by
//! [`hash`]. The permutation is circom-compatible Poseidon over the BN254
//! scalar field, so the proving circuit evaluates the exact same function.
//!
//! ```text
//! bytes  = part_0 || part_1 || ... || part_n
//! elems  = [len(bytes), chunk_0, chunk_1, ...]     (31-byte big-endian chunks)
//! digest = Poseidon(elems)                          (folded when > MAX_ARITY)
//! ```
//!
//! A 31-byte chunk is always below the field modulus, so packing never
//! reduces and distinct inputs map to distinct element vectors.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};

/// Digest width in bytes
pub const DIGEST_LEN: usize = 32;

/// Bytes packed into one field element
pub const CHUNK_LEN: usize = 31;

/// Largest number of elements absorbed by a single permutation call
pub const MAX_ARITY: usize = 8;

/// Hash a sequence of byte strings as their concatenation.
pub fn hash(parts: &[&[u8]]) -> [u8; DIGEST_LEN] {
    let total: usize = parts.iter().map(|p| p.len()).sum();
    let mut bytes = Vec::with_capacity(total);
    for part in parts {
        bytes.extend_from_slice(part);
    }

    let mut elems = Vec::with_capacity(1 + total.div_ceil(CHUNK_LEN));
    elems.push(Fr::from(total as u64));
    elems.extend(
        bytes
            .chunks(CHUNK_LEN)
            .map(Fr::from_be_bytes_mod_order),
    );

    field_to_bytes(&absorb(&elems))
}

/// Merkle node: `hash(left || right)`
pub fn hash_pair(left: &[u8; DIGEST_LEN], right: &[u8; DIGEST_LEN]) -> [u8; DIGEST_LEN] {
    hash(&[left.as_slice(), right.as_slice()])
}

/// Poseidon over raw field elements (circom parameters, `1..=MAX_ARITY` inputs).
///
/// # Panics
///
/// If `inputs` is empty or longer than [`MAX_ARITY`].
pub fn hash_fields(inputs: &[Fr]) -> Fr {
    debug_assert!(!inputs.is_empty() && inputs.len() <= MAX_ARITY);
    let mut poseidon =
        Poseidon::<Fr>::new_circom(inputs.len()).expect("arity within circom parameter table");
    poseidon
        .hash(inputs)
        .expect("input count matches permutation width")
}

fn absorb(elems: &[Fr]) -> Fr {
    let (head, mut rest) = elems.split_at(elems.len().min(MAX_ARITY));
    let mut acc = hash_fields(head);

    while !rest.is_empty() {
        let take = rest.len().min(MAX_ARITY - 1);
        let mut batch = Vec::with_capacity(take + 1);
        batch.push(acc);
        batch.extend_from_slice(&rest[..take]);
        acc = hash_fields(&batch);
        rest = &rest[take..];
    }

    acc
}

/// Serialize a field element as 32 big-endian bytes
pub fn field_to_bytes(f: &Fr) -> [u8; DIGEST_LEN] {
    let be = f.into_bigint().to_bytes_be();
    let mut out = [0u8; DIGEST_LEN];
    out[DIGEST_LEN - be.len()..].copy_from_slice(&be);
    out
}

/// Interpret 32 big-endian bytes as a field element, `None` if not canonical
pub fn bytes_to_field(bytes: &[u8; DIGEST_LEN]) -> Option<Fr> {
    let f = Fr::from_be_bytes_mod_order(bytes);
    (field_to_bytes(&f) == *bytes).then_some(f)
}
