//! Merkle Membership
//!
//! Recomputes authentication paths from the ledger's ordered leaf list.
//! Unfilled subtrees are padded with a per-level zero value, so a partially
//! filled tree has a canonical root without storing placeholder leaves.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H2z
//!                /  \   /   \
//!               C0  C1 C2  zero(0)
//!
//! zero(0) = H(0^32)
//! zero(k) = H(zero(k-1) || zero(k-1))
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::MerkleError;
use crate::hash::{DIGEST_LEN, hash, hash_pair};
use crate::types::Commitment;

/// Tree depth shared with the ledger program and the withdrawal circuit
pub const TREE_DEPTH: usize = 20;

/// Deepest tree whose capacity still fits a `u64` leaf index
pub const MAX_TREE_DEPTH: usize = 32;

/// Number of recent roots a ledger keeps
pub const ROOT_HISTORY_SIZE: usize = 30;

/// Authentication path for one leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Sibling hashes from leaf to root
    pub siblings: Vec<[u8; 32]>,
    /// Side bits, leaf to root (`true` = node is the right child)
    pub path_bits: Vec<bool>,
    /// Root the path resolves to
    pub root: [u8; 32],
    /// Leaf position
    pub index: u64,
}

impl MerklePath {
    /// Verify that this path proves inclusion of `leaf` under its own root
    pub fn verify(&self, leaf: &Commitment) -> bool {
        verify_path(leaf, self, &self.root)
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

/// Replay `path` from `leaf` and compare with `expected_root`.
///
/// Needs no leaf set; it is the same check the ledger and circuit perform.
pub fn verify_path(leaf: &Commitment, path: &MerklePath, expected_root: &[u8; 32]) -> bool {
    if path.siblings.len() != path.path_bits.len() {
        return false;
    }
    &compute_root_from_path(&leaf.0, &path.siblings, &path.path_bits) == expected_root
}

/// Fold a leaf up through its siblings
pub fn compute_root_from_path(
    leaf: &[u8; 32],
    siblings: &[[u8; 32]],
    path_bits: &[bool],
) -> [u8; 32] {
    let mut current = *leaf;

    for (sibling, is_right) in siblings.iter().zip(path_bits.iter()) {
        current = if *is_right {
            hash_pair(sibling, &current)
        } else {
            hash_pair(&current, sibling)
        };
    }

    current
}

/// Fixed-depth path and root computation over a leaf list
#[derive(Debug, Clone)]
pub struct MerkleEngine {
    depth: usize,
    /// `zeros[k]` is the root of an empty subtree of height `k`
    zeros: Vec<[u8; 32]>,
}

impl MerkleEngine {
    /// # Panics
    ///
    /// If `depth` is outside `1..=MAX_TREE_DEPTH`. Use [`MerkleEngine::try_new`]
    /// for depths that come from user input.
    pub fn new(depth: usize) -> Self {
        match Self::try_new(depth) {
            Ok(engine) => engine,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_new(depth: usize) -> Result<Self, MerkleError> {
        if !(1..=MAX_TREE_DEPTH).contains(&depth) {
            return Err(MerkleError::InvalidDepth {
                depth,
                max: MAX_TREE_DEPTH,
            });
        }

        let mut zeros = Vec::with_capacity(depth + 1);
        let mut current = hash(&[&[0u8; DIGEST_LEN][..]]);
        zeros.push(current);
        for _ in 0..depth {
            current = hash_pair(&current, &current);
            zeros.push(current);
        }

        Ok(Self { depth, zeros })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Maximum number of leaves
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Padding value for an empty subtree at `level`
    pub fn zero(&self, level: usize) -> &[u8; 32] {
        &self.zeros[level]
    }

    /// Root of a tree with no leaves
    pub fn empty_root(&self) -> [u8; 32] {
        self.zeros[self.depth]
    }

    /// Locate `target` (first occurrence) and build its path
    pub fn compute_path(
        &self,
        leaves: &[Commitment],
        target: &Commitment,
    ) -> Result<MerklePath, MerkleError> {
        let index = leaves
            .iter()
            .position(|leaf| leaf == target)
            .ok_or(MerkleError::NotFound(*target))?;

        self.path_at(leaves, index)
    }

    fn path_at(&self, leaves: &[Commitment], index: usize) -> Result<MerklePath, MerkleError> {
        self.check_capacity(leaves)?;
        log::trace!("building path for {} at index {}", leaves[index], index);

        let mut siblings = Vec::with_capacity(self.depth);
        let mut path_bits = Vec::with_capacity(self.depth);
        let mut level: Vec<[u8; 32]> = leaves.iter().map(|c| c.0).collect();
        let mut current = index;

        for height in 0..self.depth {
            let sibling = level
                .get(current ^ 1)
                .copied()
                .unwrap_or(self.zeros[height]);

            siblings.push(sibling);
            path_bits.push(current & 1 == 1);

            level = self.fold(&level, height);
            current >>= 1;
        }

        Ok(MerklePath {
            siblings,
            path_bits,
            root: level.first().copied().unwrap_or_else(|| self.empty_root()),
            index: index as u64,
        })
    }

    /// Root over `leaves`, padding the rest of the tree with zero values
    pub fn root(&self, leaves: &[Commitment]) -> Result<[u8; 32], MerkleError> {
        self.check_capacity(leaves)?;

        let mut level: Vec<[u8; 32]> = leaves.iter().map(|c| c.0).collect();
        for height in 0..self.depth {
            level = self.fold(&level, height);
        }

        Ok(level.first().copied().unwrap_or_else(|| self.empty_root()))
    }

    /// Hash adjacent pairs; an odd tail is paired with `zero(height)`
    fn fold(&self, level: &[[u8; 32]], height: usize) -> Vec<[u8; 32]> {
        level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_pair(left, right),
                [left] => hash_pair(left, &self.zeros[height]),
                _ => unreachable!("chunks(2) yields one or two nodes"),
            })
            .collect()
    }

    fn check_capacity(&self, leaves: &[Commitment]) -> Result<(), MerkleError> {
        if leaves.len() as u64 > self.capacity() {
            return Err(MerkleError::TreeFull {
                leaves: leaves.len(),
                capacity: self.capacity(),
            });
        }
        Ok(())
    }
}

impl Default for MerkleEngine {
    fn default() -> Self {
        Self::new(TREE_DEPTH)
    }
}

/// Recent roots, so proofs built against a slightly stale root still verify
#[derive(Debug, Clone)]
pub struct RootHistory {
    /// Most recent last
    roots: VecDeque<[u8; 32]>,
    max_size: usize,
}

impl RootHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            roots: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Record a new root, evicting the oldest beyond capacity
    pub fn push(&mut self, root: [u8; 32]) {
        self.roots.push_back(root);
        while self.roots.len() > self.max_size {
            self.roots.pop_front();
        }
    }

    /// The all-zero root is never valid
    pub fn contains(&self, root: &[u8; 32]) -> bool {
        *root != [0u8; 32] && self.roots.contains(root)
    }

    pub fn current(&self) -> Option<&[u8; 32]> {
        self.roots.back()
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &[u8; 32]> {
        self.roots.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl Default for RootHistory {
    fn default() -> Self {
        Self::new(ROOT_HISTORY_SIZE)
    }
}
