//! In-Memory Ledger
//!
//! Reference ledger with the same rules as the on-chain program:
//!
//! - deposits must be non-zero; the leaf is `H(amount_le || precommitment)`
//! - a nullifier is accepted once
//! - proofs verify against the current root or one of the recent roots
//! - a change commitment is inserted only when it is non-zero
//! - a tree holds at most 2^depth leaves

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::Mutex;
use zyncx_privacy::{Commitment, MerkleEngine, NullifierHash, RootHistory};
use zyncx_prover::{ProverContext, ProvingBackend, PublicInputs, Recipient};

use crate::instruction::{DepositInstruction, WithdrawInstruction};
use crate::ledger::{Ledger, LedgerError, SettlementReference, TreeId};

const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(30);

struct TreeState {
    leaves: Vec<Commitment>,
    roots: RootHistory,
    nullifiers: HashSet<NullifierHash>,
    /// Value held by the vault
    balance: u64,
    /// Transactions applied, used to derive settlement references
    sequence: u64,
}

impl TreeState {
    fn new(empty_root: [u8; 32]) -> Self {
        let mut roots = RootHistory::default();
        roots.push(empty_root);
        Self {
            leaves: Vec::new(),
            roots,
            nullifiers: HashSet::new(),
            balance: 0,
            sequence: 0,
        }
    }
}

#[derive(Default)]
struct LedgerState {
    trees: HashMap<TreeId, TreeState>,
    payouts: HashMap<Recipient, u64>,
}

/// Single-process ledger backed by a proving backend for verification
pub struct InMemoryLedger<B> {
    engine: MerkleEngine,
    verifier: ProverContext<B>,
    verify_timeout: Duration,
    state: Mutex<LedgerState>,
}

impl<B: ProvingBackend> InMemoryLedger<B> {
    /// # Panics
    ///
    /// If `depth` is outside `1..=MAX_TREE_DEPTH`.
    pub fn new(depth: usize, verifier: B) -> Self {
        Self {
            engine: MerkleEngine::new(depth),
            verifier: ProverContext::new(verifier),
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    pub fn depth(&self) -> usize {
        self.engine.depth()
    }

    /// Register an empty tree. Returns false if it already exists.
    pub async fn create_tree(&self, tree: TreeId) -> bool {
        let mut state = self.state.lock().await;
        if state.trees.contains_key(&tree) {
            return false;
        }
        state
            .trees
            .insert(tree, TreeState::new(self.engine.empty_root()));
        log::info!("created tree {}", tree);
        true
    }

    pub async fn balance(&self, tree: &TreeId) -> Result<u64, LedgerError> {
        let state = self.state.lock().await;
        let tree_state = state.trees.get(tree).ok_or(LedgerError::UnknownTree(*tree))?;
        Ok(tree_state.balance)
    }

    pub async fn is_spent(&self, tree: &TreeId, nullifier: &NullifierHash) -> bool {
        let state = self.state.lock().await;
        state
            .trees
            .get(tree)
            .is_some_and(|t| t.nullifiers.contains(nullifier))
    }

    /// Total paid out to `recipient` across all trees
    pub async fn paid_to(&self, recipient: &Recipient) -> u64 {
        let state = self.state.lock().await;
        state.payouts.get(recipient).copied().unwrap_or(0)
    }

    /// Release the verifier backend
    pub async fn shutdown(self) {
        self.verifier.shutdown().await;
    }

    fn insert_leaf(&self, tree: &mut TreeState, leaf: Commitment) -> Result<(), LedgerError> {
        let capacity = self.engine.capacity();
        if tree.leaves.len() as u64 >= capacity {
            return Err(LedgerError::TreeFull { capacity });
        }
        tree.leaves.push(leaf);
        let root = self
            .engine
            .root(&tree.leaves)
            .map_err(|_| LedgerError::TreeFull { capacity })?;
        tree.roots.push(root);
        Ok(())
    }

    fn settlement_reference(kind: &str, tree: &TreeId, state: &mut TreeState, payload: &[u8]) -> String {
        state.sequence += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&tree.0);
        hasher.update(&state.sequence.to_le_bytes());
        hasher.update(payload);
        format!("{}-{}", kind, hex::encode(&hasher.finalize().as_bytes()[..16]))
    }

    /// Try the proof against every remembered root, newest first
    async fn verify_against_history(
        &self,
        roots: &[[u8; 32]],
        recipient: &Recipient,
        ix: &WithdrawInstruction,
    ) -> Result<bool, LedgerError> {
        for root in roots {
            let public = PublicInputs {
                root: *root,
                nullifier_hash: ix.nullifier_hash,
                recipient: *recipient,
                amount: ix.amount,
                new_commitment: ix.new_commitment,
            };
            let valid = self
                .verifier
                .verify_proof(&ix.proof, &public, self.verify_timeout)
                .await
                .map_err(|e| LedgerError::Rejected(format!("verifier: {}", e)))?;
            if valid {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<B: ProvingBackend> Ledger for InMemoryLedger<B> {
    async fn get_leaves(&self, tree: &TreeId) -> Result<Vec<Commitment>, LedgerError> {
        let state = self.state.lock().await;
        let tree_state = state.trees.get(tree).ok_or(LedgerError::UnknownTree(*tree))?;
        Ok(tree_state.leaves.clone())
    }

    async fn get_current_root(&self, tree: &TreeId) -> Result<[u8; 32], LedgerError> {
        let state = self.state.lock().await;
        let tree_state = state.trees.get(tree).ok_or(LedgerError::UnknownTree(*tree))?;
        Ok(tree_state
            .roots
            .current()
            .copied()
            .unwrap_or_else(|| self.engine.empty_root()))
    }

    async fn submit_deposit(
        &self,
        tree: &TreeId,
        payload: Vec<u8>,
    ) -> Result<SettlementReference, LedgerError> {
        let ix = DepositInstruction::from_bytes(&payload)?;
        if ix.amount == 0 {
            return Err(LedgerError::InvalidDepositAmount);
        }

        let mut state = self.state.lock().await;
        let tree_state = state
            .trees
            .get_mut(tree)
            .ok_or(LedgerError::UnknownTree(*tree))?;

        let balance = tree_state
            .balance
            .checked_add(ix.amount)
            .ok_or_else(|| LedgerError::Rejected("vault balance overflow".to_string()))?;

        let commitment = Commitment::derive(ix.amount, &ix.precommitment);
        self.insert_leaf(tree_state, commitment)?;
        tree_state.balance = balance;

        let reference = Self::settlement_reference("dep", tree, tree_state, &payload);
        log::info!(
            "deposit of {} into tree {} as leaf {} ({})",
            ix.amount,
            tree,
            tree_state.leaves.len() - 1,
            reference
        );
        Ok(reference)
    }

    async fn submit_withdrawal(
        &self,
        tree: &TreeId,
        recipient: &Recipient,
        payload: Vec<u8>,
    ) -> Result<SettlementReference, LedgerError> {
        let ix = WithdrawInstruction::from_bytes(&payload)?;
        if ix.amount == 0 {
            return Err(LedgerError::InvalidWithdrawalAmount);
        }

        // Held across verification so two spends of one nullifier cannot interleave
        let mut state = self.state.lock().await;
        let tree_state = state
            .trees
            .get_mut(tree)
            .ok_or(LedgerError::UnknownTree(*tree))?;

        if tree_state.nullifiers.contains(&ix.nullifier_hash) {
            return Err(LedgerError::NullifierAlreadySpent(ix.nullifier_hash));
        }
        if tree_state.balance < ix.amount {
            return Err(LedgerError::InsufficientFunds);
        }
        if ix.is_partial() && tree_state.leaves.len() as u64 >= self.engine.capacity() {
            return Err(LedgerError::TreeFull {
                capacity: self.engine.capacity(),
            });
        }

        let roots: Vec<[u8; 32]> = tree_state.roots.iter().copied().collect();
        if !self.verify_against_history(&roots, recipient, &ix).await? {
            log::warn!("rejected withdrawal proof for nullifier {}", ix.nullifier_hash);
            return Err(LedgerError::InvalidProof);
        }

        // Re-borrow after the await
        let tree_state = state
            .trees
            .get_mut(tree)
            .ok_or(LedgerError::UnknownTree(*tree))?;
        tree_state.nullifiers.insert(ix.nullifier_hash);
        if ix.is_partial() {
            self.insert_leaf(tree_state, ix.new_commitment)?;
        }
        tree_state.balance -= ix.amount;
        let reference = Self::settlement_reference("wd", tree, tree_state, &payload);

        *state.payouts.entry(*recipient).or_insert(0) += ix.amount;

        log::info!(
            "withdrawal of {} from tree {} (partial: {}, {})",
            ix.amount,
            tree,
            ix.is_partial(),
            reference
        );
        Ok(reference)
    }
}
