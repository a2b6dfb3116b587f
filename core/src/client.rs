//! Pool Client
//!
//! Deposit and withdrawal flows against a [`Ledger`].
//!
//! ```text
//! deposit:   generate secrets ─► DepositInstruction ─► ledger ─► note + reference
//!
//! withdraw:  get_leaves ─► compute_path ─► build_inputs ─► generate_proof
//!                 │                                              │
//!              (timeout)                                     (timeout)
//!                                                                ▼
//!            change note ◄─ reference ◄─ ledger ◄─ WithdrawInstruction
//! ```
//!
//! Leaf fetches, proving and submissions are each bounded by a timeout.
//! Timeouts are reported, never retried here. A submission without an answer
//! hands the note material back to the caller (`Unconfirmed`), since the
//! ledger may already have applied it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::timeout;
use zyncx_privacy::{DepositNote, MerkleEngine, MerklePath, NullifierHash, Commitment};
use zyncx_prover::{InputAssembler, ProverContext, ProvingBackend, Recipient};

use crate::error::{DepositError, WithdrawError};
use crate::instruction::{DepositInstruction, WithdrawInstruction};
use crate::ledger::{Ledger, LedgerError, SettlementReference, TreeId};

#[derive(Debug, Clone, Copy)]
pub struct ClientTimeouts {
    /// Reading leaves and roots
    pub fetch: Duration,
    /// Submitting an instruction
    pub submit: Duration,
    /// Witness execution plus proving
    pub proof: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            fetch: Duration::from_secs(30),
            submit: Duration::from_secs(60),
            proof: Duration::from_secs(300),
        }
    }
}

/// Outcome of a confirmed withdrawal
#[derive(Debug, Clone)]
pub struct WithdrawalReceipt {
    pub settlement_reference: SettlementReference,
    pub nullifier_hash: NullifierHash,
    pub amount: u64,
    /// Remaining balance, already carrying the withdrawal's settlement reference
    pub change_note: Option<DepositNote>,
}

/// Removes the in-flight marker when the withdrawal ends, however it ends
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<NullifierHash, ()>,
    nullifier: NullifierHash,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.nullifier);
    }
}

pub struct PoolClient<L, B> {
    ledger: Arc<L>,
    prover: ProverContext<B>,
    tree: TreeId,
    engine: MerkleEngine,
    assembler: InputAssembler,
    timeouts: ClientTimeouts,
    in_flight: DashMap<NullifierHash, ()>,
}

impl<L: Ledger, B: ProvingBackend> PoolClient<L, B> {
    /// # Panics
    ///
    /// If `depth` is outside `1..=MAX_TREE_DEPTH`.
    pub fn new(ledger: Arc<L>, backend: B, tree: TreeId, depth: usize) -> Self {
        Self {
            ledger,
            prover: ProverContext::new(backend),
            tree,
            engine: MerkleEngine::new(depth),
            assembler: InputAssembler::new(depth),
            timeouts: ClientTimeouts::default(),
            in_flight: DashMap::new(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: ClientTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn tree(&self) -> &TreeId {
        &self.tree
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn prover(&self) -> &ProverContext<B> {
        &self.prover
    }

    /// Create a fresh note for `amount` and deposit it
    pub async fn deposit(&self, amount: u64) -> Result<DepositNote, DepositError> {
        if amount == 0 {
            return Err(DepositError::InvalidAmount);
        }
        let note = DepositNote::generate(amount)?;
        self.deposit_note(note).await
    }

    /// Deposit an existing note. The returned copy carries the settlement reference.
    pub async fn deposit_note(&self, note: DepositNote) -> Result<DepositNote, DepositError> {
        if note.amount == 0 {
            return Err(DepositError::InvalidAmount);
        }

        let payload = DepositInstruction {
            amount: note.amount,
            precommitment: note.precommitment,
        }
        .to_bytes()
        .map_err(|e| DepositError::Encode(e.to_string()))?;

        let submitted = timeout(
            self.timeouts.submit,
            self.ledger.submit_deposit(&self.tree, payload),
        )
        .await;

        match submitted {
            Ok(Ok(reference)) => {
                log::info!("deposited {} as {}", note.amount, note.commitment);
                Ok(note.with_settlement_reference(reference))
            }
            Ok(Err(LedgerError::Unreachable(reason))) => Err(DepositError::Unconfirmed {
                note: Box::new(note),
                reason,
            }),
            Ok(Err(e)) => Err(DepositError::Ledger(e)),
            Err(_) => {
                log::warn!(
                    "deposit of {} not confirmed within {:?}",
                    note.commitment,
                    self.timeouts.submit
                );
                Err(DepositError::Unconfirmed {
                    note: Box::new(note),
                    reason: format!("no answer within {:?}", self.timeouts.submit),
                })
            }
        }
    }

    async fn bounded<T>(
        &self,
        limit: Duration,
        call: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, WithdrawError> {
        timeout(limit, call)
            .await
            .map_err(|_| WithdrawError::Timeout(limit))?
            .map_err(WithdrawError::from)
    }

    /// Fetch the current leaves and build a path for `commitment`
    pub async fn fetch_path(&self, commitment: &Commitment) -> Result<MerklePath, WithdrawError> {
        let leaves = self
            .bounded(self.timeouts.fetch, self.ledger.get_leaves(&self.tree))
            .await?;
        log::debug!("fetched {} leaves from tree {}", leaves.len(), self.tree);
        Ok(self.engine.compute_path(&leaves, commitment)?)
    }

    /// Withdraw `amount` from `note` to `recipient`.
    ///
    /// A second call for the same note while one is running fails with
    /// [`WithdrawError::InFlight`]. If the submission times out or the ledger
    /// drops the connection, the error carries the change note.
    pub async fn withdraw(
        &self,
        note: &DepositNote,
        recipient: Recipient,
        amount: u64,
    ) -> Result<WithdrawalReceipt, WithdrawError> {
        let nullifier_hash = note.nullifier_hash();
        if self.in_flight.insert(nullifier_hash, ()).is_some() {
            return Err(WithdrawError::InFlight(nullifier_hash));
        }
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            nullifier: nullifier_hash,
        };

        let path = self.fetch_path(&note.commitment).await?;
        let prepared = self
            .assembler
            .build_inputs(note, &path, recipient, amount)?;
        let proof = self
            .prover
            .generate_proof(&prepared.inputs, self.timeouts.proof)
            .await?;

        let payload = WithdrawInstruction {
            amount,
            nullifier_hash,
            new_commitment: prepared.inputs.public.new_commitment,
            proof,
        }
        .to_bytes()
        .map_err(|e| WithdrawError::Encode(e.to_string()))?;

        let submitted = timeout(
            self.timeouts.submit,
            self.ledger
                .submit_withdrawal(&self.tree, &recipient, payload),
        )
        .await;

        let reason = match submitted {
            Ok(Ok(reference)) => {
                log::info!("withdrew {} to {} ({})", amount, recipient, reference);
                return Ok(WithdrawalReceipt {
                    change_note: prepared
                        .change_note
                        .map(|change| change.with_settlement_reference(reference.clone())),
                    settlement_reference: reference,
                    nullifier_hash,
                    amount,
                });
            }
            Ok(Err(LedgerError::Unreachable(reason))) => reason,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => format!("no answer within {:?}", self.timeouts.submit),
        };

        log::warn!(
            "withdrawal for nullifier {} not confirmed: {}",
            nullifier_hash,
            reason
        );
        Err(WithdrawError::Unconfirmed {
            nullifier_hash,
            change_note: prepared.change_note.map(Box::new),
            reason,
        })
    }

    /// Release the proving backend
    pub async fn shutdown(self) {
        self.prover.shutdown().await;
    }
}
