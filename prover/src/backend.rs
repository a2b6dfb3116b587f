//! Proving Backend
//!
//! ```text
//! ProofInputs ──► FieldInputs ──► execute ──► Witness ──► generate_proof ──► proof
//!                                                                              │
//!                         PublicFieldInputs ──────────────► verify_proof ◄─────┘
//! ```
//!
//! The backend is initialised once per process and shut down explicitly.
//! Every call made through [`ProverContext`] carries a deadline.

use std::future::Future;
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::error::{BackendError, ProofError};
use crate::field::{FieldInputs, PublicFieldInputs};
use crate::http::HttpBackend;
use crate::inputs::{ProofInputs, PublicInputs};
use crate::mock::MockBackend;

/// Opaque solved witness, only meaningful to the backend that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness(pub Vec<u8>);

/// External circuit runtime
pub trait ProvingBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Load circuit artifacts or open connections
    fn init(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Solve the circuit for the given inputs
    fn execute(
        &self,
        inputs: &FieldInputs,
    ) -> impl Future<Output = Result<Witness, BackendError>> + Send;

    fn generate_proof(
        &self,
        witness: &Witness,
    ) -> impl Future<Output = Result<Vec<u8>, BackendError>> + Send;

    fn verify_proof(
        &self,
        proof: &[u8],
        public: &PublicFieldInputs,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    fn shutdown(&self) -> impl Future<Output = ()> + Send;
}

/// Process-wide handle around a backend with idempotent initialisation
pub struct ProverContext<B> {
    backend: B,
    ready: OnceCell<()>,
}

impl<B: ProvingBackend> ProverContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            ready: OnceCell::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// Initialise the backend; later calls are no-ops once one succeeds
    pub async fn init(&self) -> Result<(), ProofError> {
        self.ready
            .get_or_try_init(|| async {
                log::info!("initialising {} proving backend", self.backend.name());
                self.backend.init().await
            })
            .await
            .map(|_| ())
            .map_err(ProofError::ProofGenerationFailed)
    }

    /// Encode, solve and prove within `deadline`
    pub async fn generate_proof(
        &self,
        inputs: &ProofInputs,
        deadline: Duration,
    ) -> Result<Vec<u8>, ProofError> {
        let field_inputs = inputs.to_field_inputs()?;

        let proving = async {
            self.init().await?;
            let witness = self
                .backend
                .execute(&field_inputs)
                .await
                .map_err(ProofError::ProofGenerationFailed)?;
            self.backend
                .generate_proof(&witness)
                .await
                .map_err(ProofError::ProofGenerationFailed)
        };

        let proof = timeout(deadline, proving)
            .await
            .map_err(|_| ProofError::Timeout(deadline))??;

        log::debug!(
            "{} backend produced a {} byte proof",
            self.backend.name(),
            proof.len()
        );
        Ok(proof)
    }

    pub async fn verify_proof(
        &self,
        proof: &[u8],
        public: &PublicInputs,
        deadline: Duration,
    ) -> Result<bool, ProofError> {
        let public = public.to_field_inputs()?;

        let verifying = async {
            self.init().await?;
            self.backend
                .verify_proof(proof, &public)
                .await
                .map_err(ProofError::ProofGenerationFailed)
        };

        timeout(deadline, verifying)
            .await
            .map_err(|_| ProofError::Timeout(deadline))?
    }

    /// Release backend resources. Does nothing if the backend never started.
    pub async fn shutdown(self) {
        if self.ready.initialized() {
            log::info!("shutting down {} proving backend", self.backend.name());
            self.backend.shutdown().await;
        }
    }
}

/// Backend chosen at runtime from configuration
pub enum AnyBackend {
    Mock(MockBackend),
    Http(HttpBackend),
}

impl ProvingBackend for AnyBackend {
    fn name(&self) -> &'static str {
        match self {
            AnyBackend::Mock(b) => b.name(),
            AnyBackend::Http(b) => b.name(),
        }
    }

    async fn init(&self) -> Result<(), BackendError> {
        match self {
            AnyBackend::Mock(b) => b.init().await,
            AnyBackend::Http(b) => b.init().await,
        }
    }

    async fn execute(&self, inputs: &FieldInputs) -> Result<Witness, BackendError> {
        match self {
            AnyBackend::Mock(b) => b.execute(inputs).await,
            AnyBackend::Http(b) => b.execute(inputs).await,
        }
    }

    async fn generate_proof(&self, witness: &Witness) -> Result<Vec<u8>, BackendError> {
        match self {
            AnyBackend::Mock(b) => b.generate_proof(witness).await,
            AnyBackend::Http(b) => b.generate_proof(witness).await,
        }
    }

    async fn verify_proof(
        &self,
        proof: &[u8],
        public: &PublicFieldInputs,
    ) -> Result<bool, BackendError> {
        match self {
            AnyBackend::Mock(b) => b.verify_proof(proof, public).await,
            AnyBackend::Http(b) => b.verify_proof(proof, public).await,
        }
    }

    async fn shutdown(&self) {
        match self {
            AnyBackend::Mock(b) => b.shutdown().await,
            AnyBackend::Http(b) => b.shutdown().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{InputAssembler, Recipient};
    use rand::{SeedableRng, rngs::StdRng};
    use zyncx_privacy::{MerkleEngine, NullifierSecret, Secret, create_note};

    const DEPTH: usize = 4;

    fn prepared(withdraw: u64) -> crate::inputs::PreparedWithdrawal {
        let note = create_note(Secret([5u8; 32]), NullifierSecret([6u8; 32]), 100);
        let path = MerkleEngine::new(DEPTH)
            .compute_path(&[note.commitment], &note.commitment)
            .unwrap();
        InputAssembler::new(DEPTH)
            .build_inputs_with_rng(
                &note,
                &path,
                Recipient([9u8; 32]),
                withdraw,
                &mut StdRng::seed_from_u64(3),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let ctx = ProverContext::new(MockBackend::new());
        assert!(!ctx.is_ready());

        ctx.init().await.unwrap();
        ctx.init().await.unwrap();
        ctx.generate_proof(&prepared(100).inputs, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(ctx.is_ready());
        assert_eq!(ctx.backend().init_calls(), 1);
    }

    #[tokio::test]
    async fn test_prove_then_verify() {
        let ctx = ProverContext::new(MockBackend::new());
        let inputs = prepared(40).inputs;

        let proof = ctx
            .generate_proof(&inputs, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(
            ctx.verify_proof(&proof, &inputs.public, Duration::from_secs(5))
                .await
                .unwrap()
        );

        let mut other = inputs.public.clone();
        other.recipient = Recipient([1u8; 32]);
        assert!(
            !ctx.verify_proof(&proof, &other, Duration::from_secs(5))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = ProverContext::new(MockBackend::with_delay(Duration::from_secs(10)));
        let err = ctx
            .generate_proof(&prepared(100).inputs, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ProofError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_shutdown_only_after_init() {
        let idle = ProverContext::new(MockBackend::new());
        let calls = idle.backend().shutdown_counter();
        idle.shutdown().await;
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        let active = ProverContext::new(AnyBackend::Mock(MockBackend::new()));
        active.init().await.unwrap();
        assert_eq!(active.backend().name(), "mock");
        active.shutdown().await;
    }
}
