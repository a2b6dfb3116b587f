//! Zyncx Withdrawal Prover
//!
//! Turns a deposit note and a membership path into withdrawal circuit
//! inputs, encodes them for a proving backend, and drives that backend.
//!
//! ```text
//! DepositNote + MerklePath + Recipient + amount
//!        │
//!        ▼  InputAssembler
//! ProofInputs (+ change note)
//!        │
//!        ▼  ProofInputs::to_field_inputs
//! FieldInputs (decimal strings)
//!        │
//!        ▼  ProverContext<impl ProvingBackend>
//! proof bytes ‖ PublicInputs::public_inputs_bytes
//! ```

pub mod backend;
pub mod error;
pub mod field;
pub mod http;
pub mod inputs;
pub mod mock;

pub use backend::{AnyBackend, ProverContext, ProvingBackend, Witness};
pub use error::{BackendError, ProofError};
pub use field::{FieldInputs, PrivateFieldInputs, PublicFieldInputs};
pub use http::{HttpBackend, HttpBackendConfig};
pub use inputs::{
    InputAssembler, PreparedWithdrawal, PrivateInputs, ProofInputs, PublicInputs, Recipient,
    build_inputs,
};
pub use mock::{MOCK_PROOF_LEN, MockBackend};
