//! HTTP Proving Backend
//!
//! Client for a remote prover service.
//!
//! ```text
//! GET  /v1/health                          -> 2xx when ready
//! POST /v1/execute {inputs}                -> {witness: hex}
//! POST /v1/prove   {witness: hex}          -> {proof: hex}
//! POST /v1/verify  {proof: hex, public}    -> {valid: bool}
//! ```
//!
//! Every response body is wrapped in a `status`-tagged envelope.

use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::backend::{ProvingBackend, Witness};
use crate::error::BackendError;
use crate::field::{FieldInputs, PublicFieldInputs};

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL of the prover service (e.g. "http://localhost:8080")
    pub coordinator_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            coordinator_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub inputs: FieldInputs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub witness: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProveRequest {
    pub witness: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProveResponse {
    pub proof: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub proof: String,
    pub public: PublicFieldInputs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse<T> {
    Success {
        data: T,
    },
    Error {
        message: String,
        code: Option<String>,
    },
}

impl<T> ApiResponse<T> {
    fn into_result(self, on_error: fn(String) -> BackendError) -> Result<T, BackendError> {
        match self {
            ApiResponse::Success { data } => Ok(data),
            ApiResponse::Error { message, code } => Err(on_error(match code {
                Some(code) => format!("{} ({})", message, code),
                None => message,
            })),
        }
    }
}

pub struct HttpBackend {
    config: HttpBackendConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("http client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.coordinator_url.trim_end_matches('/'), path)
    }

    async fn post<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
        on_error: fn(String) -> BackendError,
    ) -> Result<Resp, BackendError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let status = response.status();
        let envelope: ApiResponse<Resp> = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("{} (HTTP {})", e, status)))?;

        envelope.into_result(on_error)
    }
}

fn decode_hex(what: &str, value: &str) -> Result<Vec<u8>, BackendError> {
    hex::decode(value).map_err(|e| BackendError::InvalidResponse(format!("{}: {}", what, e)))
}

impl ProvingBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn init(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.url("/v1/health"))
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Unavailable(format!(
                "health check returned HTTP {}",
                response.status()
            )));
        }
        log::info!("prover service at {} is healthy", self.config.coordinator_url);
        Ok(())
    }

    async fn execute(&self, inputs: &FieldInputs) -> Result<Witness, BackendError> {
        let request = ExecuteRequest {
            inputs: inputs.clone(),
        };
        let response: ExecuteResponse = self
            .post("/v1/execute", &request, BackendError::Witness)
            .await?;
        Ok(Witness(decode_hex("witness", &response.witness)?))
    }

    async fn generate_proof(&self, witness: &Witness) -> Result<Vec<u8>, BackendError> {
        let request = ProveRequest {
            witness: hex::encode(&witness.0),
        };
        let response: ProveResponse = self
            .post("/v1/prove", &request, BackendError::Proving)
            .await?;
        decode_hex("proof", &response.proof)
    }

    async fn verify_proof(
        &self,
        proof: &[u8],
        public: &PublicFieldInputs,
    ) -> Result<bool, BackendError> {
        let request = VerifyRequest {
            proof: hex::encode(proof),
            public: public.clone(),
        };
        let response: VerifyResponse = self
            .post("/v1/verify", &request, BackendError::Verification)
            .await?;
        Ok(response.valid)
    }

    async fn shutdown(&self) {
        log::debug!("closing prover service client");
    }
}
