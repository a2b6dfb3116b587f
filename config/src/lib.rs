//! Zyncx Configuration
//!
//! Shared configuration for the Zyncx client tools.
//!
//! Handles loading configuration from:
//! 1. ZYNCX_CONFIG env var (explicit path)
//! 2. ./zyncx.toml (current directory)
//! 3. ~/.zyncx/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

const CONFIG_ENV: &str = "ZYNCX_CONFIG";
const LOCAL_CONFIG_FILE: &str = "zyncx.toml";
const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".zyncx";

const DEFAULT_TREE_DEPTH: usize = 20;
const MAX_TREE_DEPTH: usize = 32;
const DEFAULT_TREE_ID: &str = "0000000000000000000000000000000000000000000000000000000000000000";
const DEFAULT_COORDINATOR_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_PROOF_TIMEOUT_SECS: u64 = 300;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 60;

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZyncxConfig {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub prover: ProverConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Commitment tree the client targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_tree_depth")]
    pub depth: usize,
    /// Hex-encoded 32-byte tree identifier
    #[serde(default = "default_tree_id")]
    pub id: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_TREE_DEPTH,
            id: DEFAULT_TREE_ID.into(),
        }
    }
}

fn default_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}
fn default_tree_id() -> String {
    DEFAULT_TREE_ID.into()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProverMode {
    /// Native relation check, no real proof
    #[default]
    Mock,
    /// Remote prover service
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverConfig {
    #[serde(default)]
    pub mode: ProverMode,
    #[serde(default = "default_coordinator_url")]
    pub coordinator_url: String,
    #[serde(default = "default_proof_timeout")]
    pub proof_timeout_secs: u64,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            mode: ProverMode::Mock,
            coordinator_url: DEFAULT_COORDINATOR_URL.into(),
            proof_timeout_secs: DEFAULT_PROOF_TIMEOUT_SECS,
        }
    }
}

fn default_coordinator_url() -> String {
    DEFAULT_COORDINATOR_URL.into()
}
fn default_proof_timeout() -> u64 {
    DEFAULT_PROOF_TIMEOUT_SECS
}

/// Deadlines for ledger reads and submissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            submit_timeout_secs: DEFAULT_SUBMIT_TIMEOUT_SECS,
        }
    }
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}
fn default_submit_timeout() -> u64 {
    DEFAULT_SUBMIT_TIMEOUT_SECS
}

// Override helpers. `lookup` is the process environment outside of tests.

fn env_string(lookup: &dyn Fn(&str) -> Option<String>, key: &str, field: &mut String) {
    if let Some(v) = lookup(key) {
        *field = v;
    }
}

/// Set field if the variable is present and parseable
fn env_parse<T: std::str::FromStr>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    field: &mut T,
) {
    if let Some(v) = lookup(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

impl ZyncxConfig {
    /// Load configuration from the first config file found, with env overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("{} points at missing file {}", CONFIG_ENV, path.display());
        }

        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            return Some(local_path);
        }

        Self::default_config_path().filter(|p| p.exists())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(&|key| env::var(key).ok());
    }

    /// Apply `ZYNCX_*` overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        // Tree
        env_parse(lookup, "ZYNCX_TREE_DEPTH", &mut self.tree.depth);
        env_string(lookup, "ZYNCX_TREE_ID", &mut self.tree.id);

        // Prover
        if let Some(v) = lookup("ZYNCX_PROVER_MODE") {
            match v.to_ascii_lowercase().as_str() {
                "mock" => self.prover.mode = ProverMode::Mock,
                "http" => self.prover.mode = ProverMode::Http,
                other => log::warn!("Ignoring unknown ZYNCX_PROVER_MODE={}", other),
            }
        }
        env_string(lookup, "ZYNCX_COORDINATOR_URL", &mut self.prover.coordinator_url);
        env_parse(
            lookup,
            "ZYNCX_PROOF_TIMEOUT_SECS",
            &mut self.prover.proof_timeout_secs,
        );

        // Ledger
        env_parse(
            lookup,
            "ZYNCX_FETCH_TIMEOUT_SECS",
            &mut self.ledger.fetch_timeout_secs,
        );
        env_parse(
            lookup,
            "ZYNCX_SUBMIT_TIMEOUT_SECS",
            &mut self.ledger.submit_timeout_secs,
        );
    }

    /// Reject settings no component can run with
    pub fn validate(&self) -> Result<()> {
        if self.tree.depth == 0 || self.tree.depth > MAX_TREE_DEPTH {
            bail!(
                "tree.depth must be within 1..={}, got {}",
                MAX_TREE_DEPTH,
                self.tree.depth
            );
        }
        self.tree_id()?;

        for (name, secs) in [
            ("prover.proof_timeout_secs", self.prover.proof_timeout_secs),
            ("ledger.fetch_timeout_secs", self.ledger.fetch_timeout_secs),
            ("ledger.submit_timeout_secs", self.ledger.submit_timeout_secs),
        ] {
            if secs == 0 {
                bail!("{} must be greater than zero", name);
            }
        }
        Ok(())
    }

    /// Decoded tree identifier
    pub fn tree_id(&self) -> Result<[u8; 32]> {
        let bytes = hex::decode(&self.tree.id).context("tree.id is not valid hex")?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("tree.id must be 32 bytes, got {}", len))
    }

    pub fn proof_timeout(&self) -> Duration {
        Duration::from_secs(self.prover.proof_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger.fetch_timeout_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger.submit_timeout_secs)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}
