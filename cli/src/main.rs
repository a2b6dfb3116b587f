mod demo;
mod note;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use zyncx_config::{ProverMode, ZyncxConfig};
use zyncx_prover::{AnyBackend, HttpBackend, HttpBackendConfig, MockBackend};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "zyncx")]
#[command(about = "Zyncx privacy pool client", long_about = None)]
struct Args {
    /// Config file (otherwise ZYNCX_CONFIG, ./zyncx.toml, ~/.zyncx/config.toml)
    #[arg(long, global = true, env = "ZYNCX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create and inspect deposit notes
    #[command(subcommand)]
    Note(NoteCommand),

    /// Build a Merkle path for a note from a JSON list of hex leaves
    Path {
        /// Encoded note, or @file
        #[arg(long)]
        note: String,
        /// JSON file holding the ledger's leaves in order
        #[arg(long)]
        leaves: PathBuf,
    },

    /// Configuration helpers
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Deposit, partially withdraw and fully withdraw against an in-memory ledger
    Demo {
        /// Deposit amount in the smallest unit
        #[arg(long, default_value = "1000000000")]
        amount: u64,
        /// Amount taken out by the first withdrawal
        #[arg(long, default_value = "400000000")]
        first_withdrawal: u64,
    },
}

#[derive(Subcommand, Debug)]
enum NoteCommand {
    /// Generate secrets and print a new note
    New {
        #[arg(long)]
        amount: u64,
        /// Also write the note to this file (never overwritten)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Decode a note and print its public values
    Inspect {
        /// Encoded note, or @file
        note: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print a sample config file
    Sample,
    /// Print the effective configuration
    Show,
}

fn load_config(path: Option<&PathBuf>) -> Result<ZyncxConfig> {
    match path {
        Some(path) => ZyncxConfig::load_from(path),
        None => ZyncxConfig::load(),
    }
}

/// Proving backend selected by `[prover] mode`
pub fn build_backend(config: &ZyncxConfig) -> Result<AnyBackend> {
    Ok(match config.prover.mode {
        ProverMode::Mock => AnyBackend::Mock(MockBackend::new()),
        ProverMode::Http => AnyBackend::Http(
            HttpBackend::new(HttpBackendConfig {
                coordinator_url: config.prover.coordinator_url.clone(),
                request_timeout: config.proof_timeout(),
            })
            .context("Failed to create prover client")?,
        ),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Command::Note(NoteCommand::New { amount, out }) => note::new_note(amount, out.as_deref()),
        Command::Note(NoteCommand::Inspect { note }) => note::inspect(&note),
        Command::Path { note, leaves } => {
            let config = load_config(args.config.as_ref())?;
            note::path(&note, &leaves, config.tree.depth)
        }
        Command::Config(ConfigCommand::Sample) => {
            print!("{}", ZyncxConfig::generate_sample());
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let config = load_config(args.config.as_ref())?;
            print!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to render config")?
            );
            Ok(())
        }
        Command::Demo {
            amount,
            first_withdrawal,
        } => {
            let config = load_config(args.config.as_ref())?;
            demo::run(&config, amount, first_withdrawal).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_note_new() {
        let args = Args::try_parse_from(["zyncx", "note", "new", "--amount", "5"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Note(NoteCommand::New { amount: 5, out: None })
        ));
    }

    #[test]
    fn test_backend_follows_mode() {
        let mut config = ZyncxConfig::default();
        assert!(matches!(build_backend(&config).unwrap(), AnyBackend::Mock(_)));

        config.prover.mode = ProverMode::Http;
        assert!(matches!(build_backend(&config).unwrap(), AnyBackend::Http(_)));
    }
}
