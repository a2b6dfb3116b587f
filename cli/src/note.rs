use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use zyncx_privacy::{Commitment, DepositNote, MerkleEngine, MerklePath};

/// Public view of a note. Secrets are never part of it.
#[derive(Debug, Serialize)]
pub struct NoteSummary {
    pub amount: u64,
    pub commitment: String,
    pub precommitment: String,
    pub nullifier_hash: String,
    pub settlement_reference: Option<String>,
    pub created_at: i64,
}

impl From<&DepositNote> for NoteSummary {
    fn from(note: &DepositNote) -> Self {
        Self {
            amount: note.amount,
            commitment: note.commitment.to_hex(),
            precommitment: note.precommitment.to_hex(),
            nullifier_hash: note.nullifier_hash().to_hex(),
            settlement_reference: note.settlement_reference.clone(),
            created_at: note.created_at,
        }
    }
}

/// Merkle path as printed by `zyncx path`
#[derive(Debug, Serialize)]
pub struct PathOutput {
    pub index: u64,
    pub root: String,
    pub siblings: Vec<String>,
    pub path_bits: Vec<bool>,
}

impl From<&MerklePath> for PathOutput {
    fn from(path: &MerklePath) -> Self {
        Self {
            index: path.index,
            root: hex::encode(path.root),
            siblings: path.siblings.iter().map(hex::encode).collect(),
            path_bits: path.path_bits.clone(),
        }
    }
}

/// Accept either an encoded note or `@path` to a file holding one
pub fn read_note(arg: &str) -> Result<DepositNote> {
    let encoded = match arg.strip_prefix('@') {
        Some(file) => {
            fs::read_to_string(file).with_context(|| format!("Failed to read note file {}", file))?
        }
        None => arg.to_string(),
    };
    DepositNote::decode(encoded.trim()).context("Invalid note")
}

pub fn parse_leaves(json: &str) -> Result<Vec<Commitment>> {
    let raw: Vec<String> = serde_json::from_str(json).context("Leaves must be a JSON array")?;
    raw.iter()
        .enumerate()
        .map(|(i, leaf)| {
            let bytes = hex::decode(leaf.trim_start_matches("0x"))
                .with_context(|| format!("Leaf {} is not hex", i))?;
            let bytes: [u8; 32] = bytes
                .try_into()
                .map_err(|_| anyhow!("Leaf {} is not 32 bytes", i))?;
            Ok(Commitment(bytes))
        })
        .collect()
}

pub fn new_note(amount: u64, out: Option<&Path>) -> Result<()> {
    if amount == 0 {
        return Err(anyhow!("Amount must be greater than zero"));
    }
    let note = DepositNote::generate(amount).context("Failed to generate note secrets")?;
    let encoded = note.encode();

    if let Some(path) = out {
        write_private(path, &encoded)?;
        log::info!("wrote note {} to {}", note.commitment, path.display());
    }

    println!("{}", encoded);
    eprintln!("commitment: {}", note.commitment);
    eprintln!("Keep this note safe. Anyone holding it can withdraw the deposit.");
    Ok(())
}

/// Write `contents` to a new file readable only by the owner
fn write_private(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        return Err(anyhow!(
            "File {} already exists. Remove it first or use a different filename.",
            path.display()
        ));
    }

    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    #[cfg(unix)]
    {
        let mut perms = f.metadata()?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    f.write_all(contents.as_bytes())?;
    f.write_all(b"\n")?;
    Ok(())
}

pub fn inspect(arg: &str) -> Result<()> {
    let note = read_note(arg)?;
    if !note.is_consistent() {
        return Err(anyhow!("Note commitment does not match its secrets"));
    }
    println!("{}", serde_json::to_string_pretty(&NoteSummary::from(&note))?);
    Ok(())
}

pub fn path(note: &str, leaves: &Path, depth: usize) -> Result<()> {
    let note = read_note(note)?;
    let json = fs::read_to_string(leaves)
        .with_context(|| format!("Failed to read leaves from {}", leaves.display()))?;
    let leaves = parse_leaves(&json)?;

    let path = MerkleEngine::try_new(depth)?
        .compute_path(&leaves, &note.commitment)
        .context("Failed to build path")?;
    println!("{}", serde_json::to_string_pretty(&PathOutput::from(&path))?);
    Ok(())
}
