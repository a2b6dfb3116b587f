use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use zyncx_config::ZyncxConfig;
use zyncx_core::{ClientTimeouts, InMemoryLedger, PoolClient, TreeId};
use zyncx_prover::Recipient;

use crate::build_backend;

/// Run a deposit, a partial withdrawal and a full withdrawal of the change
/// against an in-memory ledger.
pub async fn run(config: &ZyncxConfig, amount: u64, first_withdrawal: u64) -> Result<()> {
    if first_withdrawal == 0 || first_withdrawal >= amount {
        return Err(anyhow!(
            "First withdrawal must be between 1 and {}",
            amount.saturating_sub(1)
        ));
    }

    let tree = TreeId(config.tree_id()?);
    let depth = config.tree.depth;

    let ledger = InMemoryLedger::new(depth, build_backend(config)?)
        .with_verify_timeout(config.proof_timeout());
    ledger.create_tree(tree).await;
    let ledger = Arc::new(ledger);

    let client = PoolClient::new(Arc::clone(&ledger), build_backend(config)?, tree, depth)
        .with_timeouts(ClientTimeouts {
            fetch: config.fetch_timeout(),
            submit: config.submit_timeout(),
            proof: config.proof_timeout(),
        });

    println!("tree {} (depth {})", tree, depth);

    let note = client.deposit(amount).await.context("Deposit failed")?;
    println!(
        "deposited {} -> commitment {} ({})",
        note.amount,
        note.commitment,
        note.settlement_reference.as_deref().unwrap_or("-")
    );

    let recipient = Recipient([0x42; 32]);
    let receipt = client
        .withdraw(&note, recipient, first_withdrawal)
        .await
        .context("Partial withdrawal failed")?;
    println!(
        "withdrew {} to {} ({})",
        receipt.amount, recipient, receipt.settlement_reference
    );

    let change = receipt
        .change_note
        .ok_or_else(|| anyhow!("Partial withdrawal returned no change note"))?;
    println!("change note {} holds {}", change.commitment, change.amount);

    let receipt = client
        .withdraw(&change, recipient, change.amount)
        .await
        .context("Withdrawal of change failed")?;
    println!(
        "withdrew {} to {} ({})",
        receipt.amount, recipient, receipt.settlement_reference
    );

    println!(
        "recipient received {}, pool balance {}",
        ledger.paid_to(&recipient).await,
        ledger.balance(&tree).await?
    );

    client.shutdown().await;
    if let Ok(ledger) = Arc::try_unwrap(ledger) {
        ledger.shutdown().await;
    }
    Ok(())
}
