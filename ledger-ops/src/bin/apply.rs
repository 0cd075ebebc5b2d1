//! Apply a batch of transactions to a ledger
//!
//! Usage: `ledger-apply <batch.json>`
//!
//! The batch file holds accounts to fund and transactions to apply, in order.
//! One JSON transaction result is printed per line. `LEDGER_CONFIG` points at a
//! TOML config file; otherwise `LEDGER_*` environment variables are used.

use anyhow::Context;
use ledger_ops::{AccountId, Config, Ledger, Metrics, Transaction};
use prometheus::{Encoder, TextEncoder};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Batch {
    #[serde(default)]
    create_accounts: Vec<NewAccount>,
    #[serde(default)]
    transactions: Vec<Transaction>,
}

#[derive(Debug, Deserialize)]
struct NewAccount {
    account_id: AccountId,
    balance: Decimal,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: ledger-apply <batch.json>")?;

    let config = match std::env::var("LEDGER_CONFIG") {
        Ok(config_path) => Config::from_file(&config_path)
            .with_context(|| format!("loading config from {}", config_path))?,
        Err(_) => Config::from_env()?,
    };

    let batch: Batch = serde_json::from_str(
        &std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?,
    )
    .with_context(|| format!("parsing {}", path))?;

    let metrics = Arc::new(Metrics::new()?);
    let mut ledger = Ledger::open(config)?.with_observer(metrics.clone());

    for account in batch.create_accounts {
        ledger.create_account(account.account_id, account.balance)?;
    }

    for tx in &batch.transactions {
        let result = ledger.apply_transaction(tx)?;
        println!("{}", serde_json::to_string(&result)?);
    }

    let closed = ledger.close_ledger()?;
    tracing::info!(ledger_seq = closed.ledger_seq, "Batch applied");

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metrics.registry().gather(), &mut buffer)?;
    tracing::debug!(metrics = %String::from_utf8_lossy(&buffer), "Final metrics");

    Ok(())
}
