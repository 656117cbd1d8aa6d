#[path = "mailprobe-cli/args.rs"]
mod args;
#[path = "mailprobe-cli/output.rs"]
mod output;

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use mailprobe_lib::{ProbeConfig, ValidationRecord, Validator};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::args::Cli;

// Exit codes: 0 whatever the verdicts, non-zero only for invocation, config or resolver errors.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);
    cli.check_invocation()?;

    let config = cli.probe_config()?;
    if let Some(path) = &config.loaded_config_path {
        info!("configuration loaded from {path}");
    }
    let addresses = collect_addresses(&cli)?;
    let records = run(config, &addresses).await?;
    output::write_reports(&records, &cli)
}

fn init_tracing(cli: &Cli) {
    let filter = match cli.log_filter() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn collect_addresses(cli: &Cli) -> Result<Vec<String>> {
    let mut addresses = cli.addresses.clone();
    if cli.stdin {
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                addresses.push(trimmed.to_string());
            }
        }
    }
    Ok(addresses)
}

async fn run(config: ProbeConfig, addresses: &[String]) -> Result<Vec<ValidationRecord>> {
    let validator = Validator::new(config).context("initialise validator")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling remaining probes");
            on_interrupt.cancel();
        }
    });

    let records = validator
        .validate_bulk_with_cancel(addresses, &cancel)
        .await;
    cancel.cancel();
    Ok(records)
}
