use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use miette::{Context as _, IntoDiagnostic};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use cardano_connector::{
    core::{parse_hash, Provider as _, Utxo},
    Config,
};

use crate::common::{connect, print_json, read_tx};

#[derive(Debug, clap::Args)]
pub struct SubmitArgs {
    /// signed tx, as raw CBOR or hex
    file: PathBuf,
}

#[derive(Debug, clap::Args)]
pub struct EvaluateArgs {
    /// tx to evaluate, as raw CBOR or hex
    file: PathBuf,

    /// json array of extra UTxOs the tx depends on
    #[arg(long)]
    utxos: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct AwaitArgs {
    tx_hash: String,

    /// seconds between checks, 0 uses the backend default
    #[arg(long, default_value_t = 0)]
    interval_secs: u64,

    /// give up after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
pub async fn submit(config: &Config, args: &SubmitArgs) -> miette::Result<()> {
    let tx = read_tx(&args.file)?;
    let provider = connect(config)?;

    let hash = provider
        .submit_tx(&tx)
        .await
        .into_diagnostic()
        .context("submitting tx")?;

    print_json(&json!({ "tx_hash": hash }))
}

fn read_utxos(path: &Path) -> miette::Result<Vec<Utxo>> {
    let raw = std::fs::read_to_string(path)
        .into_diagnostic()
        .with_context(|| format!("reading utxos file {}", path.display()))?;

    serde_json::from_str(&raw)
        .into_diagnostic()
        .context("parsing additional utxos")
}

#[tokio::main]
pub async fn evaluate(config: &Config, args: &EvaluateArgs) -> miette::Result<()> {
    let tx = read_tx(&args.file)?;

    let additional = match &args.utxos {
        Some(path) => read_utxos(path)?,
        None => vec![],
    };

    let provider = connect(config)?;

    let report = provider
        .evaluate_tx(&tx, &additional)
        .await
        .into_diagnostic()
        .context("evaluating tx")?;

    print_json(&report)
}

#[tokio::main]
pub async fn wait(config: &Config, args: &AwaitArgs) -> miette::Result<()> {
    let hash = parse_hash::<32>(&args.tx_hash).into_diagnostic()?;
    let provider = connect(config)?;

    let cancel = CancellationToken::new();

    let watchdog = cancel.clone();
    let timeout = args.timeout_secs.map(Duration::from_secs);

    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(x) => tokio::time::sleep(x).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => warn!("ctrl-c received, giving up"),
            _ = deadline => warn!("timed out waiting for confirmation"),
        }

        watchdog.cancel();
    });

    info!(%hash, "waiting for confirmation");

    let confirmed = provider
        .await_confirmation(&hash, Duration::from_secs(args.interval_secs), cancel)
        .await
        .into_diagnostic()
        .with_context(|| format!("awaiting {hash}"))?;

    print_json(&json!({ "tx_hash": hash, "confirmed": confirmed }))
}
