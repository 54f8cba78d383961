use miette::{Context as _, IntoDiagnostic};

use cardano_connector::{
    core::{parse_hash, Provider as _, TxoRef, Unit},
    Config,
};

use crate::common::{connect, print_json};

#[derive(Debug, clap::Args)]
pub struct UtxosArgs {
    /// bech32 or base58 address
    address: String,

    /// only outputs holding this unit (`lovelace` or policy id + asset name hex)
    #[arg(long, short)]
    unit: Option<Unit>,
}

#[derive(Debug, clap::Args)]
pub struct UnitArgs {
    unit: Unit,
}

#[derive(Debug, clap::Args)]
pub struct OutrefsArgs {
    /// one or more `<tx hash>#<index>`
    #[arg(required = true)]
    refs: Vec<TxoRef>,
}

#[derive(Debug, clap::Args)]
pub struct StakeArgs {
    stake_address: String,
}

#[derive(Debug, clap::Args)]
pub struct HashArgs {
    hash: String,
}

#[tokio::main]
pub async fn params(config: &Config) -> miette::Result<()> {
    let provider = connect(config)?;

    let params = provider
        .protocol_parameters()
        .await
        .into_diagnostic()
        .context("fetching protocol parameters")?;

    print_json(&params)
}

#[tokio::main]
pub async fn genesis(config: &Config) -> miette::Result<()> {
    let provider = connect(config)?;

    let genesis = provider
        .genesis_parameters()
        .await
        .into_diagnostic()
        .context("fetching genesis parameters")?;

    print_json(&genesis)
}

#[tokio::main]
pub async fn tip(config: &Config) -> miette::Result<()> {
    let provider = connect(config)?;

    let tip = provider
        .tip()
        .await
        .into_diagnostic()
        .context("fetching chain tip")?;

    print_json(&tip)
}

#[tokio::main]
pub async fn epoch(config: &Config) -> miette::Result<()> {
    let provider = connect(config)?;

    let epoch = provider
        .current_epoch()
        .await
        .into_diagnostic()
        .context("fetching current epoch")?;

    print_json(&epoch)
}

#[tokio::main]
pub async fn utxos(config: &Config, args: &UtxosArgs) -> miette::Result<()> {
    let provider = connect(config)?;

    let batch = match &args.unit {
        Some(unit) => provider.utxos_with_unit(&args.address, unit).await,
        None => provider.utxos_by_address(&args.address).await,
    }
    .into_diagnostic()
    .with_context(|| format!("fetching utxos at {}", args.address))?;

    for warning in &batch.warnings {
        tracing::warn!(%warning, "partial data");
    }

    print_json(&batch)
}

#[tokio::main]
pub async fn utxo_by_unit(config: &Config, args: &UnitArgs) -> miette::Result<()> {
    let provider = connect(config)?;

    let utxo = provider
        .utxo_by_unit(&args.unit)
        .await
        .into_diagnostic()
        .with_context(|| format!("fetching holder of {}", args.unit))?;

    print_json(&utxo)
}

#[tokio::main]
pub async fn outrefs(config: &Config, args: &OutrefsArgs) -> miette::Result<()> {
    let provider = connect(config)?;

    let batch = provider
        .utxos_by_output_ref(&args.refs)
        .await
        .into_diagnostic()
        .context("fetching utxos by reference")?;

    print_json(&batch)
}

#[tokio::main]
pub async fn delegation(config: &Config, args: &StakeArgs) -> miette::Result<()> {
    let provider = connect(config)?;

    let delegation = provider
        .delegation(&args.stake_address)
        .await
        .into_diagnostic()
        .with_context(|| format!("fetching delegation of {}", args.stake_address))?;

    print_json(&delegation)
}

#[tokio::main]
pub async fn datum(config: &Config, args: &HashArgs) -> miette::Result<()> {
    let hash = parse_hash::<32>(&args.hash).into_diagnostic()?;
    let provider = connect(config)?;

    let datum = provider
        .datum(&hash)
        .await
        .into_diagnostic()
        .with_context(|| format!("fetching datum {hash}"))?;

    print_json(&datum)
}

#[tokio::main]
pub async fn script(config: &Config, args: &HashArgs) -> miette::Result<()> {
    let hash = parse_hash::<28>(&args.hash).into_diagnostic()?;
    let provider = connect(config)?;

    let script = provider
        .script_by_hash(&hash)
        .await
        .into_diagnostic()
        .with_context(|| format!("fetching script {hash}"))?;

    print_json(&script)
}
