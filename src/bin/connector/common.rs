use std::path::Path;

use miette::{Context as _, IntoDiagnostic};
use serde::Serialize;
use tracing_subscriber::{filter::Targets, prelude::*};

use cardano_connector::{config::LoggingConfig, Config, ProviderBackend};

pub fn setup_tracing(config: &LoggingConfig) -> miette::Result<()> {
    let level = config.max_level;

    let mut filter = Targets::new()
        .with_target("cardano_connector", level)
        .with_target("connector", level)
        .with_target("connector_core", level)
        .with_target("connector_blockfrost", level)
        .with_target("connector_maestro", level)
        .with_target("connector_kupmios", level)
        .with_target("connector_utxorpc", level);

    if config.include_reqwest {
        filter = filter.with_target("reqwest", level);
    }

    if config.include_tonic {
        filter = filter.with_target("tonic", level);
    }

    // logs go to stderr, stdout carries the json output
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish()
        .with(filter)
        .init();

    Ok(())
}

pub fn connect(config: &Config) -> miette::Result<ProviderBackend> {
    ProviderBackend::connect(&config.provider)
        .into_diagnostic()
        .context("connecting to provider")
}

pub fn print_json<T: Serialize>(value: &T) -> miette::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .into_diagnostic()
        .context("serializing output")?;

    println!("{json}");

    Ok(())
}

/// Reads a tx from disk, either as raw CBOR or as hex text.
pub fn read_tx(path: &Path) -> miette::Result<Vec<u8>> {
    let bytes = std::fs::read(path)
        .into_diagnostic()
        .with_context(|| format!("reading tx file {}", path.display()))?;

    let text = String::from_utf8_lossy(&bytes);

    match hex::decode(text.trim()) {
        Ok(decoded) => Ok(decoded),
        Err(_) => Ok(bytes),
    }
}
