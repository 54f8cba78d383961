use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use cardano_connector::Config;

mod common;
mod query;
mod tx;

#[derive(Debug, Subcommand)]
enum Command {
    /// Current protocol parameters
    Params,
    /// Genesis parameters of the network
    Genesis,
    /// Slot, hash and height of the chain tip
    Tip,
    /// Current epoch number
    Epoch,
    /// UTxOs at an address
    Utxos(query::UtxosArgs),
    /// The single UTxO holding a unit
    UtxoByUnit(query::UnitArgs),
    /// UTxOs by `<tx hash>#<index>` reference
    Outrefs(query::OutrefsArgs),
    /// Delegation and rewards of a stake address
    Delegation(query::StakeArgs),
    /// A datum by its hash
    Datum(query::HashArgs),
    /// A script by its hash
    Script(query::HashArgs),
    /// Submit a signed tx
    Submit(tx::SubmitArgs),
    /// Evaluate the execution units of a tx
    Evaluate(tx::EvaluateArgs),
    /// Wait until a tx shows up on chain
    Await(tx::AwaitArgs),
}

#[derive(Debug, Parser)]
#[clap(name = "Cardano Connector")]
#[clap(bin_name = "connector")]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let config = Config::new(&args.config).into_diagnostic()?;

    common::setup_tracing(&config.logging)?;

    match args.command {
        Command::Params => query::params(&config)?,
        Command::Genesis => query::genesis(&config)?,
        Command::Tip => query::tip(&config)?,
        Command::Epoch => query::epoch(&config)?,
        Command::Utxos(x) => query::utxos(&config, &x)?,
        Command::UtxoByUnit(x) => query::utxo_by_unit(&config, &x)?,
        Command::Outrefs(x) => query::outrefs(&config, &x)?,
        Command::Delegation(x) => query::delegation(&config, &x)?,
        Command::Datum(x) => query::datum(&config, &x)?,
        Command::Script(x) => query::script(&config, &x)?,
        Command::Submit(x) => tx::submit(&config, &x)?,
        Command::Evaluate(x) => tx::evaluate(&config, &x)?,
        Command::Await(x) => tx::wait(&config, &x)?,
    };

    Ok(())
}
