//! Provider-agnostic access to Cardano chain data.
//!
//! Every backend normalizes its responses into the canonical model of
//! [`connector_core`]. [`ProviderBackend`] picks one from configuration.

pub mod adapters;
pub mod config;

pub use connector_blockfrost as blockfrost;
pub use connector_core as core;
pub use connector_kupmios as kupmios;
pub use connector_maestro as maestro;
pub use connector_utxorpc as utxorpc;

pub use adapters::ProviderBackend;
pub use config::Config;

#[cfg(test)]
mod tests;
