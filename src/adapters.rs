use std::time::Duration;

use connector_blockfrost::Blockfrost;
use connector_core::{
    config::{Network, ProviderConfig},
    CancelToken, Datum, DatumHash, Delegation, Epoch, Error, EvalReport, GenesisParameters,
    ProtocolParameters, Provider, Script, ScriptHash, Tip, TxHash, TxoRef, Unit, Utxo, UtxoBatch,
};
use connector_kupmios::Kupmios;
use connector_maestro::Maestro;
use connector_utxorpc::Utxorpc;
use tracing::info;

/// A connected backend, picked from configuration
#[non_exhaustive]
pub enum ProviderBackend {
    Blockfrost(Blockfrost),
    Maestro(Maestro),
    Kupmios(Kupmios),
    Utxorpc(Utxorpc),
}

impl ProviderBackend {
    /// Builds the backend named by `config`.
    ///
    /// No request is made here. The UTxO RPC channel is spawned lazily and
    /// needs to be created from within a tokio runtime.
    pub fn connect(config: &ProviderConfig) -> Result<Self, Error> {
        let adapter = match config {
            ProviderConfig::Blockfrost(x) => Self::Blockfrost(Blockfrost::connect(x)?),
            ProviderConfig::Maestro(x) => Self::Maestro(Maestro::connect(x)?),
            ProviderConfig::Kupmios(x) => Self::Kupmios(Kupmios::connect(x)?),
            ProviderConfig::Utxorpc(x) => Self::Utxorpc(Utxorpc::connect(x)?),
        };

        info!(backend = adapter.name(), network = %config.network(), "provider ready");

        Ok(adapter)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderBackend::Blockfrost(_) => "blockfrost",
            ProviderBackend::Maestro(_) => "maestro",
            ProviderBackend::Kupmios(_) => "kupmios",
            ProviderBackend::Utxorpc(_) => "utxorpc",
        }
    }
}

impl Provider for ProviderBackend {
    async fn protocol_parameters(&self) -> Result<ProtocolParameters, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.protocol_parameters().await,
            ProviderBackend::Maestro(x) => x.protocol_parameters().await,
            ProviderBackend::Kupmios(x) => x.protocol_parameters().await,
            ProviderBackend::Utxorpc(x) => x.protocol_parameters().await,
        }
    }

    async fn genesis_parameters(&self) -> Result<GenesisParameters, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.genesis_parameters().await,
            ProviderBackend::Maestro(x) => x.genesis_parameters().await,
            ProviderBackend::Kupmios(x) => x.genesis_parameters().await,
            ProviderBackend::Utxorpc(x) => x.genesis_parameters().await,
        }
    }

    fn network(&self) -> Network {
        match self {
            ProviderBackend::Blockfrost(x) => x.network(),
            ProviderBackend::Maestro(x) => x.network(),
            ProviderBackend::Kupmios(x) => x.network(),
            ProviderBackend::Utxorpc(x) => x.network(),
        }
    }

    async fn current_epoch(&self) -> Result<Epoch, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.current_epoch().await,
            ProviderBackend::Maestro(x) => x.current_epoch().await,
            ProviderBackend::Kupmios(x) => x.current_epoch().await,
            ProviderBackend::Utxorpc(x) => x.current_epoch().await,
        }
    }

    async fn tip(&self) -> Result<Tip, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.tip().await,
            ProviderBackend::Maestro(x) => x.tip().await,
            ProviderBackend::Kupmios(x) => x.tip().await,
            ProviderBackend::Utxorpc(x) => x.tip().await,
        }
    }

    async fn utxos_by_address(&self, address: &str) -> Result<UtxoBatch, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.utxos_by_address(address).await,
            ProviderBackend::Maestro(x) => x.utxos_by_address(address).await,
            ProviderBackend::Kupmios(x) => x.utxos_by_address(address).await,
            ProviderBackend::Utxorpc(x) => x.utxos_by_address(address).await,
        }
    }

    async fn utxos_with_unit(&self, address: &str, unit: &Unit) -> Result<UtxoBatch, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.utxos_with_unit(address, unit).await,
            ProviderBackend::Maestro(x) => x.utxos_with_unit(address, unit).await,
            ProviderBackend::Kupmios(x) => x.utxos_with_unit(address, unit).await,
            ProviderBackend::Utxorpc(x) => x.utxos_with_unit(address, unit).await,
        }
    }

    async fn utxo_by_unit(&self, unit: &Unit) -> Result<Utxo, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.utxo_by_unit(unit).await,
            ProviderBackend::Maestro(x) => x.utxo_by_unit(unit).await,
            ProviderBackend::Kupmios(x) => x.utxo_by_unit(unit).await,
            ProviderBackend::Utxorpc(x) => x.utxo_by_unit(unit).await,
        }
    }

    async fn utxos_by_output_ref(&self, refs: &[TxoRef]) -> Result<UtxoBatch, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.utxos_by_output_ref(refs).await,
            ProviderBackend::Maestro(x) => x.utxos_by_output_ref(refs).await,
            ProviderBackend::Kupmios(x) => x.utxos_by_output_ref(refs).await,
            ProviderBackend::Utxorpc(x) => x.utxos_by_output_ref(refs).await,
        }
    }

    async fn delegation(&self, stake_address: &str) -> Result<Delegation, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.delegation(stake_address).await,
            ProviderBackend::Maestro(x) => x.delegation(stake_address).await,
            ProviderBackend::Kupmios(x) => x.delegation(stake_address).await,
            ProviderBackend::Utxorpc(x) => x.delegation(stake_address).await,
        }
    }

    async fn datum(&self, hash: &DatumHash) -> Result<Datum, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.datum(hash).await,
            ProviderBackend::Maestro(x) => x.datum(hash).await,
            ProviderBackend::Kupmios(x) => x.datum(hash).await,
            ProviderBackend::Utxorpc(x) => x.datum(hash).await,
        }
    }

    async fn await_confirmation<C: CancelToken>(
        &self,
        tx: &TxHash,
        interval: Duration,
        cancel: C,
    ) -> Result<bool, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.await_confirmation(tx, interval, cancel).await,
            ProviderBackend::Maestro(x) => x.await_confirmation(tx, interval, cancel).await,
            ProviderBackend::Kupmios(x) => x.await_confirmation(tx, interval, cancel).await,
            ProviderBackend::Utxorpc(x) => x.await_confirmation(tx, interval, cancel).await,
        }
    }

    async fn submit_tx(&self, tx: &[u8]) -> Result<TxHash, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.submit_tx(tx).await,
            ProviderBackend::Maestro(x) => x.submit_tx(tx).await,
            ProviderBackend::Kupmios(x) => x.submit_tx(tx).await,
            ProviderBackend::Utxorpc(x) => x.submit_tx(tx).await,
        }
    }

    async fn evaluate_tx(&self, tx: &[u8], additional_utxos: &[Utxo]) -> Result<EvalReport, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.evaluate_tx(tx, additional_utxos).await,
            ProviderBackend::Maestro(x) => x.evaluate_tx(tx, additional_utxos).await,
            ProviderBackend::Kupmios(x) => x.evaluate_tx(tx, additional_utxos).await,
            ProviderBackend::Utxorpc(x) => x.evaluate_tx(tx, additional_utxos).await,
        }
    }

    async fn script_by_hash(&self, hash: &ScriptHash) -> Result<Script, Error> {
        match self {
            ProviderBackend::Blockfrost(x) => x.script_by_hash(hash).await,
            ProviderBackend::Maestro(x) => x.script_by_hash(hash).await,
            ProviderBackend::Kupmios(x) => x.script_by_hash(hash).await,
            ProviderBackend::Utxorpc(x) => x.script_by_hash(hash).await,
        }
    }
}
