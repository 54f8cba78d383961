//! Maestro backend for the canonical [`Provider`] interface.

use std::time::Duration;

use itertools::Itertools;
use tracing::{debug, info, warn};

use connector_core::{
    config::{MaestroConfig, Network},
    paging::{fan_out, walk_cursor, Page, MAX_CONCURRENT_FETCHES},
    poller::{poll_confirmation, ConfirmationState},
    provider::{filter_by_unit, require_tx_hash, single_holder},
    CancelToken, Datum, DatumHash, Delegation, Epoch, Error, EvalReport, GenesisParameters,
    ProtocolParameters, Provider, ResultExt, Script, ScriptHash, StakeAddress, Tip, TxHash,
    TxoRef, Unit, Utxo, UtxoBatch,
};

pub mod api;
pub mod client;
pub mod mapping;
pub mod types;

pub use api::{ApiError, MaestroApi, UtxoQuery};
pub use client::HttpClient;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

const HOLDER_SAMPLE: u32 = 2;

pub struct Maestro<A = HttpClient> {
    api: A,
    network: Network,
}

impl Maestro<HttpClient> {
    pub fn connect(config: &MaestroConfig) -> Result<Self, Error> {
        let api = HttpClient::from_config(config)?;
        Ok(Self::new(api, config.network))
    }
}

impl<A: MaestroApi> Maestro<A> {
    pub fn new(api: A, network: Network) -> Self {
        Self { api, network }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    async fn address_utxos(&self, address: &str, asset: Option<&str>) -> Result<UtxoBatch, Error> {
        let items = walk_cursor(|cursor| async move {
            let query = UtxoQuery { asset, cursor };

            self.api
                .address_utxos(address, query)
                .await
                .map(|envelope| Page {
                    items: envelope.data,
                    next: envelope.next_cursor,
                })
                .map_err(Error::from)
        })
        .await
        .context(address)?;

        let unique = items
            .into_iter()
            .unique_by(|x| (x.tx_hash.clone(), x.index))
            .collect_vec();

        debug!(address, count = unique.len(), "fetched address utxos");

        let utxos: Vec<_> = unique.iter().map(mapping::utxo).try_collect()?;

        Ok(utxos.into())
    }

    async fn txo(&self, txo: TxoRef) -> Result<Utxo, Error> {
        let envelope = self
            .api
            .txo(&txo.hash().to_string(), txo.index())
            .await?;

        mapping::utxo(&envelope.data)
    }

    async fn account_epoch(&self, block_hash: &str) -> Option<Epoch> {
        match self.api.block(block_hash).await {
            Ok(block) => Some(block.data.epoch),
            Err(err) => {
                warn!(block_hash, %err, "can't resolve epoch of account snapshot");
                None
            }
        }
    }

    async fn check_tx(&self, hash: &TxHash) -> Result<ConfirmationState, Error> {
        let envelope = self.api.tx_cbor(&hash.to_string()).await?;

        if envelope.data.is_empty() {
            return Ok(ConfirmationState::Waiting);
        }

        Ok(ConfirmationState::Confirmed)
    }
}

impl<A: MaestroApi> Provider for Maestro<A> {
    async fn protocol_parameters(&self) -> Result<ProtocolParameters, Error> {
        let envelope = self.api.protocol_parameters().await?;
        mapping::protocol_parameters(envelope.data).context("protocol parameters")
    }

    async fn genesis_parameters(&self) -> Result<GenesisParameters, Error> {
        Err(Error::NotImplemented("maestro genesis parameters"))
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn current_epoch(&self) -> Result<Epoch, Error> {
        Ok(self.api.current_epoch().await?.data.epoch_no)
    }

    async fn tip(&self) -> Result<Tip, Error> {
        let envelope = self.api.chain_tip().await?;
        mapping::tip(envelope.data)
    }

    async fn utxos_by_address(&self, address: &str) -> Result<UtxoBatch, Error> {
        self.address_utxos(address, None).await
    }

    async fn utxos_with_unit(&self, address: &str, unit: &Unit) -> Result<UtxoBatch, Error> {
        match unit {
            Unit::Lovelace => self.address_utxos(address, None).await,
            asset => {
                let filter = asset.to_string();
                self.address_utxos(address, Some(&filter)).await
            }
        }
    }

    async fn utxo_by_unit(&self, unit: &Unit) -> Result<Utxo, Error> {
        if unit.is_lovelace() {
            return Err(Error::InvalidUnit("lovelace has no single holder".into()));
        }

        let key = unit.to_string();

        let holders = match self.api.asset_holders(&key, HOLDER_SAMPLE).await {
            Ok(x) => x.data,
            Err(err) if err.status_code() == Some(404) => vec![],
            Err(err) => return Err(Error::from(err).context(format!("holders of {unit}"))),
        };

        let holder = single_holder(holders, &format!("holders of {unit}"))?;

        let batch = self.utxos_with_unit(&holder.address, unit).await?;

        let candidates = filter_by_unit(batch, unit).utxos;

        single_holder(candidates, &format!("utxos holding {unit}"))
    }

    async fn utxos_by_output_ref(&self, refs: &[TxoRef]) -> Result<UtxoBatch, Error> {
        let keys = refs.iter().copied().unique().collect_vec();

        let found = fan_out(keys, MAX_CONCURRENT_FETCHES, |txo| self.txo(txo)).await?;

        Ok(found.into_iter().map(|(_, utxo)| utxo).collect_vec().into())
    }

    async fn delegation(&self, stake_address: &str) -> Result<Delegation, Error> {
        let stake = StakeAddress::parse(stake_address)?;

        let envelope = match self.api.account(stake.as_str()).await {
            Ok(x) => x,
            Err(err) if err.status_code() == Some(404) => return Ok(Delegation::undelegated()),
            Err(err) => return Err(Error::from(err).context(stake_address)),
        };

        let epoch = match &envelope.last_updated {
            Some(updated) => self.account_epoch(&updated.block_hash).await,
            None => None,
        };

        mapping::delegation(envelope.data, epoch).context(stake_address)
    }

    async fn datum(&self, hash: &DatumHash) -> Result<Datum, Error> {
        let envelope = self
            .api
            .datum(&hash.to_string())
            .await
            .map_err(Error::from)
            .context(format!("datum {hash}"))?;

        if envelope.data.bytes.is_empty() {
            return Err(Error::NotFound(format!("datum {hash}")));
        }

        Datum::decode_hex(&envelope.data.bytes).context(format!("datum {hash}"))
    }

    async fn await_confirmation<C: CancelToken>(
        &self,
        tx: &TxHash,
        interval: Duration,
        cancel: C,
    ) -> Result<bool, Error> {
        poll_confirmation(tx, interval, DEFAULT_POLL_INTERVAL, cancel, || {
            self.check_tx(tx)
        })
        .await
    }

    async fn submit_tx(&self, tx: &[u8]) -> Result<TxHash, Error> {
        let body = match self.api.submit(tx).await {
            Ok(x) => x,
            Err(err) if err.status_code() == Some(400) => {
                return Err(Error::submission(err.message()))
            }
            Err(err) => return Err(err.into()),
        };

        let hash = require_tx_hash(&body)?;

        info!(%hash, "tx submitted");

        Ok(hash)
    }

    async fn evaluate_tx(&self, tx: &[u8], additional_utxos: &[Utxo]) -> Result<EvalReport, Error> {
        let request = types::EvalRequest {
            cbor: hex::encode(tx),
            additional_utxos: additional_utxos
                .iter()
                .map(mapping::additional_utxo)
                .try_collect()?,
        };

        let results = match self.api.evaluate(&request).await {
            Ok(x) => x,
            Err(err) if err.status_code() == Some(400) => {
                return Err(Error::EvaluationFailed(err.message()))
            }
            Err(err) => return Err(err.into()),
        };

        Ok(mapping::eval_report(results))
    }

    async fn script_by_hash(&self, hash: &ScriptHash) -> Result<Script, Error> {
        let envelope = self
            .api
            .script(&hash.to_string())
            .await
            .map_err(Error::from)
            .context(format!("script {hash}"))?;

        mapping::reference_script(&envelope.data).context(format!("script {hash}"))
    }
}
