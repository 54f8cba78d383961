//! Blockfrost backend for the canonical [`Provider`] interface.

use std::time::Duration;

use itertools::Itertools;
use tracing::{debug, info, warn};

use connector_core::{
    config::{BlockfrostConfig, Network},
    paging::{self, walk_pages},
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

pub use api::{ApiError, BlockfrostApi};
pub use client::HttpClient;

use mapping::OutputFields;

/// Poll interval used when the caller passes a zero duration.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Number of holders requested when resolving a unit to its single UTxO.
const HOLDER_SAMPLE: u32 = 2;

pub struct Blockfrost<A = HttpClient> {
    api: A,
    network: Network,
    submit_endpoints: Vec<String>,
}

impl Blockfrost<HttpClient> {
    pub fn connect(config: &BlockfrostConfig) -> Result<Self, Error> {
        let api = HttpClient::from_config(config)?;
        Ok(Self::new(api, config.network, config.submit_endpoints.clone()))
    }
}

impl<A: BlockfrostApi> Blockfrost<A> {
    pub fn new(api: A, network: Network, submit_endpoints: Vec<String>) -> Self {
        Self {
            api,
            network,
            submit_endpoints,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    async fn adapt_output(&self, fields: &impl OutputFields) -> Result<connector_core::Output, Error> {
        let mut builder = mapping::output_builder(fields)?;

        if let Some(hash) = fields.reference_script_hash() {
            let hash = connector_core::parse_hash::<28>(hash)?;
            let script = self.script_by_hash(&hash).await?;
            builder = builder.script_ref(Some(script));
        }

        builder.build()
    }

    async fn adapt_address_utxos(&self, items: Vec<types::AddressUtxo>) -> Result<UtxoBatch, Error> {
        let mut batch = UtxoBatch::default();

        for item in items {
            let input = TxoRef(connector_core::parse_hash(&item.tx_hash)?, item.output_index);

            let output = self
                .adapt_output(&item)
                .await
                .context(format!("utxo {input}"))?;

            batch.utxos.push(Utxo::new(input, output));
        }

        Ok(batch)
    }

    async fn address_utxos(&self, address: &str, unit: Option<&str>) -> Result<UtxoBatch, Error> {
        let items = walk_pages(|page| async move {
            self.api
                .address_utxos(address, unit, page)
                .await
                .map_err(Error::from)
        })
        .await
        .context(address)?;

        let unique = items
            .into_iter()
            .unique_by(|x| (x.tx_hash.clone(), x.output_index))
            .collect_vec();

        debug!(address, count = unique.len(), "fetched address utxos");

        self.adapt_address_utxos(unique).await
    }

    async fn tx_outputs(&self, hash: TxHash) -> Result<UtxoBatch, Error> {
        let body = self.api.tx_utxos(&hash.to_string()).await?;

        let mut batch = UtxoBatch::default();

        // collateral returns only exist on chain when phase-2 validation fails
        for output in body.outputs.iter().filter(|x| !x.collateral) {
            let input = TxoRef(hash, output.output_index);

            let adapted = self
                .adapt_output(output)
                .await
                .context(format!("utxo {input}"))?;

            batch.utxos.push(Utxo::new(input, adapted));
        }

        Ok(batch)
    }

    async fn check_tx(&self, hash: &TxHash) -> Result<ConfirmationState, Error> {
        let tx = self.api.tx(&hash.to_string()).await?;

        match tx.block {
            Some(block) if !block.is_empty() => Ok(ConfirmationState::Confirmed),
            _ => Ok(ConfirmationState::Waiting),
        }
    }

    async fn submit_custom(&self, tx: &[u8]) -> Option<TxHash> {
        for endpoint in self.submit_endpoints.iter() {
            match self.api.submit(Some(endpoint), tx).await {
                Ok(body) => match require_tx_hash(&body) {
                    Ok(hash) => {
                        info!(%hash, endpoint, "tx submitted through custom endpoint");
                        return Some(hash);
                    }
                    Err(err) => warn!(endpoint, %err, "custom endpoint gave no tx hash"),
                },
                Err(err) => warn!(endpoint, %err, "custom endpoint rejected tx"),
            }
        }

        None
    }
}

impl<A: BlockfrostApi> Provider for Blockfrost<A> {
    async fn protocol_parameters(&self) -> Result<ProtocolParameters, Error> {
        let params = self.api.latest_epoch_parameters().await?;
        mapping::protocol_parameters(params).context("protocol parameters")
    }

    async fn genesis_parameters(&self) -> Result<GenesisParameters, Error> {
        let genesis = self.api.genesis().await?;
        mapping::genesis_parameters(genesis).context("genesis")
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn current_epoch(&self) -> Result<Epoch, Error> {
        Ok(self.api.latest_epoch().await?.epoch)
    }

    async fn tip(&self) -> Result<Tip, Error> {
        let block = self.api.latest_block().await?;
        mapping::tip(block)
    }

    async fn utxos_by_address(&self, address: &str) -> Result<UtxoBatch, Error> {
        self.address_utxos(address, None).await
    }

    async fn utxos_with_unit(&self, address: &str, unit: &Unit) -> Result<UtxoBatch, Error> {
        let filter = mapping::unit_filter(unit);
        self.address_utxos(address, filter.as_deref()).await
    }

    async fn utxo_by_unit(&self, unit: &Unit) -> Result<Utxo, Error> {
        let Some(filter) = mapping::unit_filter(unit) else {
            return Err(Error::InvalidUnit("lovelace has no single holder".into()));
        };

        let holders = match self.api.asset_addresses(&filter, HOLDER_SAMPLE).await {
            Ok(x) => x,
            Err(err) if err.status_code() == Some(404) => vec![],
            Err(err) => return Err(Error::from(err).context(format!("holders of {unit}"))),
        };

        let holder = single_holder(holders, &format!("holders of {unit}"))?;

        let batch = self.utxos_with_unit(&holder.address, unit).await?;

        let candidates = filter_by_unit(batch, unit).utxos;

        single_holder(candidates, &format!("utxos holding {unit}"))
    }

    async fn utxos_by_output_ref(&self, refs: &[TxoRef]) -> Result<UtxoBatch, Error> {
        paging::resolve_output_refs(refs, |hash| self.tx_outputs(hash)).await
    }

    async fn delegation(&self, stake_address: &str) -> Result<Delegation, Error> {
        let stake = StakeAddress::parse(stake_address)?;

        match self.api.account(stake.as_str()).await {
            Ok(account) => mapping::delegation(account).context(stake_address),
            Err(err) if err.status_code() == Some(404) => Ok(Delegation::undelegated()),
            Err(err) => Err(Error::from(err).context(stake_address)),
        }
    }

    async fn datum(&self, hash: &DatumHash) -> Result<Datum, Error> {
        let body = self
            .api
            .datum_cbor(&hash.to_string())
            .await
            .map_err(Error::from)
            .context(format!("datum {hash}"))?;

        let cbor = body
            .cbor
            .filter(|x| !x.is_empty())
            .ok_or_else(|| Error::NotFound(format!("datum {hash}")))?;

        Datum::decode_hex(&cbor).context(format!("datum {hash}"))
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
        if let Some(hash) = self.submit_custom(tx).await {
            return Ok(hash);
        }

        let body = match self.api.submit(None, tx).await {
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
            additional_utxo_set: additional_utxos
                .iter()
                .map(mapping::eval_utxo)
                .try_collect()?,
        };

        let response = match self.api.evaluate(&request).await {
            Ok(x) => x,
            Err(err) if err.status_code() == Some(400) => {
                return Err(Error::EvaluationFailed(err.message()))
            }
            Err(err) => return Err(err.into()),
        };

        mapping::eval_report(response)
    }

    async fn script_by_hash(&self, hash: &ScriptHash) -> Result<Script, Error> {
        let key = hash.to_string();

        let info = self
            .api
            .script(&key)
            .await
            .map_err(Error::from)
            .context(format!("script {hash}"))?;

        let script = match connector_core::ScriptLanguage::parse(&info.kind) {
            Some(connector_core::ScriptLanguage::Native) => {
                let body = self.api.script_json(&key).await?;
                Script::new(
                    connector_core::ScriptLanguage::Native,
                    mapping::native_script_cbor(&body)?,
                )
            }
            _ => {
                let body = self.api.script_cbor(&key).await?;
                mapping::script(&info, body.cbor.as_deref())?
            }
        };

        Ok(script)
    }
}
