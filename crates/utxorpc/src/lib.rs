//! UTxO RPC (u5c) backend for the canonical [`Provider`] interface.

use std::{collections::HashMap, time::Duration};

use futures_util::StreamExt as _;
use itertools::Itertools;
use pallas::interop::utxorpc::spec as u5c;
use tonic::Code;
use tracing::{debug, info};

use connector_core::{
    config::{Network, UtxorpcConfig},
    paging::{walk_cursor, Page, PAGE_SIZE},
    poller::{poll_confirmation, ConfirmationState},
    provider::{filter_by_unit, single_holder},
    Address, CancelToken, Datum, DatumHash, Delegation, Epoch, Error, EvalReport,
    GenesisParameters, ProtocolParameters, Provider, ResultExt, Script, ScriptHash, Tip, TxHash,
    TxoRef, Unit, Utxo, UtxoBatch,
};

pub mod api;
pub mod client;
pub mod mapping;
pub mod patterns;

pub use api::{ApiError, StageStream, UtxorpcApi};
pub use client::GrpcClient;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Enough matches to tell a single holder from an ambiguous unit.
const HOLDER_SAMPLE: usize = 2;

pub struct Utxorpc<A = GrpcClient> {
    api: A,
    network: Network,
}

impl Utxorpc<GrpcClient> {
    /// Needs a running tokio runtime, the channel is spawned lazily on it.
    pub fn connect(config: &UtxorpcConfig) -> Result<Self, Error> {
        let api = GrpcClient::from_config(config)?;
        Ok(Self::new(api, config.network))
    }
}

impl<A: UtxorpcApi> Utxorpc<A> {
    pub fn new(api: A, network: Network) -> Self {
        Self { api, network }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    async fn search(&self, pattern: u5c::cardano::TxOutputPattern) -> Result<Vec<Utxo>, Error> {
        let items = walk_cursor(|cursor| {
            let request = patterns::search_request(pattern.clone(), cursor, PAGE_SIZE);

            async move {
                self.api
                    .search_utxos(request)
                    .await
                    .map(|x| Page {
                        items: x.items,
                        next: Some(x.next_token),
                    })
                    .map_err(Error::from)
            }
        })
        .await?;

        let utxos: Vec<_> = items.iter().map(mapping::utxo).try_collect()?;

        Ok(utxos.into_iter().unique_by(|x| x.input).collect())
    }

    /// Collects up to [`HOLDER_SAMPLE`] outputs that really hold `unit`.
    async fn sample_holders(&self, unit: &Unit) -> Result<Vec<Utxo>, Error> {
        let mut found = UtxoBatch::default();
        let mut cursor = None;

        loop {
            let request = patterns::search_request(patterns::holding(unit), cursor, HOLDER_SAMPLE);
            let response = self.api.search_utxos(request).await?;

            let page: Vec<_> = response.items.iter().map(mapping::utxo).try_collect()?;
            found.extend(filter_by_unit(page.into(), unit));

            if found.len() >= HOLDER_SAMPLE || response.next_token.is_empty() {
                break;
            }

            cursor = Some(response.next_token);
        }

        Ok(found.utxos.into_iter().unique_by(|x| x.input).collect())
    }

    async fn check_tx(&self, hash: &TxHash) -> Result<ConfirmationState, Error> {
        let mut updates = self.api.wait_for_tx(hash.to_vec()).await?;

        match updates.next().await {
            Some(Ok(update)) if mapping::is_confirmed(&update) => Ok(ConfirmationState::Confirmed),
            Some(Ok(update)) => {
                debug!(%hash, stage = update.stage, "tx not confirmed yet");
                Ok(ConfirmationState::Waiting)
            }
            Some(Err(err)) => Err(err.into()),
            None => Ok(ConfirmationState::Waiting),
        }
    }
}

impl<A: UtxorpcApi> Provider for Utxorpc<A> {
    async fn protocol_parameters(&self) -> Result<ProtocolParameters, Error> {
        let response = self.api.read_params().await?;
        mapping::protocol_parameters(response).context("protocol parameters")
    }

    async fn genesis_parameters(&self) -> Result<GenesisParameters, Error> {
        Err(Error::NotImplemented("utxorpc genesis parameters"))
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn current_epoch(&self) -> Result<Epoch, Error> {
        Err(Error::NotImplemented("utxorpc current epoch"))
    }

    async fn tip(&self) -> Result<Tip, Error> {
        let tip = self
            .api
            .read_tip()
            .await?
            .tip
            .ok_or_else(|| Error::NotFound("chain tip".into()))?;

        let block = self.api.fetch_block(tip).await?;

        mapping::tip(block).context("chain tip")
    }

    async fn utxos_by_address(&self, address: &str) -> Result<UtxoBatch, Error> {
        let parsed = Address::parse(address)?;

        let utxos = self.search(patterns::at_address(&parsed)).await.context(address)?;

        debug!(address, count = utxos.len(), "fetched address utxos");

        Ok(utxos.into())
    }

    async fn utxos_with_unit(&self, address: &str, unit: &Unit) -> Result<UtxoBatch, Error> {
        let parsed = Address::parse(address)?;

        let utxos = self
            .search(patterns::at_address_holding(&parsed, unit))
            .await
            .context(format!("{address} holding {unit}"))?;

        Ok(filter_by_unit(utxos.into(), unit))
    }

    async fn utxo_by_unit(&self, unit: &Unit) -> Result<Utxo, Error> {
        if unit.is_lovelace() {
            return Err(Error::InvalidUnit("lovelace has no single holder".into()));
        }

        let candidates = self
            .sample_holders(unit)
            .await
            .context(format!("holders of {unit}"))?;

        single_holder(candidates, &format!("utxos holding {unit}"))
    }

    async fn utxos_by_output_ref(&self, refs: &[TxoRef]) -> Result<UtxoBatch, Error> {
        let keys = refs.iter().copied().unique().collect_vec();

        if keys.is_empty() {
            return Ok(UtxoBatch::default());
        }

        let request = keys.iter().map(mapping::to_u5c_ref).collect();

        let response = match self.api.read_utxos(request).await {
            Ok(x) => x,
            Err(err) if err.code() == Some(Code::NotFound) => return Ok(UtxoBatch::default()),
            Err(err) => return Err(err.into()),
        };

        let mut found: HashMap<TxoRef, Utxo> = response
            .items
            .iter()
            .map(mapping::utxo)
            .map_ok(|x| (x.input, x))
            .try_collect()?;

        // request order, and only what was asked for
        let utxos = keys.iter().filter_map(|x| found.remove(x)).collect_vec();

        Ok(utxos.into())
    }

    async fn delegation(&self, _stake_address: &str) -> Result<Delegation, Error> {
        Err(Error::NotImplemented("utxorpc delegation"))
    }

    async fn datum(&self, _hash: &DatumHash) -> Result<Datum, Error> {
        Err(Error::NotImplemented("utxorpc datum by hash"))
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
        let response = match self.api.submit_tx(tx.to_vec()).await {
            Ok(x) => x,
            Err(err)
                if matches!(
                    err.code(),
                    Some(Code::InvalidArgument | Code::FailedPrecondition)
                ) =>
            {
                return Err(Error::submission(err.message()))
            }
            Err(err) => return Err(err.into()),
        };

        let hash = mapping::submitted_hash(response)?;

        info!(%hash, "tx submitted");

        Ok(hash)
    }

    async fn evaluate_tx(&self, tx: &[u8], additional_utxos: &[Utxo]) -> Result<EvalReport, Error> {
        if !additional_utxos.is_empty() {
            return Err(Error::InvalidInput(
                "utxorpc evaluation doesn't take additional utxos".into(),
            ));
        }

        let response = match self.api.eval_tx(tx.to_vec()).await {
            Ok(x) => x,
            Err(err)
                if matches!(
                    err.code(),
                    Some(Code::InvalidArgument | Code::FailedPrecondition)
                ) =>
            {
                return Err(Error::EvaluationFailed(err.message()))
            }
            Err(err) => return Err(err.into()),
        };

        mapping::eval_report(response)
    }

    async fn script_by_hash(&self, _hash: &ScriptHash) -> Result<Script, Error> {
        Err(Error::NotImplemented("utxorpc script by hash"))
    }
}

#[cfg(test)]
mod tests;
