//! Kupo + Ogmios ("Kupmios") backend for the canonical [`Provider`]
//! interface.
//!
//! Kupo answers UTxO, datum and script lookups; Ogmios answers everything
//! that needs the ledger state, and takes submissions and evaluations.
//! Matches are adapted best-effort: a datum or script Kupo can't serve is
//! left out and reported as a [`Warning`] on the batch.

use std::time::Duration;

use futures_util::{stream, StreamExt};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use tracing::{debug, info, warn};

use connector_core::{
    config::{KupmiosConfig, Network},
    paging::{resolve_output_refs, MAX_CONCURRENT_FETCHES},
    poller::{poll_confirmation, ConfirmationState},
    provider::{filter_by_unit, require_tx_hash, single_holder},
    CancelToken, Datum, DatumHash, Delegation, Epoch, Error, EvalReport, GenesisParameters,
    ProtocolParameters, Provider, ResultExt, Script, ScriptHash, StakeAddress, Tip, TxHash,
    TxoRef, Unit, Utxo, UtxoBatch, Warning,
};

pub mod api;
pub mod client;
pub mod mapping;
pub mod patterns;
pub mod types;

pub use api::{ApiError, KupoApi, OgmiosApi};
pub use client::{KupoClient, OgmiosClient};
pub use patterns::{MatchFilter, Pattern};

use types::*;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

const STAKE_PREFIXES: [&str; 2] = ["stake1", "stake_test1"];

pub struct Kupmios<K = KupoClient, O = OgmiosClient> {
    kupo: K,
    ogmios: O,
    network: Network,
}

impl Kupmios<KupoClient, OgmiosClient> {
    pub fn connect(config: &KupmiosConfig) -> Result<Self, Error> {
        let kupo = KupoClient::new(&config.kupo_url)?;
        let ogmios = OgmiosClient::new(&config.ogmios_url)?;

        Ok(Self::new(kupo, ogmios, config.network))
    }
}

impl<K: KupoApi, O: OgmiosApi> Kupmios<K, O> {
    pub fn new(kupo: K, ogmios: O, network: Network) -> Self {
        Self {
            kupo,
            ogmios,
            network,
        }
    }

    pub fn kupo(&self) -> &K {
        &self.kupo
    }

    pub fn ogmios(&self) -> &O {
        &self.ogmios
    }

    async fn query<T: DeserializeOwned>(&self, method: &str, params: Option<Json>) -> Result<T, Error> {
        let result = self
            .ogmios
            .call(method, params)
            .await
            .map_err(Error::from)
            .context(method)?;

        serde_json::from_value(result).map_err(|e| Error::DecodeFailed(format!("{method}: {e}")))
    }

    async fn matches(&self, pattern: Pattern, filter: MatchFilter) -> Result<Vec<Match>, Error> {
        self.kupo
            .matches(&pattern, &filter)
            .await
            .map_err(Error::from)
            .context(&pattern)
    }

    /// Fetches the datum of a match that embeds one.
    async fn inline_datum(&self, item: &Match, warnings: &mut Vec<Warning>) -> Option<String> {
        if item.datum_type.as_deref() != Some("inline") {
            return None;
        }

        let hash = item.datum_hash.as_deref()?;
        let subject = format!("{}#{}", item.transaction_id, item.output_index);

        let problem = match self.kupo.datum(hash).await {
            Ok(Some(x)) => match Datum::decode_hex(&x.datum) {
                Ok(_) => return Some(x.datum),
                Err(err) => err.to_string(),
            },
            Ok(None) => format!("datum {hash} not indexed"),
            Err(err) => err.to_string(),
        };

        warn!(%subject, %problem, "keeping datum hash instead of inline datum");
        warnings.push(Warning::new(subject, format!("inline datum unavailable, kept hash: {problem}")));

        None
    }

    async fn reference_script(&self, item: &Match, warnings: &mut Vec<Warning>) -> Option<Script> {
        let hash = item.script_hash.as_deref()?;
        let subject = format!("{}#{}", item.transaction_id, item.output_index);

        let problem = match self.kupo.script(hash).await {
            Ok(Some(x)) => match mapping::script(&x) {
                Ok(script) => return Some(script),
                Err(err) => err.to_string(),
            },
            Ok(None) => format!("script {hash} not indexed"),
            Err(err) => err.to_string(),
        };

        warn!(%subject, %problem, "leaving out reference script");
        warnings.push(Warning::new(subject, format!("reference script omitted: {problem}")));

        None
    }

    /// Adapts one match, resolving its datum and script through Kupo.
    async fn adapt(&self, item: &Match) -> Result<(Utxo, Vec<Warning>), Error> {
        let mut warnings = vec![];

        let datum = self.inline_datum(item, &mut warnings).await;
        let script = self.reference_script(item, &mut warnings).await;

        let utxo = mapping::utxo(item, datum.as_deref(), script)?;

        Ok((utxo, warnings))
    }

    /// Adapts every match, turning the ones that can't be built into
    /// warnings.
    async fn adapt_all(&self, items: Vec<Match>) -> UtxoBatch {
        let adapted: Vec<_> = stream::iter(items.iter())
            .map(|item| async move { (item, self.adapt(item).await) })
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await;

        let mut batch = UtxoBatch::default();

        for (item, result) in adapted {
            match result {
                Ok((utxo, warnings)) => {
                    batch.utxos.push(utxo);
                    batch.warnings.extend(warnings);
                }
                Err(err) => {
                    let subject = format!("{}#{}", item.transaction_id, item.output_index);
                    warn!(%subject, %err, "skipping match");
                    batch.warn(Warning::new(subject, format!("skipped: {err}")));
                }
            }
        }

        batch
    }

    /// The outputs of `hash` that `refs` asks for, from a single query.
    async fn tx_outputs(&self, hash: TxHash, refs: &[TxoRef]) -> Result<UtxoBatch, Error> {
        let matches = self
            .matches(Pattern::transaction(hash), MatchFilter::default())
            .await?;

        if matches.is_empty() {
            return Err(Error::NotFound(format!("tx {hash}")));
        }

        let wanted = matches
            .into_iter()
            .filter(|x| refs.contains(&TxoRef(hash, x.output_index)))
            .unique_by(|x| x.output_index)
            .collect_vec();

        Ok(self.adapt_all(wanted).await)
    }

    async fn check_tx(&self, hash: &TxHash) -> Result<ConfirmationState, Error> {
        let matches = self
            .matches(Pattern::transaction(*hash), MatchFilter::default())
            .await?;

        match matches.first() {
            Some(x) if x.created_at.slot_no > 0 => Ok(ConfirmationState::Confirmed),
            _ => Ok(ConfirmationState::Waiting),
        }
    }
}

impl<K: KupoApi, O: OgmiosApi> Provider for Kupmios<K, O> {
    async fn protocol_parameters(&self) -> Result<ProtocolParameters, Error> {
        let params = self.query(api::PROTOCOL_PARAMETERS, None).await?;
        mapping::protocol_parameters(params).context("protocol parameters")
    }

    async fn genesis_parameters(&self) -> Result<GenesisParameters, Error> {
        let params = serde_json::to_value(GenesisParams { era: "shelley" })?;

        let genesis = self.query(api::GENESIS_CONFIGURATION, Some(params)).await?;

        mapping::genesis_parameters(genesis).context("genesis parameters")
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn current_epoch(&self) -> Result<Epoch, Error> {
        self.query(api::EPOCH, None).await
    }

    async fn tip(&self) -> Result<Tip, Error> {
        let tip: NetworkTip = self.query(api::NETWORK_TIP, None).await?;
        let height: u64 = self.query(api::BLOCK_HEIGHT, None).await?;

        Ok(Tip {
            slot: tip.slot,
            height,
            hash: connector_core::parse_hash(&tip.id)?,
        })
    }

    async fn utxos_by_address(&self, address: &str) -> Result<UtxoBatch, Error> {
        let matches = self
            .matches(Pattern::address(address), MatchFilter::unspent())
            .await?;

        debug!(address, count = matches.len(), "fetched kupo matches");

        Ok(self.adapt_all(matches).await)
    }

    async fn utxos_with_unit(&self, address: &str, unit: &Unit) -> Result<UtxoBatch, Error> {
        let filter = MatchFilter::unspent().with_unit(unit);

        let matches = self.matches(Pattern::address(address), filter).await?;

        let batch = self.adapt_all(matches).await;

        Ok(filter_by_unit(batch, unit))
    }

    async fn utxo_by_unit(&self, unit: &Unit) -> Result<Utxo, Error> {
        let pattern = Pattern::asset(unit)
            .ok_or_else(|| Error::InvalidUnit("lovelace has no single holder".into()))?;

        let matches = self.matches(pattern, MatchFilter::unspent()).await?;

        // a policy-only unit matches every asset under the policy
        let mut holding = vec![];

        for item in matches {
            let value = mapping::value(&item.value).map_err(|e| {
                Error::DecodeFailed(format!(
                    "{}#{}: {e}",
                    item.transaction_id, item.output_index
                ))
            })?;

            if value.quantity_of(unit) > 0 {
                holding.push(item);
            }
        }

        let item = single_holder(holding, &format!("utxos holding {unit}"))?;

        let (utxo, warnings) = self.adapt(&item).await.context(unit)?;

        for warning in warnings {
            debug!(%warning, "utxo by unit adapted with warning");
        }

        Ok(utxo)
    }

    async fn utxos_by_output_ref(&self, refs: &[TxoRef]) -> Result<UtxoBatch, Error> {
        resolve_output_refs(refs, |hash| self.tx_outputs(hash, refs)).await
    }

    async fn delegation(&self, stake_address: &str) -> Result<Delegation, Error> {
        if !STAKE_PREFIXES.iter().any(|x| stake_address.starts_with(x)) {
            return Err(Error::InvalidAddress(format!(
                "{stake_address}: expected a stake1 or stake_test1 address"
            )));
        }

        let stake = StakeAddress::parse(stake_address)?;
        let credential = hex::encode(stake.credential());

        let params = match stake.is_script() {
            true => RewardAccountParams {
                keys: vec![],
                scripts: vec![credential],
            },
            false => RewardAccountParams {
                keys: vec![credential],
                scripts: vec![],
            },
        };

        let summaries: RewardAccountSummaries = self
            .query(
                api::REWARD_ACCOUNT_SUMMARIES,
                Some(serde_json::to_value(params)?),
            )
            .await
            .context(stake_address)?;

        mapping::delegation(summaries.into_first()).context(stake_address)
    }

    async fn datum(&self, hash: &DatumHash) -> Result<Datum, Error> {
        let datum = self
            .kupo
            .datum(&hash.to_string())
            .await
            .map_err(Error::from)
            .context(format!("datum {hash}"))?
            .ok_or_else(|| Error::NotFound(format!("datum {hash}")))?;

        Datum::decode_hex(&datum.datum).context(format!("datum {hash}"))
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
        let params = serde_json::to_value(SubmitParams {
            transaction: TxCbor {
                cbor: hex::encode(tx),
            },
        })?;

        let result = match self.ogmios.call(api::SUBMIT_TRANSACTION, Some(params)).await {
            Ok(x) => x,
            Err(err @ ApiError::Rpc { .. }) => return Err(Error::submission(err.message())),
            Err(err) => return Err(err.into()),
        };

        let submitted: SubmittedTx = serde_json::from_value(result)
            .map_err(|e| Error::SubmissionFailed(format!("unexpected submit response: {e}")))?;

        let hash = require_tx_hash(&submitted.transaction.id)?;

        info!(%hash, "tx submitted");

        Ok(hash)
    }

    async fn evaluate_tx(&self, tx: &[u8], additional_utxos: &[Utxo]) -> Result<EvalReport, Error> {
        let params = serde_json::to_value(EvaluateParams {
            transaction: TxCbor {
                cbor: hex::encode(tx),
            },
            additional_utxo: additional_utxos.iter().map(mapping::ogmios_utxo).collect(),
        })?;

        let result = match self.ogmios.call(api::EVALUATE_TRANSACTION, Some(params)).await {
            Ok(x) => x,
            Err(err @ ApiError::Rpc { .. }) => {
                return Err(Error::EvaluationFailed(err.message()))
            }
            Err(err) => return Err(err.into()),
        };

        let items: Vec<EvalItem> = serde_json::from_value(result)
            .map_err(|e| Error::DecodeFailed(format!("evaluation result: {e}")))?;

        mapping::eval_report(items)
    }

    async fn script_by_hash(&self, hash: &ScriptHash) -> Result<Script, Error> {
        let script = self
            .kupo
            .script(&hash.to_string())
            .await
            .map_err(Error::from)
            .context(format!("script {hash}"))?
            .ok_or_else(|| Error::NotFound(format!("script {hash}")))?;

        mapping::script(&script).context(format!("script {hash}"))
    }
}

#[cfg(test)]
mod tests;
