use std::time::Duration;

use crate::{
    config::Network, CancelToken, Datum, DatumHash, Delegation, Epoch, Error, EvalReport,
    GenesisParameters, ProtocolParameters, Script, ScriptHash, Tip, TxHash, TxoRef, Unit, Utxo,
    UtxoBatch,
};

/// The canonical operations every backend adapter offers.
///
/// List operations return a [`UtxoBatch`], which carries the warnings
/// collected while adapting individual items.
#[trait_variant::make(Send)]
pub trait Provider: Send + Sync {
    async fn protocol_parameters(&self) -> Result<ProtocolParameters, Error>;

    async fn genesis_parameters(&self) -> Result<GenesisParameters, Error>;

    fn network(&self) -> Network;

    async fn current_epoch(&self) -> Result<Epoch, Error>;

    async fn tip(&self) -> Result<Tip, Error>;

    async fn utxos_by_address(&self, address: &str) -> Result<UtxoBatch, Error>;

    async fn utxos_with_unit(&self, address: &str, unit: &Unit) -> Result<UtxoBatch, Error>;

    /// The single UTxO holding `unit`. Zero holders is `NotFound`, more than
    /// one is `AmbiguousResult`.
    async fn utxo_by_unit(&self, unit: &Unit) -> Result<Utxo, Error>;

    async fn utxos_by_output_ref(&self, refs: &[TxoRef]) -> Result<UtxoBatch, Error>;

    async fn delegation(&self, stake_address: &str) -> Result<Delegation, Error>;

    async fn datum(&self, hash: &DatumHash) -> Result<Datum, Error>;

    /// Resolves to `true` once the tx is on chain. A zero `interval` uses the
    /// backend's default.
    async fn await_confirmation<C: CancelToken>(
        &self,
        tx: &TxHash,
        interval: Duration,
        cancel: C,
    ) -> Result<bool, Error>;

    async fn submit_tx(&self, tx: &[u8]) -> Result<TxHash, Error>;

    async fn evaluate_tx(&self, tx: &[u8], additional_utxos: &[Utxo]) -> Result<EvalReport, Error>;

    async fn script_by_hash(&self, hash: &ScriptHash) -> Result<Script, Error>;
}

/// Applies the ambiguity rules of `utxo_by_unit` to a candidate list.
pub fn single_holder<T>(mut candidates: Vec<T>, subject: &str) -> Result<T, Error> {
    match candidates.len() {
        0 => Err(Error::NotFound(subject.to_string())),
        1 => Ok(candidates.remove(0)),
        n => Err(Error::AmbiguousResult(format!("{subject}: {n} candidates"))),
    }
}

/// Keeps the UTxOs whose value holds a positive quantity of `unit`.
pub fn filter_by_unit(batch: UtxoBatch, unit: &Unit) -> UtxoBatch {
    UtxoBatch {
        utxos: batch
            .utxos
            .into_iter()
            .filter(|x| x.output.value().quantity_of(unit) > 0)
            .collect(),
        warnings: batch.warnings,
    }
}

/// Fails when a backend acknowledged a submission without an id.
pub fn require_tx_hash(raw: &str) -> Result<TxHash, Error> {
    let raw = raw.trim().trim_matches('"');

    if raw.is_empty() {
        return Err(Error::SubmissionFailed(
            "provider returned an empty tx hash".into(),
        ));
    }

    crate::parse_hash::<32>(raw).map_err(|e| Error::SubmissionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holder_rules() {
        assert!(single_holder(Vec::<u8>::new(), "unit").unwrap_err().is_not_found());
        assert_eq!(single_holder(vec![1], "unit").unwrap(), 1);
        assert!(single_holder(vec![1, 2], "unit").unwrap_err().is_ambiguous());
    }

    #[test]
    fn empty_submission_hash_fails() {
        assert!(matches!(require_tx_hash("\"\""), Err(Error::SubmissionFailed(_))));
        assert!(matches!(require_tx_hash("  "), Err(Error::SubmissionFailed(_))));

        let hash = "\"5c9cd7a5ab3bfb6f9c4e1ab7cd1b8a1f3a0e22c1ed3e0e7f8d1c9a32b88a3e11\"";
        assert!(require_tx_hash(hash).is_ok());
    }
}
