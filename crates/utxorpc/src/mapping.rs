use std::collections::BTreeMap;

use itertools::Itertools;
use pallas::{crypto::hash::Hash, interop::utxorpc::spec as u5c};

use connector_core::{
    provider::require_tx_hash, redeemer, Error, EvalReport, ExUnits, Output, ProtocolParameters,
    Rational, ReferenceScriptFee, ResultExt, ScriptLanguage, Tip, TxHash, TxoRef, Utxo,
};

pub fn txo_ref(txo: &u5c::query::TxoRef) -> Result<TxoRef, Error> {
    let hash: [u8; 32] = txo.hash.as_ref().try_into().map_err(|_| {
        Error::DecodeFailed(format!("txo ref hash has {} bytes", txo.hash.len()))
    })?;

    Ok(TxoRef(Hash::new(hash), txo.index))
}

pub fn to_u5c_ref(txo: &TxoRef) -> u5c::query::TxoRef {
    u5c::query::TxoRef {
        hash: txo.hash().to_vec().into(),
        index: txo.index(),
    }
}

/// Builds a canonical UTxO from the node's own output encoding.
pub fn utxo(item: &u5c::query::AnyUtxoData) -> Result<Utxo, Error> {
    let input = item
        .txo_ref
        .as_ref()
        .ok_or_else(|| Error::DecodeFailed("utxo without txo ref".into()))
        .and_then(txo_ref)?;

    if item.native_bytes.is_empty() {
        return Err(Error::DecodeFailed(format!("utxo {input} without native bytes")));
    }

    let output = Output::decode(&item.native_bytes).context(format!("utxo {input}"))?;

    Ok(Utxo::new(input, output))
}

fn rational(value: Option<&u5c::cardano::RationalNumber>) -> Result<Rational, Error> {
    let Some(value) = value else {
        return Ok(Rational::default());
    };

    let numerator = u64::try_from(value.numerator)
        .map_err(|_| Error::DecodeFailed(format!("negative rational {}", value.numerator)))?;

    let denominator = u64::try_from(value.denominator)
        .map_err(|_| Error::DecodeFailed(format!("bad denominator {}", value.denominator)))?;

    // unset ratios travel as 0/0
    if numerator == 0 && denominator == 0 {
        return Ok(Rational::default());
    }

    Rational::new(numerator, denominator)
}

fn ex_units(value: Option<&u5c::cardano::ExUnits>) -> ExUnits {
    value
        .map(|x| ExUnits {
            mem: x.memory,
            steps: x.steps,
        })
        .unwrap_or_default()
}

fn cost_models(value: Option<&u5c::cardano::CostModels>) -> BTreeMap<ScriptLanguage, Vec<i64>> {
    let Some(models) = value else {
        return BTreeMap::new();
    };

    [
        (ScriptLanguage::PlutusV1, &models.plutus_v1),
        (ScriptLanguage::PlutusV2, &models.plutus_v2),
        (ScriptLanguage::PlutusV3, &models.plutus_v3),
    ]
    .into_iter()
    .filter_map(|(language, model)| {
        let values = model.as_ref()?.values.clone();
        (!values.is_empty()).then_some((language, values))
    })
    .collect()
}

pub fn protocol_parameters(response: u5c::query::ReadParamsResponse) -> Result<ProtocolParameters, Error> {
    let params = match response.values.and_then(|x| x.params) {
        Some(u5c::query::any_chain_params::Params::Cardano(x)) => x,
        _ => return Err(Error::DecodeFailed("no cardano parameters in response".into())),
    };

    let version = params.protocol_version.clone().unwrap_or_default();
    let prices = params.prices.clone().unwrap_or_default();

    let min_fee_reference_scripts = match &params.min_fee_script_ref_cost_per_byte {
        Some(x) => Some(ReferenceScriptFee {
            base: rational(Some(x))?,
            ..Default::default()
        }),
        None => None,
    };

    Ok(ProtocolParameters {
        min_fee_coefficient: u64::from(params.min_fee_coefficient),
        min_fee_constant: u64::from(params.min_fee_constant),
        max_block_body_size: u64::from(params.max_block_body_size),
        max_tx_size: u64::from(params.max_tx_size),
        max_block_header_size: u64::from(params.max_block_header_size),
        key_deposit: u64::from(params.stake_key_deposit),
        pool_deposit: u64::from(params.pool_deposit),
        pool_influence: rational(params.pool_influence.as_ref())?,
        monetary_expansion: rational(params.monetary_expansion.as_ref())?,
        treasury_expansion: rational(params.treasury_expansion.as_ref())?,
        decentralisation: Rational::default(),
        extra_entropy: None,
        protocol_major: u64::from(version.major),
        protocol_minor: u64::from(version.minor),
        min_utxo: 0,
        min_pool_cost: u64::from(params.min_pool_cost),
        price_mem: rational(prices.memory.as_ref())?,
        price_step: rational(prices.steps.as_ref())?,
        max_tx_ex_units: ex_units(params.max_execution_units_per_transaction.as_ref()),
        max_block_ex_units: ex_units(params.max_execution_units_per_block.as_ref()),
        max_value_size: u64::from(params.max_value_size),
        collateral_percent: u64::from(params.collateral_percentage),
        max_collateral_inputs: u64::from(params.max_collateral_inputs),
        coins_per_utxo_byte: u64::from(params.coins_per_utxo_byte),
        coins_per_utxo_word: 0,
        cost_models: cost_models(params.cost_models.as_ref()),
        max_reference_scripts_size: 0,
        min_fee_reference_scripts,
    })
}

/// Reads the tip off the header of the block `ReadTip` pointed at.
pub fn tip(response: u5c::sync::FetchBlockResponse) -> Result<Tip, Error> {
    let block = response
        .block
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound("tip block".into()))?;

    let header = match block.chain {
        Some(u5c::sync::any_chain_block::Chain::Cardano(x)) => x.header,
        _ => None,
    }
    .ok_or_else(|| Error::DecodeFailed("tip block without cardano header".into()))?;

    let hash: [u8; 32] = header
        .hash
        .as_ref()
        .try_into()
        .map_err(|_| Error::DecodeFailed(format!("block hash has {} bytes", header.hash.len())))?;

    Ok(Tip {
        slot: header.slot,
        height: header.height,
        hash: Hash::new(hash),
    })
}

pub fn is_confirmed(update: &u5c::submit::WaitForTxResponse) -> bool {
    update.stage == u5c::submit::Stage::Confirmed as i32
}

pub fn submitted_hash(response: u5c::submit::SubmitTxResponse) -> Result<TxHash, Error> {
    let raw = response
        .r#ref
        .first()
        .map(hex::encode)
        .unwrap_or_default();

    require_tx_hash(&raw)
}

fn purpose_name(purpose: i32) -> &'static str {
    u5c::cardano::RedeemerPurpose::try_from(purpose)
        .map(|x| x.as_str_name())
        .unwrap_or("unknown")
}

pub fn eval_report(response: u5c::submit::EvalTxResponse) -> Result<EvalReport, Error> {
    let eval = match response.report.into_iter().next().and_then(|x| x.chain) {
        Some(u5c::submit::any_chain_eval::Chain::Cardano(x)) => x,
        _ => return Err(Error::DecodeFailed("no cardano evaluation in response".into())),
    };

    if !eval.errors.is_empty() {
        let message = eval.errors.iter().map(|x| x.msg.as_str()).join("; ");
        return Err(Error::EvaluationFailed(message));
    }

    let entries = eval
        .redeemers
        .iter()
        .map(|x| (purpose_name(x.purpose), x.index, ex_units(x.ex_units.as_ref())));

    Ok(redeemer::normalize(entries))
}
