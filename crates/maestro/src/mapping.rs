use connector_core::{
    builder::OutputBuilder,
    parse_hash, parse_unit,
    redeemer, Address, Delegation, Epoch, Error, EvalReport, ExUnits, Output, ProtocolParameters,
    ResultExt, Script, ScriptLanguage, Tip, TxoRef, Utxo as CanonicalUtxo, Value,
};

use crate::types::*;

pub fn value(assets: &[Asset]) -> Result<Value, Error> {
    let mut value = Value::default();

    for asset in assets {
        let unit = parse_unit(&asset.unit)?;
        value.add(&unit, asset.amount.as_u64()?);
    }

    Ok(value)
}

pub fn reference_script(script: &ReferenceScript) -> Result<Script, Error> {
    let language = ScriptLanguage::parse(&script.kind).ok_or_else(|| {
        Error::DecodeFailed(format!("unknown script type `{}`", script.kind))
    })?;

    let bytes = script
        .bytes
        .as_deref()
        .filter(|x| !x.is_empty())
        .ok_or_else(|| Error::DecodeFailed(format!("script {} has no bytes", script.hash)))?;

    Ok(Script::new(language, hex::decode(bytes)?))
}

/// Builds an output from the individual fields, for responses that carry no
/// `txout_cbor`.
fn output_from_fields(utxo: &Utxo) -> Result<Output, Error> {
    let address = Address::parse(&utxo.address)?;
    let mut builder = OutputBuilder::new(address, value(&utxo.assets)?);

    if let Some(datum) = &utxo.datum {
        builder = match (datum.kind.as_str(), datum.bytes.as_deref()) {
            ("inline", Some(bytes)) => builder.inline_datum_hex(Some(bytes))?,
            _ => builder.datum_hash_hex(Some(&datum.hash))?,
        };
    }

    if let Some(script) = &utxo.reference_script {
        builder = builder.script_ref(Some(reference_script(script)?));
    }

    builder.build()
}

pub fn utxo(utxo: &Utxo) -> Result<CanonicalUtxo, Error> {
    let input = TxoRef(parse_hash(&utxo.tx_hash)?, utxo.index);

    let output = match utxo.txout_cbor.as_deref().filter(|x| !x.is_empty()) {
        Some(cbor) => Output::decode(&hex::decode(cbor)?),
        None => output_from_fields(utxo),
    }
    .context(format!("utxo {input}"))?;

    Ok(CanonicalUtxo::new(input, output))
}

pub fn tip(tip: ChainTip) -> Result<Tip, Error> {
    Ok(Tip {
        slot: tip.slot,
        height: tip.height,
        hash: parse_hash(&tip.block_hash)?,
    })
}

pub fn delegation(account: AccountInfo, epoch: Option<Epoch>) -> Result<Delegation, Error> {
    let pool_id = account.delegated_pool.unwrap_or_default();

    Ok(Delegation {
        active: account.registered && !pool_id.is_empty(),
        rewards: account.rewards_available.as_u64()?,
        pool_id,
        epoch,
    })
}

pub fn protocol_parameters(params: ProtocolParams) -> Result<ProtocolParameters, Error> {
    let cost_models = params
        .plutus_cost_models
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(lang, values)| Some((ScriptLanguage::parse(&lang)?, values)))
        .collect();

    let min_fee_reference_scripts = params
        .min_fee_reference_scripts
        .map(|x| -> Result<_, Error> {
            Ok(connector_core::ReferenceScriptFee {
                range: x.range.as_u64()?,
                base: x.base.as_rational()?,
                multiplier: x.multiplier.as_rational()?,
            })
        })
        .transpose()?;

    Ok(ProtocolParameters {
        min_fee_coefficient: params.min_fee_coefficient.as_u64()?,
        min_fee_constant: params.min_fee_constant.amount()?,
        max_block_body_size: params.max_block_body_size.size()?,
        max_tx_size: params.max_transaction_size.size()?,
        max_block_header_size: params.max_block_header_size.size()?,
        key_deposit: params.stake_credential_deposit.amount()?,
        pool_deposit: params.stake_pool_deposit.amount()?,
        pool_influence: params.stake_pool_pledge_influence.as_rational()?,
        monetary_expansion: params.monetary_expansion.as_rational()?,
        treasury_expansion: params.treasury_expansion.as_rational()?,
        decentralisation: Default::default(),
        extra_entropy: None,
        protocol_major: params.protocol_version.major,
        protocol_minor: params.protocol_version.minor,
        min_utxo: 0,
        min_pool_cost: params.min_stake_pool_cost.amount()?,
        price_mem: params.script_execution_prices.memory.as_rational()?,
        price_step: params.script_execution_prices.steps.as_rational()?,
        max_tx_ex_units: ExUnits {
            mem: params.max_execution_units_per_transaction.memory.as_u64()?,
            steps: params.max_execution_units_per_transaction.steps.as_u64()?,
        },
        max_block_ex_units: ExUnits {
            mem: params.max_execution_units_per_block.memory.as_u64()?,
            steps: params.max_execution_units_per_block.steps.as_u64()?,
        },
        max_value_size: params.max_value_size.size()?,
        collateral_percent: params.collateral_percentage.as_u64()?,
        max_collateral_inputs: params.max_collateral_inputs.as_u64()?,
        coins_per_utxo_byte: params.min_utxo_deposit_coefficient.as_u64()?,
        coins_per_utxo_word: 0,
        cost_models,
        max_reference_scripts_size: params
            .max_reference_scripts_size
            .map(|x| x.size())
            .transpose()?
            .unwrap_or_default(),
        min_fee_reference_scripts,
    })
}

pub fn additional_utxo(utxo: &CanonicalUtxo) -> Result<AdditionalUtxo, Error> {
    Ok(AdditionalUtxo {
        tx_hash: utxo.input.hash().to_string(),
        index: utxo.input.index(),
        txout_cbor: hex::encode(utxo.output.encode()?),
    })
}

pub fn eval_report(results: Vec<EvalResult>) -> EvalReport {
    redeemer::normalize(results.into_iter().map(|x| {
        let units = ExUnits {
            mem: x.ex_units.mem,
            steps: x.ex_units.steps,
        };

        (x.redeemer_tag, x.redeemer_index, units)
    }))
}
