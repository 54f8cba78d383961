//! Conversions between Blockfrost wire shapes and the canonical model.

use std::collections::BTreeMap;

use pallas::codec::minicbor::{self, Encoder};
use serde_json::Value as Json;

use connector_core::{
    builder::OutputBuilder,
    numeric::{opt_rational, opt_u64, parse_u64},
    parse_hash,
    redeemer::{self, parse_keyed_purpose},
    Address, Delegation, DatumOption, Error, EvalReport, ExUnits, GenesisParameters,
    ProtocolParameters, ReferenceScriptFee, Script, ScriptLanguage, Tip, Unit, Utxo,
    Value,
};

use crate::types::*;

pub fn amounts_to_value(amounts: &[Amount]) -> Result<Value, Error> {
    let mut value = Value::default();

    for amount in amounts {
        let unit = connector_core::parse_unit(&amount.unit)?;
        let quantity = parse_u64(&amount.quantity)?;
        value.add(&unit, quantity);
    }

    Ok(value)
}

/// The output fields shared by address and transaction UTxO listings.
pub trait OutputFields {
    fn address(&self) -> &str;
    fn amount(&self) -> &[Amount];
    fn data_hash(&self) -> Option<&str>;
    fn inline_datum(&self) -> Option<&str>;
    fn reference_script_hash(&self) -> Option<&str>;
}

macro_rules! impl_output_fields {
    ($ty:ty) => {
        impl OutputFields for $ty {
            fn address(&self) -> &str {
                &self.address
            }

            fn amount(&self) -> &[Amount] {
                &self.amount
            }

            fn data_hash(&self) -> Option<&str> {
                non_empty(&self.data_hash)
            }

            fn inline_datum(&self) -> Option<&str> {
                non_empty(&self.inline_datum)
            }

            fn reference_script_hash(&self) -> Option<&str> {
                non_empty(&self.reference_script_hash)
            }
        }
    };
}

impl_output_fields!(AddressUtxo);
impl_output_fields!(TxOutput);

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|x| !x.is_empty())
}

/// Everything but the reference script, which needs a separate lookup.
pub fn output_builder(fields: &impl OutputFields) -> Result<OutputBuilder, Error> {
    let address = Address::parse(fields.address())?;
    let value = amounts_to_value(fields.amount())?;

    OutputBuilder::new(address, value)
        .datum_hash_hex(fields.data_hash())?
        .inline_datum_hex(fields.inline_datum())
}

pub fn tip(block: Block) -> Result<Tip, Error> {
    let slot = block
        .slot
        .ok_or_else(|| Error::DecodeFailed(format!("block {} without slot", block.hash)))?;

    let height = block
        .height
        .ok_or_else(|| Error::DecodeFailed(format!("block {} without height", block.hash)))?;

    Ok(Tip {
        slot,
        height,
        hash: parse_hash(&block.hash)?,
    })
}

pub fn delegation(account: Account) -> Result<Delegation, Error> {
    let rewards = account
        .withdrawable_amount
        .as_deref()
        .filter(|x| !x.is_empty())
        .map(parse_u64)
        .transpose()?
        .unwrap_or_default();

    let pool_id = account.pool_id.unwrap_or_default();

    Ok(Delegation {
        active: account.active && !pool_id.is_empty(),
        rewards,
        pool_id,
        epoch: account.active_epoch,
    })
}

fn cost_models(params: &EpochParams) -> BTreeMap<ScriptLanguage, Vec<i64>> {
    if let Some(raw) = &params.cost_models_raw {
        return raw
            .iter()
            .filter_map(|(lang, values)| Some((ScriptLanguage::parse(lang)?, values.clone())))
            .collect();
    }

    let Some(named) = &params.cost_models else {
        return Default::default();
    };

    named
        .iter()
        .filter_map(|(lang, values)| {
            let lang = ScriptLanguage::parse(lang)?;

            // some deployments key the parameters by position
            let numeric = values.keys().all(|k| k.parse::<u32>().is_ok());

            let values = if numeric {
                let mut pairs: Vec<_> = values
                    .iter()
                    .filter_map(|(k, v)| Some((k.parse::<u32>().ok()?, *v)))
                    .collect();
                pairs.sort_by_key(|(k, _)| *k);
                pairs.into_iter().map(|(_, v)| v).collect()
            } else {
                values.values().copied().collect()
            };

            Some((lang, values))
        })
        .collect()
}

fn reference_script_fee(params: &EpochParams) -> Result<Option<ReferenceScriptFee>, Error> {
    let base = params
        .min_fee_reference_scripts_base
        .as_ref()
        .or(params.min_fee_ref_script_cost_per_byte.as_ref());

    let Some(base) = base else {
        return Ok(None);
    };

    Ok(Some(ReferenceScriptFee {
        range: opt_u64(&params.min_fee_reference_scripts_range)?,
        base: base.as_rational()?,
        multiplier: opt_rational(&params.min_fee_reference_scripts_multiplier)?,
    }))
}

pub fn protocol_parameters(params: EpochParams) -> Result<ProtocolParameters, Error> {
    let extra_entropy = match &params.extra_entropy {
        None | Some(Json::Null) => None,
        Some(Json::String(x)) => Some(x.clone()),
        Some(x) => Some(x.to_string()),
    };

    Ok(ProtocolParameters {
        min_fee_coefficient: opt_u64(&params.min_fee_a)?,
        min_fee_constant: opt_u64(&params.min_fee_b)?,
        max_block_body_size: opt_u64(&params.max_block_size)?,
        max_tx_size: opt_u64(&params.max_tx_size)?,
        max_block_header_size: opt_u64(&params.max_block_header_size)?,
        key_deposit: opt_u64(&params.key_deposit)?,
        pool_deposit: opt_u64(&params.pool_deposit)?,
        pool_influence: opt_rational(&params.a0)?,
        monetary_expansion: opt_rational(&params.rho)?,
        treasury_expansion: opt_rational(&params.tau)?,
        decentralisation: opt_rational(&params.decentralisation_param)?,
        extra_entropy,
        protocol_major: opt_u64(&params.protocol_major_ver)?,
        protocol_minor: opt_u64(&params.protocol_minor_ver)?,
        min_utxo: opt_u64(&params.min_utxo)?,
        min_pool_cost: opt_u64(&params.min_pool_cost)?,
        price_mem: opt_rational(&params.price_mem)?,
        price_step: opt_rational(&params.price_step)?,
        max_tx_ex_units: ExUnits {
            mem: opt_u64(&params.max_tx_ex_mem)?,
            steps: opt_u64(&params.max_tx_ex_steps)?,
        },
        max_block_ex_units: ExUnits {
            mem: opt_u64(&params.max_block_ex_mem)?,
            steps: opt_u64(&params.max_block_ex_steps)?,
        },
        max_value_size: opt_u64(&params.max_val_size)?,
        collateral_percent: opt_u64(&params.collateral_percent)?,
        max_collateral_inputs: opt_u64(&params.max_collateral_inputs)?,
        coins_per_utxo_byte: opt_u64(&params.coins_per_utxo_size)?,
        coins_per_utxo_word: opt_u64(&params.coins_per_utxo_word)?,
        cost_models: cost_models(&params),
        max_reference_scripts_size: opt_u64(&params.maximum_reference_scripts_size)?,
        min_fee_reference_scripts: reference_script_fee(&params)?,
    })
}

pub fn genesis_parameters(genesis: Genesis) -> Result<GenesisParameters, Error> {
    Ok(GenesisParameters {
        active_slots_coefficient: genesis.active_slots_coefficient.as_rational()?,
        update_quorum: genesis.update_quorum.as_u64()?,
        max_lovelace_supply: genesis.max_lovelace_supply.as_u64()?,
        network_magic: genesis.network_magic.as_u64()?,
        epoch_length: genesis.epoch_length.as_u64()?,
        system_start: genesis.system_start.as_u64()?,
        slots_per_kes_period: genesis.slots_per_kes_period.as_u64()?,
        slot_length: genesis.slot_length.as_u64()?,
        max_kes_evolutions: genesis.max_kes_evolutions.as_u64()?,
        security_param: genesis.security_param.as_u64()?,
    })
}

// ====
// Scripts
// ====

fn encode_native<W: minicbor::encode::Write>(
    json: &Json,
    e: &mut Encoder<W>,
) -> Result<(), Error>
where
    W::Error: std::fmt::Display,
{
    let kind = json
        .get("type")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::DecodeFailed(format!("native script without type: {json}")))?;

    let scripts = || {
        json.get("scripts")
            .and_then(Json::as_array)
            .ok_or_else(|| Error::DecodeFailed(format!("`{kind}` script without children")))
    };

    let slot = || {
        json.get("slot")
            .and_then(Json::as_u64)
            .ok_or_else(|| Error::DecodeFailed(format!("`{kind}` script without slot")))
    };

    match kind {
        "sig" => {
            let key_hash = json
                .get("keyHash")
                .and_then(Json::as_str)
                .ok_or_else(|| Error::DecodeFailed("`sig` script without keyHash".into()))?;

            e.array(2)?.u8(0)?.bytes(&hex::decode(key_hash)?)?;
        }
        "all" | "any" => {
            let children = scripts()?;
            e.array(2)?.u8(if kind == "all" { 1 } else { 2 })?;
            e.array(children.len() as u64)?;

            for child in children {
                encode_native(child, e)?;
            }
        }
        "atLeast" => {
            let children = scripts()?;
            let required = json
                .get("required")
                .and_then(Json::as_u64)
                .ok_or_else(|| Error::DecodeFailed("`atLeast` script without required".into()))?;

            e.array(3)?.u8(3)?.u64(required)?;
            e.array(children.len() as u64)?;

            for child in children {
                encode_native(child, e)?;
            }
        }
        "after" => {
            e.array(2)?.u8(4)?.u64(slot()?)?;
        }
        "before" => {
            e.array(2)?.u8(5)?.u64(slot()?)?;
        }
        other => {
            return Err(Error::DecodeFailed(format!(
                "unknown native script type `{other}`"
            )))
        }
    }

    Ok(())
}

/// CBOR of a timelock script from the JSON served by `/scripts/{hash}/json`.
pub fn native_script_cbor(body: &Json) -> Result<Vec<u8>, Error> {
    let json = body.get("json").unwrap_or(body);

    let mut e = Encoder::new(Vec::new());
    encode_native(json, &mut e)?;

    Ok(e.into_writer())
}

pub fn script(info: &ScriptInfo, cbor: Option<&str>) -> Result<Script, Error> {
    let language = ScriptLanguage::parse(&info.kind).ok_or_else(|| {
        Error::DecodeFailed(format!("unknown script type `{}`", info.kind))
    })?;

    let cbor = cbor
        .filter(|x| !x.is_empty())
        .ok_or_else(|| Error::DecodeFailed(format!("script {} has no cbor", info.script_hash)))?;

    Ok(Script::new(language, hex::decode(cbor)?))
}

// ====
// Evaluation
// ====

pub fn eval_utxo(utxo: &Utxo) -> Result<(EvalTxIn, EvalTxOut), Error> {
    let output = &utxo.output;
    let value = output.value();

    let assets = value
        .iter_assets()
        .map(|(policy, name, quantity)| {
            let key = match name.0.is_empty() {
                true => policy.to_string(),
                false => format!("{policy}.{name}"),
            };

            (key, quantity)
        })
        .collect();

    let (datum_hash, datum) = match output.datum() {
        Some(DatumOption::Hash(x)) => (Some(x.to_string()), None),
        Some(DatumOption::Inline(x)) => (None, Some(hex::encode(x.cbor()))),
        Some(DatumOption::None) | None => (None, None),
    };

    let script = match output.script_ref() {
        Some(x) if x.language == ScriptLanguage::Native => {
            tracing::warn!(input = %utxo.input, "native reference script left out of evaluation");
            None
        }
        Some(x) => Some(BTreeMap::from([(
            x.language.as_str().to_string(),
            hex::encode(&x.bytes),
        )])),
        None => None,
    };

    Ok((
        EvalTxIn {
            tx_id: utxo.input.hash().to_string(),
            index: utxo.input.index(),
        },
        EvalTxOut {
            address: output.address().to_string(),
            value: EvalValue {
                coins: value.coin,
                assets,
            },
            datum_hash,
            datum,
            script,
        },
    ))
}

fn ex_units(budget: EvalBudget) -> ExUnits {
    ExUnits {
        mem: budget.memory,
        steps: budget.steps,
    }
}

fn budget(value: &Json) -> Result<ExUnits, Error> {
    Ok(ex_units(serde_json::from_value(value.clone())?))
}

/// Reads either evaluation result shape into a report.
pub fn eval_report(response: EvalResponse) -> Result<EvalReport, Error> {
    if let Some(fault) = response.fault.or(response.error) {
        return Err(Error::EvaluationFailed(fault.to_string()));
    }

    let result = response
        .result
        .ok_or_else(|| Error::DecodeFailed("evaluation response without result".into()))?;

    if let Some(failure) = result.get("EvaluationFailure") {
        return Err(Error::EvaluationFailed(failure.to_string()));
    }

    if let Some(Json::Object(entries)) = result.get("EvaluationResult") {
        let mut report = EvalReport::default();

        for (key, units) in entries {
            match parse_keyed_purpose(key) {
                Some((tag, index)) => report.insert(connector_core::EvalRedeemer {
                    tag,
                    index,
                    ex_units: budget(units)?,
                }),
                None => tracing::debug!(key, "dropping redeemer with unknown purpose"),
            }
        }

        return Ok(report);
    }

    if result.is_array() {
        let items: Vec<EvalEntry> = serde_json::from_value(result)?;

        let mut entries = Vec::with_capacity(items.len());

        for item in items {
            let index = u32::try_from(item.validator.index).map_err(|_| {
                Error::DecodeFailed(format!("validator index {} out of range", item.validator.index))
            })?;

            entries.push((item.validator.purpose, index, ex_units(item.budget)));
        }

        return Ok(redeemer::normalize(entries));
    }

    Err(Error::DecodeFailed(format!(
        "unrecognized evaluation result: {result}"
    )))
}

/// Prefers the asset's own query filter for non-lovelace units.
pub fn unit_filter(unit: &Unit) -> Option<String> {
    match unit {
        Unit::Lovelace => None,
        x => Some(x.to_string()),
    }
}
