use std::collections::BTreeMap;

use chrono::DateTime;

use connector_core::{
    builder::OutputBuilder,
    parse_hash, parse_unit,
    redeemer::{self, parse_keyed_purpose},
    Address, DatumOption, Delegation, Error, EvalReport, ExUnits, GenesisParameters,
    Output, ProtocolParameters, ReferenceScriptFee, ResultExt, Script, ScriptLanguage, TxoRef,
    Unit, Utxo, Value,
};

use crate::types::*;

pub fn value(value: &KupoValue) -> Result<Value, Error> {
    let mut out = Value::default();

    match value {
        KupoValue::Coins { coins, assets } => {
            out.coin = coins.as_u64()?;

            for (key, quantity) in assets {
                out.add(&parse_unit(key)?, quantity.as_u64()?);
            }
        }
        KupoValue::Nested(policies) => {
            for (policy, assets) in policies {
                if policy == "ada" {
                    if let Some(coins) = assets.get("lovelace") {
                        out.coin = coins.as_u64()?;
                    }

                    continue;
                }

                let policy = parse_hash::<28>(policy)
                    .map_err(|e| Error::InvalidUnit(e.to_string()))?;

                for (name, quantity) in assets {
                    let unit = Unit::asset(policy, hex::decode(name)?);
                    out.add(&unit, quantity.as_u64()?);
                }
            }
        }
    }

    Ok(out)
}

pub fn script(script: &KupoScript) -> Result<Script, Error> {
    let language = ScriptLanguage::parse(&script.language).ok_or_else(|| {
        Error::DecodeFailed(format!("unknown script language `{}`", script.language))
    })?;

    Ok(Script::new(language, hex::decode(&script.script)?))
}

/// Builds the canonical UTxO of a match. `inline_datum` is the resolved
/// datum CBOR, when the match carries one and it could be fetched.
pub fn utxo(
    item: &Match,
    inline_datum: Option<&str>,
    script_ref: Option<Script>,
) -> Result<Utxo, Error> {
    let input = TxoRef(parse_hash(&item.transaction_id)?, item.output_index);

    let output = output(item, inline_datum, script_ref).context(format!("match {input}"))?;

    Ok(Utxo::new(input, output))
}

fn output(
    item: &Match,
    inline_datum: Option<&str>,
    script_ref: Option<Script>,
) -> Result<Output, Error> {
    let address = Address::parse(&item.address)?;
    let builder = OutputBuilder::new(address, value(&item.value)?);

    let builder = match inline_datum {
        Some(cbor) => builder.inline_datum_hex(Some(cbor))?,
        None => builder.datum_hash_hex(item.datum_hash.as_deref())?,
    };

    builder.script_ref(script_ref).build()
}

pub fn protocol_parameters(params: ProtocolParams) -> Result<ProtocolParameters, Error> {
    let cost_models = params
        .plutus_cost_models
        .into_iter()
        .filter_map(|(lang, values)| Some((ScriptLanguage::parse(&lang)?, values)))
        .collect();

    let min_fee_reference_scripts = params
        .min_fee_reference_scripts
        .map(|x| -> Result<_, Error> {
            Ok(ReferenceScriptFee {
                range: x.range.as_u64()?,
                base: x.base.as_rational()?,
                multiplier: x.multiplier.as_rational()?,
            })
        })
        .transpose()?;

    Ok(ProtocolParameters {
        min_fee_coefficient: params.min_fee_coefficient.as_u64()?,
        min_fee_constant: params.min_fee_constant.lovelace()?,
        max_block_body_size: params.max_block_body_size.bytes.as_u64()?,
        max_tx_size: params.max_transaction_size.bytes.as_u64()?,
        max_block_header_size: params.max_block_header_size.bytes.as_u64()?,
        key_deposit: params.stake_credential_deposit.lovelace()?,
        pool_deposit: params.stake_pool_deposit.lovelace()?,
        pool_influence: params.stake_pool_pledge_influence.as_rational()?,
        monetary_expansion: params.monetary_expansion.as_rational()?,
        treasury_expansion: params.treasury_expansion.as_rational()?,
        decentralisation: Default::default(),
        extra_entropy: params.extra_entropy,
        protocol_major: params.version.major,
        protocol_minor: params.version.minor,
        min_utxo: params
            .min_utxo_deposit_constant
            .map(|x| x.lovelace())
            .transpose()?
            .unwrap_or_default(),
        min_pool_cost: params.min_stake_pool_cost.lovelace()?,
        price_mem: params.script_execution_prices.memory.as_rational()?,
        price_step: params.script_execution_prices.cpu.as_rational()?,
        max_tx_ex_units: budget(&params.max_execution_units_per_transaction)?,
        max_block_ex_units: budget(&params.max_execution_units_per_block)?,
        max_value_size: params.max_value_size.bytes.as_u64()?,
        collateral_percent: params.collateral_percentage.as_u64()?,
        max_collateral_inputs: params.max_collateral_inputs.as_u64()?,
        coins_per_utxo_byte: params.min_utxo_deposit_coefficient.as_u64()?,
        coins_per_utxo_word: 0,
        cost_models,
        max_reference_scripts_size: params
            .max_reference_scripts_size
            .map(|x| x.bytes.as_u64())
            .transpose()?
            .unwrap_or_default(),
        min_fee_reference_scripts,
    })
}

pub fn genesis_parameters(genesis: ShelleyGenesis) -> Result<GenesisParameters, Error> {
    let start = DateTime::parse_from_rfc3339(&genesis.start_time)
        .map_err(|e| Error::DecodeFailed(format!("genesis start time: {e}")))?;

    let system_start = u64::try_from(start.timestamp())
        .map_err(|_| Error::DecodeFailed(format!("genesis start time {start} before epoch")))?;

    Ok(GenesisParameters {
        active_slots_coefficient: genesis.active_slots_coefficient.as_rational()?,
        update_quorum: genesis.update_quorum,
        max_lovelace_supply: genesis.max_lovelace_supply.as_u64()?,
        network_magic: genesis.network_magic,
        epoch_length: genesis.epoch_length,
        system_start,
        slots_per_kes_period: genesis.slots_per_kes_period,
        slot_length: genesis.slot_length.milliseconds / 1000,
        max_kes_evolutions: genesis.max_kes_evolutions,
        security_param: genesis.security_parameter,
    })
}

pub fn delegation(summary: Option<RewardAccountSummary>) -> Result<Delegation, Error> {
    let Some(summary) = summary else {
        return Ok(Delegation::undelegated());
    };

    let pool_id = summary.delegate.map(|x| x.id).unwrap_or_default();

    let rewards = summary
        .rewards
        .map(|x| x.lovelace())
        .transpose()?
        .unwrap_or_default();

    Ok(Delegation {
        active: !pool_id.is_empty(),
        rewards,
        pool_id,
        epoch: None,
    })
}

fn budget(budget: &Budget) -> Result<ExUnits, Error> {
    Ok(ExUnits {
        mem: budget.memory.as_u64()?,
        steps: budget.cpu.as_u64()?,
    })
}

pub fn eval_report(items: Vec<EvalItem>) -> Result<EvalReport, Error> {
    let mut entries = Vec::with_capacity(items.len());

    for item in items {
        let units = budget(&item.budget)?;

        match item.validator {
            ValidatorRef::Structured(x) => entries.push((x.purpose, x.index, units)),
            ValidatorRef::Keyed(key) => match parse_keyed_purpose(&key) {
                Some((tag, index)) => entries.push((tag.as_str().to_string(), index, units)),
                None => tracing::debug!(key, "dropping redeemer with unknown purpose"),
            },
        }
    }

    Ok(redeemer::normalize(entries))
}

/// Renders a UTxO as an `additionalUtxo` entry.
pub fn ogmios_utxo(utxo: &Utxo) -> OgmiosUtxo {
    let output = &utxo.output;
    let value = output.value();

    let mut assets = BTreeMap::new();
    assets.insert(
        "ada".to_string(),
        BTreeMap::from([("lovelace".to_string(), value.coin)]),
    );

    for (policy, name, quantity) in value.iter_assets() {
        assets
            .entry(policy.to_string())
            .or_insert_with(BTreeMap::new)
            .insert(name.to_string(), quantity);
    }

    let (datum_hash, datum) = match output.datum() {
        Some(DatumOption::Hash(x)) => (Some(x.to_string()), None),
        Some(DatumOption::Inline(x)) => (None, Some(hex::encode(x.cbor()))),
        Some(DatumOption::None) | None => (None, None),
    };

    OgmiosUtxo {
        transaction: TxId {
            id: utxo.input.hash().to_string(),
        },
        index: utxo.input.index(),
        address: output.address().to_string(),
        value: assets,
        datum_hash,
        datum,
        script: output.script_ref().map(|x| OgmiosScript {
            language: x.language.as_str().to_string(),
            cbor: hex::encode(&x.bytes),
        }),
    }
}
