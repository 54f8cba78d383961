//! Wire shapes of the Blockfrost REST API.
//!
//! Quantities are kept as [`Numeric`] since Blockfrost mixes JSON numbers
//! and decimal strings across endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use connector_core::numeric::Numeric;

/// Error body returned with every non-2xx status.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub status_code: u16,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EpochParams {
    pub min_fee_a: Option<Numeric>,
    pub min_fee_b: Option<Numeric>,
    pub max_block_size: Option<Numeric>,
    pub max_tx_size: Option<Numeric>,
    pub max_block_header_size: Option<Numeric>,
    pub key_deposit: Option<Numeric>,
    pub pool_deposit: Option<Numeric>,
    pub a0: Option<Numeric>,
    pub rho: Option<Numeric>,
    pub tau: Option<Numeric>,
    pub decentralisation_param: Option<Numeric>,
    pub extra_entropy: Option<serde_json::Value>,
    pub protocol_major_ver: Option<Numeric>,
    pub protocol_minor_ver: Option<Numeric>,
    pub min_utxo: Option<Numeric>,
    pub min_pool_cost: Option<Numeric>,
    pub price_mem: Option<Numeric>,
    pub price_step: Option<Numeric>,
    pub max_tx_ex_mem: Option<Numeric>,
    pub max_tx_ex_steps: Option<Numeric>,
    pub max_block_ex_mem: Option<Numeric>,
    pub max_block_ex_steps: Option<Numeric>,
    pub max_val_size: Option<Numeric>,
    pub collateral_percent: Option<Numeric>,
    pub max_collateral_inputs: Option<Numeric>,
    pub coins_per_utxo_size: Option<Numeric>,
    pub coins_per_utxo_word: Option<Numeric>,
    pub cost_models: Option<BTreeMap<String, BTreeMap<String, i64>>>,
    pub cost_models_raw: Option<BTreeMap<String, Vec<i64>>>,
    pub min_fee_ref_script_cost_per_byte: Option<Numeric>,
    pub maximum_reference_scripts_size: Option<Numeric>,
    pub min_fee_reference_scripts_range: Option<Numeric>,
    pub min_fee_reference_scripts_base: Option<Numeric>,
    pub min_fee_reference_scripts_multiplier: Option<Numeric>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Genesis {
    pub active_slots_coefficient: Numeric,
    pub update_quorum: Numeric,
    pub max_lovelace_supply: Numeric,
    pub network_magic: Numeric,
    pub epoch_length: Numeric,
    pub system_start: Numeric,
    pub slots_per_kes_period: Numeric,
    pub slot_length: Numeric,
    pub max_kes_evolutions: Numeric,
    pub security_param: Numeric,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub hash: String,
    pub slot: Option<u64>,
    pub height: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpochContent {
    pub epoch: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Amount {
    pub unit: String,
    pub quantity: String,
}

/// An entry of `/addresses/{address}/utxos`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressUtxo {
    pub address: String,
    pub tx_hash: String,
    pub output_index: u32,
    pub amount: Vec<Amount>,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub data_hash: Option<String>,
    #[serde(default)]
    pub inline_datum: Option<String>,
    #[serde(default)]
    pub reference_script_hash: Option<String>,
}

/// An entry of `/assets/{unit}/addresses`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetAddress {
    pub address: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub amount: Vec<Amount>,
    pub output_index: u32,
    #[serde(default)]
    pub data_hash: Option<String>,
    #[serde(default)]
    pub inline_datum: Option<String>,
    #[serde(default)]
    pub reference_script_hash: Option<String>,
    #[serde(default)]
    pub collateral: bool,
}

/// Body of `/txs/{hash}/utxos`.
#[derive(Debug, Clone, Deserialize)]
pub struct TxUtxos {
    pub hash: String,
    pub outputs: Vec<TxOutput>,
}

/// Body of `/txs/{hash}`. Only the fields the adapter reads.
#[derive(Debug, Clone, Deserialize)]
pub struct TxContent {
    pub hash: String,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub block_height: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub stake_address: String,
    pub active: bool,
    pub active_epoch: Option<u64>,
    #[serde(default)]
    pub controlled_amount: Option<String>,
    #[serde(default)]
    pub withdrawable_amount: Option<String>,
    pub pool_id: Option<String>,
    #[serde(default)]
    pub drep_id: Option<String>,
}

/// Body of the `.../cbor` endpoints for datums and scripts.
#[derive(Debug, Clone, Deserialize)]
pub struct CborContent {
    pub cbor: Option<String>,
}

/// Body of `/scripts/{hash}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptInfo {
    pub script_hash: String,
    #[serde(rename = "type")]
    pub kind: String,
}

// ====
// Evaluation
// ====

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvalTxIn {
    #[serde(rename = "txId")]
    pub tx_id: String,
    pub index: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvalValue {
    pub coins: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub assets: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvalTxOut {
    pub address: String,
    pub value: EvalValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datum_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<BTreeMap<String, String>>,
}

/// Body of `/utils/txs/evaluate/utxos`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvalRequest {
    pub cbor: String,
    #[serde(rename = "additionalUtxoSet")]
    pub additional_utxo_set: Vec<(EvalTxIn, EvalTxOut)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvalBudget {
    pub memory: u64,
    #[serde(alias = "cpu")]
    pub steps: u64,
}

/// An entry of the v6 evaluation result list.
#[derive(Debug, Clone, Deserialize)]
pub struct EvalEntry {
    pub validator: EvalValidator,
    pub budget: EvalBudget,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvalValidator {
    pub purpose: String,
    pub index: u64,
}

/// The evaluation response. Blockfrost relays Ogmios, so both the v5
/// (`EvaluationResult` map) and the v6 (list of validators) shapes show up.
#[derive(Debug, Clone, Deserialize)]
pub struct EvalResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub fault: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}
