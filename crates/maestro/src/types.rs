//! Wire shapes of the Maestro v1 API.

use serde::{Deserialize, Serialize};

use connector_core::{numeric::Numeric, Error};

/// Every Maestro response wraps its payload like this.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub last_updated: Option<LastUpdated>,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            next_cursor: None,
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastUpdated {
    #[serde(default)]
    pub timestamp: Option<String>,
    pub block_hash: String,
    #[serde(default)]
    pub block_slot: Option<u64>,
}

/// A lovelace amount, either bare or wrapped as `{"ada": {"lovelace": n}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Lovelace {
    Plain(Numeric),
    Ada { ada: AdaAmount },
    Lovelace { lovelace: Numeric },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdaAmount {
    pub lovelace: Numeric,
}

impl Lovelace {
    pub fn amount(&self) -> Result<u64, Error> {
        match self {
            Lovelace::Plain(x) => x.as_u64(),
            Lovelace::Ada { ada } => ada.lovelace.as_u64(),
            Lovelace::Lovelace { lovelace } => lovelace.as_u64(),
        }
    }
}

/// A size, either bare or wrapped as `{"bytes": n}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Bytes {
    Plain(Numeric),
    Wrapped { bytes: Numeric },
}

impl Bytes {
    pub fn size(&self) -> Result<u64, Error> {
        match self {
            Bytes::Plain(x) => x.as_u64(),
            Bytes::Wrapped { bytes } => bytes.as_u64(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionUnits {
    pub memory: Numeric,
    #[serde(alias = "cpu")]
    pub steps: Numeric,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionPrices {
    pub memory: Numeric,
    #[serde(alias = "cpu")]
    pub steps: Numeric,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolVersion {
    pub major: u64,
    pub minor: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceScriptFee {
    pub range: Numeric,
    pub base: Numeric,
    pub multiplier: Numeric,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolParams {
    pub min_fee_coefficient: Numeric,
    pub min_fee_constant: Lovelace,
    pub max_transaction_size: Bytes,
    pub max_block_body_size: Bytes,
    pub max_block_header_size: Bytes,
    pub stake_credential_deposit: Lovelace,
    pub stake_pool_deposit: Lovelace,
    pub stake_pool_pledge_influence: Numeric,
    pub monetary_expansion: Numeric,
    pub treasury_expansion: Numeric,
    pub protocol_version: ProtocolVersion,
    pub min_stake_pool_cost: Lovelace,
    pub script_execution_prices: ExecutionPrices,
    pub max_execution_units_per_transaction: ExecutionUnits,
    pub max_execution_units_per_block: ExecutionUnits,
    pub max_value_size: Bytes,
    pub collateral_percentage: Numeric,
    pub max_collateral_inputs: Numeric,
    pub min_utxo_deposit_coefficient: Numeric,
    #[serde(default)]
    pub plutus_cost_models: Option<std::collections::BTreeMap<String, Vec<i64>>>,
    #[serde(default)]
    pub max_reference_scripts_size: Option<Bytes>,
    #[serde(default)]
    pub min_fee_reference_scripts: Option<ReferenceScriptFee>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainTip {
    pub block_hash: String,
    pub slot: u64,
    pub height: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpochInfo {
    pub epoch_no: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfo {
    pub hash: String,
    pub epoch: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub unit: String,
    pub amount: Numeric,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UtxoDatum {
    #[serde(rename = "type")]
    pub kind: String,
    pub hash: String,
    #[serde(default)]
    pub bytes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceScript {
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub bytes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Utxo {
    pub tx_hash: String,
    pub index: u32,
    #[serde(default)]
    pub slot: Option<u64>,
    pub address: String,
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub datum: Option<UtxoDatum>,
    #[serde(default)]
    pub reference_script: Option<ReferenceScript>,
    #[serde(default)]
    pub txout_cbor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetHolder {
    pub address: String,
    #[serde(default)]
    pub amount: Option<Numeric>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub stake_address: String,
    #[serde(default)]
    pub delegated_pool: Option<String>,
    pub registered: bool,
    pub rewards_available: Numeric,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatumContent {
    pub bytes: String,
}

/// `GET /scripts/{hash}` answers with the same shape as a reference script.
pub type ScriptContent = ReferenceScript;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdditionalUtxo {
    pub tx_hash: String,
    pub index: u32,
    pub txout_cbor: String,
}

/// Body of `POST /transactions/evaluate`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvalRequest {
    pub cbor: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_utxos: Vec<AdditionalUtxo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvalExUnits {
    pub mem: u64,
    pub steps: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvalResult {
    pub redeemer_tag: String,
    pub redeemer_index: u32,
    pub ex_units: EvalExUnits,
}
