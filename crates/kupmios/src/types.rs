//! Wire shapes of Kupo (HTTP) and Ogmios v6 (JSON-RPC).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use connector_core::{numeric::Numeric, Error};

// ====
// Kupo
// ====

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Point {
    pub slot_no: u64,
    #[serde(default)]
    pub header_hash: Option<String>,
}

/// Kupo sends `{coins, assets}`; some deployments nest lovelace under
/// `ada.lovelace` with one map per policy instead.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum KupoValue {
    Coins {
        coins: Numeric,
        #[serde(default)]
        assets: BTreeMap<String, Numeric>,
    },
    Nested(BTreeMap<String, BTreeMap<String, Numeric>>),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Match {
    #[serde(default)]
    pub transaction_index: Option<u32>,
    pub transaction_id: String,
    pub output_index: u32,
    pub address: String,
    pub value: KupoValue,
    #[serde(default)]
    pub datum_hash: Option<String>,
    #[serde(default)]
    pub datum_type: Option<String>,
    #[serde(default)]
    pub script_hash: Option<String>,
    pub created_at: Point,
    #[serde(default)]
    pub spent_at: Option<Point>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct KupoDatum {
    pub datum: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct KupoScript {
    pub language: String,
    pub script: String,
}

// ====
// Ogmios
// ====

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<P>,
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdaValue {
    pub ada: LovelaceAmount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LovelaceAmount {
    pub lovelace: Numeric,
}

impl AdaValue {
    pub fn lovelace(&self) -> Result<u64, Error> {
        self.ada.lovelace.as_u64()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bytes {
    pub bytes: Numeric,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Budget {
    pub memory: Numeric,
    pub cpu: Numeric,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinFeeReferenceScripts {
    pub range: Numeric,
    pub base: Numeric,
    pub multiplier: Numeric,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolParams {
    pub min_fee_coefficient: Numeric,
    pub min_fee_constant: AdaValue,
    pub max_block_body_size: Bytes,
    pub max_block_header_size: Bytes,
    pub max_transaction_size: Bytes,
    pub stake_credential_deposit: AdaValue,
    pub stake_pool_deposit: AdaValue,
    pub stake_pool_pledge_influence: Numeric,
    pub monetary_expansion: Numeric,
    pub treasury_expansion: Numeric,
    #[serde(default)]
    pub extra_entropy: Option<String>,
    pub min_stake_pool_cost: AdaValue,
    #[serde(default)]
    pub min_utxo_deposit_constant: Option<AdaValue>,
    pub min_utxo_deposit_coefficient: Numeric,
    pub max_value_size: Bytes,
    pub script_execution_prices: Budget,
    pub max_execution_units_per_transaction: Budget,
    pub max_execution_units_per_block: Budget,
    pub collateral_percentage: Numeric,
    pub max_collateral_inputs: Numeric,
    #[serde(default)]
    pub plutus_cost_models: BTreeMap<String, Vec<i64>>,
    #[serde(default)]
    pub max_reference_scripts_size: Option<Bytes>,
    #[serde(default)]
    pub min_fee_reference_scripts: Option<MinFeeReferenceScripts>,
    pub version: Version,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotLength {
    pub milliseconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelleyGenesis {
    pub start_time: String,
    pub network_magic: u64,
    pub active_slots_coefficient: Numeric,
    pub security_parameter: u64,
    pub epoch_length: u64,
    pub slots_per_kes_period: u64,
    pub max_kes_evolutions: u64,
    pub slot_length: SlotLength,
    pub update_quorum: u64,
    pub max_lovelace_supply: Numeric,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkTip {
    pub slot: u64,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelegateId {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardAccountSummary {
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub delegate: Option<DelegateId>,
    #[serde(default)]
    pub rewards: Option<AdaValue>,
}

/// Older Ogmios releases key summaries by credential, newer ones return a
/// list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RewardAccountSummaries {
    List(Vec<RewardAccountSummary>),
    Keyed(BTreeMap<String, RewardAccountSummary>),
}

impl RewardAccountSummaries {
    pub fn into_first(self) -> Option<RewardAccountSummary> {
        match self {
            RewardAccountSummaries::List(x) => x.into_iter().next(),
            RewardAccountSummaries::Keyed(x) => x.into_values().next(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedTx {
    pub transaction: TxId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TxId {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Validator {
    pub purpose: String,
    pub index: u32,
}

/// `{purpose, index}` in current releases, `"spend:0"` in early v6 ones.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ValidatorRef {
    Structured(Validator),
    Keyed(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvalItem {
    pub validator: ValidatorRef,
    pub budget: Budget,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TxCbor {
    pub cbor: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OgmiosScript {
    pub language: String,
    pub cbor: String,
}

/// An output in the shape `evaluateTransaction` takes for `additionalUtxo`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OgmiosUtxo {
    pub transaction: TxId,
    pub index: u32,
    pub address: String,
    pub value: BTreeMap<String, BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datum_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<OgmiosScript>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmitParams {
    pub transaction: TxCbor,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    pub transaction: TxCbor,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_utxo: Vec<OgmiosUtxo>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RewardAccountParams {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenesisParams {
    pub era: &'static str,
}
