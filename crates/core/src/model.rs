//! Canonical ledger model shared by every backend.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use base58::FromBase58;
use pallas::{
    codec::minicbor,
    crypto::hash::Hasher,
    ledger::{addresses::Address as PallasAddress, primitives::PlutusData},
};
use serde::{Deserialize, Serialize};

use crate::{
    numeric::Rational, unit::Unit, BlockHash, BlockHeight, BlockSlot, Cbor, DatumHash, Epoch,
    Error, PolicyId, ScriptHash, TxoRef,
};

// ====
// Address
// ====

/// Raw address bytes, validated on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Vec<u8>);

impl Address {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let address = PallasAddress::from_bytes(bytes)?;
        Ok(Self(address.to_vec()))
    }

    /// Accepts bech32 (shelley), hex or base58 (byron) text.
    pub fn parse(input: &str) -> Result<Self, Error> {
        if let Ok(address) = PallasAddress::from_bech32(input) {
            return Ok(Self(address.to_vec()));
        }

        if let Ok(bytes) = hex::decode(input) {
            if let Ok(address) = PallasAddress::from_bytes(&bytes) {
                return Ok(Self(address.to_vec()));
            }
        }

        if let Ok(bytes) = input.from_base58() {
            if let Ok(address) = PallasAddress::from_bytes(&bytes) {
                return Ok(Self(address.to_vec()));
            }
        }

        Err(Error::InvalidAddress(input.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_pallas(&self) -> Result<PallasAddress, Error> {
        Ok(PallasAddress::from_bytes(&self.0)?)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match PallasAddress::from_bytes(&self.0) {
            Ok(address) => f.write_str(&address.to_string()),
            Err(_) => f.write_str(&hex::encode(&self.0)),
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// A stake (reward) address, checked to carry a stake payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeAddress {
    bech32: String,
    credential: Vec<u8>,
    script: bool,
}

impl StakeAddress {
    pub fn parse(input: &str) -> Result<Self, Error> {
        let address = PallasAddress::from_bech32(input)
            .map_err(|e| Error::InvalidAddress(format!("{input}: {e}")))?;

        let PallasAddress::Stake(stake) = address else {
            return Err(Error::InvalidAddress(format!(
                "{input}: not a stake address"
            )));
        };

        let (credential, script) = match stake.payload() {
            pallas::ledger::addresses::StakePayload::Stake(x) => (x.as_slice().to_vec(), false),
            pallas::ledger::addresses::StakePayload::Script(x) => (x.as_slice().to_vec(), true),
        };

        Ok(Self {
            bech32: input.to_string(),
            credential,
            script,
        })
    }

    /// The 28 byte credential hash carried by the address.
    pub fn credential(&self) -> &[u8] {
        &self.credential
    }

    /// Whether the credential is a script hash rather than a key hash.
    pub fn is_script(&self) -> bool {
        self.script
    }

    pub fn as_str(&self) -> &str {
        &self.bech32
    }
}

impl Display for StakeAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.bech32)
    }
}

// ====
// Value
// ====

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AssetName(pub Vec<u8>);

impl AssetName {
    pub fn from_hex(input: &str) -> Result<Self, Error> {
        Ok(Self(hex::decode(input)?))
    }
}

impl Display for AssetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl Serialize for AssetName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AssetName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

pub type Multiasset = BTreeMap<PolicyId, BTreeMap<AssetName, u64>>;

/// Lovelace plus native assets. Zero quantity entries and empty policies are
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Value {
    pub coin: u64,
    #[serde(default)]
    assets: Multiasset,
}

impl Value {
    pub fn lovelace(coin: u64) -> Self {
        Self {
            coin,
            assets: Default::default(),
        }
    }

    pub fn assets(&self) -> &Multiasset {
        &self.assets
    }

    pub fn has_assets(&self) -> bool {
        !self.assets.is_empty()
    }

    /// Adds `quantity` of an asset, accumulating repeated entries.
    pub fn add_asset(&mut self, policy: PolicyId, name: AssetName, quantity: u64) {
        if quantity == 0 {
            return;
        }

        let entry = self.assets.entry(policy).or_default().entry(name).or_default();
        *entry = entry.saturating_add(quantity);
    }

    pub fn add(&mut self, unit: &Unit, quantity: u64) {
        match unit {
            Unit::Lovelace => self.coin = self.coin.saturating_add(quantity),
            Unit::Asset { policy, name } => {
                self.add_asset(*policy, AssetName(name.clone()), quantity)
            }
        }
    }

    pub fn quantity_of(&self, unit: &Unit) -> u64 {
        match unit {
            Unit::Lovelace => self.coin,
            Unit::Asset { policy, name } => self
                .assets
                .get(policy)
                .and_then(|names| names.get(&AssetName(name.clone())))
                .copied()
                .unwrap_or_default(),
        }
    }

    pub fn iter_assets(&self) -> impl Iterator<Item = (&PolicyId, &AssetName, u64)> {
        self.assets
            .iter()
            .flat_map(|(policy, names)| names.iter().map(move |(name, q)| (policy, name, *q)))
    }

    /// Builds a value from `(unit, quantity)` pairs.
    pub fn from_units<I>(items: I) -> Self
    where
        I: IntoIterator<Item = (Unit, u64)>,
    {
        let mut value = Value::default();

        for (unit, quantity) in items {
            value.add(&unit, quantity);
        }

        value
    }
}

// ====
// Datum & scripts
// ====

/// A structured (Plutus) datum along with the exact bytes it was decoded
/// from.
#[derive(Debug, Clone)]
pub struct Datum {
    cbor: Cbor,
    data: PlutusData,
}

impl Datum {
    pub fn decode(cbor: Cbor) -> Result<Self, Error> {
        let data = minicbor::decode::<PlutusData>(&cbor)
            .map_err(|e| Error::DecodeFailed(format!("datum is not plutus data: {e}")))?;

        Ok(Self { cbor, data })
    }

    pub fn decode_hex(cbor: &str) -> Result<Self, Error> {
        Self::decode(hex::decode(cbor)?)
    }

    pub fn cbor(&self) -> &[u8] {
        &self.cbor
    }

    pub fn data(&self) -> &PlutusData {
        &self.data
    }

    pub fn hash(&self) -> DatumHash {
        Hasher::<256>::hash(&self.cbor)
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        self.cbor == other.cbor
    }
}

impl Eq for Datum {}

impl Serialize for Datum {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.cbor))
    }
}

impl<'de> Deserialize<'de> for Datum {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::decode_hex(&text).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DatumOption {
    #[default]
    None,
    Hash(DatumHash),
    Inline(Datum),
}

impl DatumOption {
    pub fn is_none(&self) -> bool {
        matches!(self, DatumOption::None)
    }

    pub fn hash(&self) -> Option<DatumHash> {
        match self {
            DatumOption::None => None,
            DatumOption::Hash(x) => Some(*x),
            DatumOption::Inline(x) => Some(x.hash()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScriptLanguage {
    #[serde(rename = "native")]
    Native,
    #[serde(rename = "plutus:v1")]
    PlutusV1,
    #[serde(rename = "plutus:v2")]
    PlutusV2,
    #[serde(rename = "plutus:v3")]
    PlutusV3,
}

impl ScriptLanguage {
    /// Prefix byte used both for hashing and for the script reference tag.
    pub fn tag(&self) -> u8 {
        match self {
            ScriptLanguage::Native => 0,
            ScriptLanguage::PlutusV1 => 1,
            ScriptLanguage::PlutusV2 => 2,
            ScriptLanguage::PlutusV3 => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ScriptLanguage::Native),
            1 => Some(ScriptLanguage::PlutusV1),
            2 => Some(ScriptLanguage::PlutusV2),
            3 => Some(ScriptLanguage::PlutusV3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptLanguage::Native => "native",
            ScriptLanguage::PlutusV1 => "plutus:v1",
            ScriptLanguage::PlutusV2 => "plutus:v2",
            ScriptLanguage::PlutusV3 => "plutus:v3",
        }
    }

    /// Understands the spellings the supported backends use.
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_lowercase().as_str() {
            "native" | "timelock" | "native_script" => Some(ScriptLanguage::Native),
            "plutus:v1" | "plutusv1" | "plutus_v1" | "plutus1" => Some(ScriptLanguage::PlutusV1),
            "plutus:v2" | "plutusv2" | "plutus_v2" | "plutus2" => Some(ScriptLanguage::PlutusV2),
            "plutus:v3" | "plutusv3" | "plutus_v3" | "plutus3" => Some(ScriptLanguage::PlutusV3),
            _ => None,
        }
    }
}

impl Display for ScriptLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference script. `bytes` is the native script CBOR, or the plutus
/// script bytes as they appear in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub language: ScriptLanguage,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl Script {
    pub fn new(language: ScriptLanguage, bytes: Vec<u8>) -> Self {
        Self { language, bytes }
    }

    pub fn hash(&self) -> ScriptHash {
        let mut hasher = Hasher::<224>::new();
        hasher.input(&[self.language.tag()]);
        hasher.input(&self.bytes);
        hasher.finalize()
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

// ====
// Outputs
// ====

/// A transaction output in the shape of the era that can represent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "era", rename_all = "snake_case")]
pub enum Output {
    PreAlonzo {
        address: Address,
        value: Value,
    },
    PostAlonzo {
        address: Address,
        value: Value,
        datum: DatumOption,
        script_ref: Option<Script>,
    },
}

impl Output {
    pub fn address(&self) -> &Address {
        match self {
            Output::PreAlonzo { address, .. } => address,
            Output::PostAlonzo { address, .. } => address,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Output::PreAlonzo { value, .. } => value,
            Output::PostAlonzo { value, .. } => value,
        }
    }

    pub fn datum(&self) -> Option<&DatumOption> {
        match self {
            Output::PreAlonzo { .. } => None,
            Output::PostAlonzo { datum, .. } => Some(datum),
        }
    }

    pub fn script_ref(&self) -> Option<&Script> {
        match self {
            Output::PreAlonzo { .. } => None,
            Output::PostAlonzo { script_ref, .. } => script_ref.as_ref(),
        }
    }

    pub fn is_post_alonzo(&self) -> bool {
        matches!(self, Output::PostAlonzo { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub input: TxoRef,
    pub output: Output,
}

impl Utxo {
    pub fn new(input: TxoRef, output: Output) -> Self {
        Self { input, output }
    }
}

/// Per-item degradation noticed while adapting a backend response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub subject: String,
    pub message: String,
}

impl Warning {
    pub fn new(subject: impl Display, message: impl Display) -> Self {
        Self {
            subject: subject.to_string(),
            message: message.to_string(),
        }
    }
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// UTxOs plus the warnings collected while adapting them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoBatch {
    pub utxos: Vec<Utxo>,
    pub warnings: Vec<Warning>,
}

impl UtxoBatch {
    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn extend(&mut self, other: UtxoBatch) {
        self.utxos.extend(other.utxos);
        self.warnings.extend(other.warnings);
    }

    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(subject = %warning.subject, "{}", warning.message);
        self.warnings.push(warning);
    }
}

impl From<Vec<Utxo>> for UtxoBatch {
    fn from(utxos: Vec<Utxo>) -> Self {
        Self {
            utxos,
            warnings: vec![],
        }
    }
}

// ====
// Chain state
// ====

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Delegation {
    pub active: bool,
    pub rewards: u64,
    pub pool_id: String,
    pub epoch: Option<Epoch>,
}

impl Delegation {
    pub fn undelegated() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    pub slot: BlockSlot,
    pub height: BlockHeight,
    pub hash: BlockHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReferenceScriptFee {
    pub range: u64,
    pub base: Rational,
    pub multiplier: Rational,
}

/// Flat protocol parameters. Fields a backend does not expose stay at zero
/// (or empty).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtocolParameters {
    pub min_fee_coefficient: u64,
    pub min_fee_constant: u64,
    pub max_block_body_size: u64,
    pub max_tx_size: u64,
    pub max_block_header_size: u64,
    pub key_deposit: u64,
    pub pool_deposit: u64,
    pub pool_influence: Rational,
    pub monetary_expansion: Rational,
    pub treasury_expansion: Rational,
    pub decentralisation: Rational,
    pub extra_entropy: Option<String>,
    pub protocol_major: u64,
    pub protocol_minor: u64,
    pub min_utxo: u64,
    pub min_pool_cost: u64,
    pub price_mem: Rational,
    pub price_step: Rational,
    pub max_tx_ex_units: ExUnits,
    pub max_block_ex_units: ExUnits,
    pub max_value_size: u64,
    pub collateral_percent: u64,
    pub max_collateral_inputs: u64,
    pub coins_per_utxo_byte: u64,
    pub coins_per_utxo_word: u64,
    pub cost_models: BTreeMap<ScriptLanguage, Vec<i64>>,
    pub max_reference_scripts_size: u64,
    pub min_fee_reference_scripts: Option<ReferenceScriptFee>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenesisParameters {
    pub active_slots_coefficient: Rational,
    pub update_quorum: u64,
    pub max_lovelace_supply: u64,
    pub network_magic: u64,
    pub epoch_length: u64,
    /// Unix timestamp, in seconds.
    pub system_start: u64,
    pub slots_per_kes_period: u64,
    /// Seconds.
    pub slot_length: u64,
    pub max_kes_evolutions: u64,
    pub security_param: u64,
}

// ====
// Evaluation
// ====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeemerTag {
    Spend,
    Mint,
    Cert,
    Reward,
    Vote,
    Propose,
}

impl RedeemerTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedeemerTag::Spend => "spend",
            RedeemerTag::Mint => "mint",
            RedeemerTag::Cert => "cert",
            RedeemerTag::Reward => "reward",
            RedeemerTag::Vote => "vote",
            RedeemerTag::Propose => "propose",
        }
    }
}

impl Display for RedeemerTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalRedeemer {
    pub tag: RedeemerTag,
    pub index: u32,
    pub ex_units: ExUnits,
}

/// Evaluation results, unique by `(tag, index)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalReport {
    redeemers: BTreeMap<(RedeemerTag, u32), ExUnits>,
}

impl EvalReport {
    /// Later entries for the same `(tag, index)` replace earlier ones.
    pub fn insert(&mut self, redeemer: EvalRedeemer) {
        self.redeemers
            .insert((redeemer.tag, redeemer.index), redeemer.ex_units);
    }

    pub fn get(&self, tag: RedeemerTag, index: u32) -> Option<&ExUnits> {
        self.redeemers.get(&(tag, index))
    }

    pub fn len(&self) -> usize {
        self.redeemers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redeemers.is_empty()
    }

    pub fn redeemers(&self) -> Vec<EvalRedeemer> {
        self.redeemers
            .iter()
            .map(|((tag, index), ex_units)| EvalRedeemer {
                tag: *tag,
                index: *index,
                ex_units: *ex_units,
            })
            .collect()
    }

    /// Keys in the `purpose:index` form, e.g. `spend:0`.
    pub fn to_keyed_map(&self) -> BTreeMap<String, ExUnits> {
        self.redeemers
            .iter()
            .map(|((tag, index), ex_units)| (format!("{tag}:{index}"), *ex_units))
            .collect()
    }
}

impl Serialize for EvalReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.redeemers().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EvalReport {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<EvalRedeemer>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}

impl FromIterator<EvalRedeemer> for EvalReport {
    fn from_iter<T: IntoIterator<Item = EvalRedeemer>>(iter: T) -> Self {
        let mut report = EvalReport::default();

        for redeemer in iter {
            report.insert(redeemer);
        }

        report
    }
}
