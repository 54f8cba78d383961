//! Flat asset identifiers.
//!
//! A unit is either the literal `lovelace` or a 56 hex character policy id
//! followed by the hex encoded asset name, optionally separated by a `.`
//! (the Kupo / Ogmios convention).

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, PolicyId};

pub const LOVELACE: &str = "lovelace";

pub const POLICY_HEX_LEN: usize = 56;

pub const MAX_ASSET_NAME_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Unit {
    Lovelace,
    Asset { policy: PolicyId, name: Vec<u8> },
}

impl Unit {
    pub fn asset(policy: PolicyId, name: impl Into<Vec<u8>>) -> Self {
        Unit::Asset {
            policy,
            name: name.into(),
        }
    }

    pub fn is_lovelace(&self) -> bool {
        matches!(self, Unit::Lovelace)
    }

    pub fn policy(&self) -> Option<&PolicyId> {
        match self {
            Unit::Lovelace => None,
            Unit::Asset { policy, .. } => Some(policy),
        }
    }

    pub fn name_hex(&self) -> String {
        match self {
            Unit::Lovelace => String::new(),
            Unit::Asset { name, .. } => hex::encode(name),
        }
    }

    /// `policy.name` form, or the bare policy when the name is empty.
    pub fn to_dotted(&self) -> String {
        match self {
            Unit::Lovelace => LOVELACE.to_string(),
            Unit::Asset { policy, name } if name.is_empty() => policy.to_string(),
            Unit::Asset { policy, name } => format!("{policy}.{}", hex::encode(name)),
        }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unit::Lovelace => f.write_str(LOVELACE),
            Unit::Asset { policy, name } => write!(f, "{}", encode_unit(policy, &hex::encode(name))),
        }
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_unit(s)
    }
}

impl TryFrom<String> for Unit {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_unit(&value)
    }
}

impl From<Unit> for String {
    fn from(value: Unit) -> Self {
        value.to_string()
    }
}

fn parse_policy(unit: &str, hex_str: &str) -> Result<PolicyId, Error> {
    if hex_str.len() != POLICY_HEX_LEN {
        return Err(Error::InvalidUnit(format!(
            "{unit}: policy id must be {POLICY_HEX_LEN} hex characters"
        )));
    }

    let bytes = hex::decode(hex_str)
        .map_err(|e| Error::InvalidUnit(format!("{unit}: policy id: {e}")))?;

    let bytes: [u8; 28] = bytes
        .try_into()
        .map_err(|_| Error::InvalidUnit(format!("{unit}: policy id length")))?;

    Ok(PolicyId::new(bytes))
}

fn parse_asset_name(unit: &str, hex_str: &str) -> Result<Vec<u8>, Error> {
    let name =
        hex::decode(hex_str).map_err(|e| Error::InvalidUnit(format!("{unit}: asset name: {e}")))?;

    if name.len() > MAX_ASSET_NAME_LEN {
        return Err(Error::InvalidUnit(format!(
            "{unit}: asset name longer than {MAX_ASSET_NAME_LEN} bytes"
        )));
    }

    Ok(name)
}

/// Parses a unit in either the concatenated or the dotted form.
pub fn parse_unit(unit: &str) -> Result<Unit, Error> {
    if unit == LOVELACE {
        return Ok(Unit::Lovelace);
    }

    let (policy, name) = match unit.split_once('.') {
        Some(parts) => parts,
        None => {
            if !unit.is_ascii() || unit.len() < POLICY_HEX_LEN {
                return Err(Error::InvalidUnit(format!(
                    "{unit}: expected {POLICY_HEX_LEN} hex character policy id prefix"
                )));
            }
            unit.split_at(POLICY_HEX_LEN)
        }
    };

    Ok(Unit::Asset {
        policy: parse_policy(unit, policy)?,
        name: parse_asset_name(unit, name)?,
    })
}

/// Concatenated form; the name is omitted when empty.
pub fn encode_unit(policy: &PolicyId, asset_name_hex: &str) -> String {
    if asset_name_hex.is_empty() {
        policy.to_string()
    } else {
        format!("{policy}{asset_name_hex}")
    }
}
