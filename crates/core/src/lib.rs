use pallas::crypto::hash::Hash;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod builder;
pub mod cbor;
pub mod config;
pub mod error;
pub mod model;
pub mod numeric;
pub mod paging;
pub mod poller;
pub mod provider;
pub mod redeemer;
pub mod unit;

/// The index of an output in a tx
pub type TxoIdx = u32;

/// The slot of a block (a.k.a. block index)
pub type BlockSlot = u64;

/// The height of a block (a.k.a. block number)
pub type BlockHeight = u64;

pub type Epoch = u64;

pub type Cbor = Vec<u8>;

pub type TxHash = Hash<32>;
pub type BlockHash = Hash<32>;
pub type DatumHash = Hash<32>;
pub type PolicyId = Hash<28>;
pub type ScriptHash = Hash<28>;

pub use error::{Error, ErrorKind, Result, ResultExt};
pub use model::*;
pub use numeric::{parse_rational, parse_u64, Numeric, Rational};
pub use poller::{ConfirmationState, DEFAULT_POLL_INTERVAL};
pub use provider::Provider;
pub use unit::{encode_unit, parse_unit, Unit};

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxoRef(pub TxHash, pub TxoIdx);

impl TxoRef {
    pub fn hash(&self) -> &TxHash {
        &self.0
    }

    pub fn index(&self) -> TxoIdx {
        self.1
    }
}

impl From<(TxHash, TxoIdx)> for TxoRef {
    fn from(value: (TxHash, TxoIdx)) -> Self {
        Self(value.0, value.1)
    }
}

impl From<TxoRef> for (TxHash, TxoIdx) {
    fn from(value: TxoRef) -> Self {
        (value.0, value.1)
    }
}

impl Display for TxoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.0, self.1)
    }
}

impl FromStr for TxoRef {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (hash, index) = s
            .split_once('#')
            .ok_or_else(|| Error::InvalidInput(format!("{s}: expected `<tx hash>#<index>`")))?;

        Ok(Self(parse_hash(hash)?, parse_index(index)?))
    }
}

fn parse_index(input: &str) -> Result<TxoIdx> {
    input
        .parse()
        .map_err(|e| Error::InvalidInput(format!("{input}: output index: {e}")))
}

/// Parses a hex encoded hash of exactly `N` bytes.
pub fn parse_hash<const N: usize>(input: &str) -> Result<Hash<N>> {
    let bytes = hex::decode(input)
        .map_err(|e| Error::InvalidInput(format!("{input}: invalid hash hex: {e}")))?;

    let bytes: [u8; N] = bytes
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("{input}: expected a {N} byte hash")))?;

    Ok(Hash::new(bytes))
}

/// Async cancellation signal observed by long running operations.
#[trait_variant::make(Send)]
pub trait CancelToken: Send + Sync + 'static + Clone {
    async fn cancelled(&self);
}

impl CancelToken for tokio_util::sync::CancellationToken {
    async fn cancelled(&self) {
        tokio_util::sync::CancellationToken::cancelled(self).await
    }
}

/// A token that is never cancelled.
#[derive(Clone, Debug, Default)]
pub struct NeverCancel;

impl CancelToken for NeverCancel {
    async fn cancelled(&self) {
        std::future::pending::<()>().await
    }
}
