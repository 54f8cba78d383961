use connector_core::Error;
use serde_json::Value as Json;

use crate::{
    patterns::{MatchFilter, Pattern},
    types::*,
};

pub const PROTOCOL_PARAMETERS: &str = "queryLedgerState/protocolParameters";
pub const GENESIS_CONFIGURATION: &str = "queryNetwork/genesisConfiguration";
pub const NETWORK_TIP: &str = "queryNetwork/tip";
pub const BLOCK_HEIGHT: &str = "queryNetwork/blockHeight";
pub const EPOCH: &str = "queryLedgerState/epoch";
pub const REWARD_ACCOUNT_SUMMARIES: &str = "queryLedgerState/rewardAccountSummaries";
pub const SUBMIT_TRANSACTION: &str = "submitTransaction";
pub const EVALUATE_TRANSACTION: &str = "evaluateTransaction";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("http {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Body(String),

    #[error("ogmios error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Json>,
    },
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn rpc(code: i64, message: impl Into<String>, data: Option<Json>) -> Self {
        ApiError::Rpc {
            code,
            message: message.into(),
            data,
        }
    }

    /// The node's own wording, including any structured failure detail.
    pub fn message(&self) -> String {
        match self {
            ApiError::Rpc {
                message,
                data: Some(data),
                ..
            } => format!("{message}: {data}"),
            ApiError::Rpc { message, .. } => message.clone(),
            ApiError::Status { message, .. } => message.clone(),
            x => x.to_string(),
        }
    }
}

impl From<RpcError> for ApiError {
    fn from(value: RpcError) -> Self {
        ApiError::rpc(value.code, value.message, value.data)
    }
}

impl From<ApiError> for Error {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::Status { status: 404, message } => Error::NotFound(message),
            ApiError::Status { status: 429, .. } => Error::RateLimited,
            ApiError::Status { status, message } => Error::Api {
                status,
                code: None,
                message,
            },
            ApiError::Transport(e) if e.is_decode() => Error::DecodeFailed(e.to_string()),
            ApiError::Transport(e) => Error::ProviderInternal(e.to_string()),
            ApiError::Body(x) => Error::DecodeFailed(x),
            x @ ApiError::Rpc { .. } => Error::ProviderInternal(x.message()),
        }
    }
}

/// The Kupo endpoints the adapter relies on.
#[trait_variant::make(Send)]
pub trait KupoApi: Send + Sync {
    /// `GET /matches/{pattern}?{filter}`
    async fn matches(&self, pattern: &Pattern, filter: &MatchFilter) -> Result<Vec<Match>, ApiError>;

    /// `GET /datums/{hash}`, `None` when Kupo doesn't know the datum.
    async fn datum(&self, hash: &str) -> Result<Option<KupoDatum>, ApiError>;

    /// `GET /scripts/{hash}`, `None` when Kupo doesn't know the script.
    async fn script(&self, hash: &str) -> Result<Option<KupoScript>, ApiError>;
}

/// A JSON-RPC 2.0 channel to Ogmios.
#[trait_variant::make(Send)]
pub trait OgmiosApi: Send + Sync {
    /// Sends `method` with `params` and returns the `result` member, or the
    /// `error` member as [`ApiError::Rpc`].
    async fn call(&self, method: &str, params: Option<Json>) -> Result<Json, ApiError>;
}
