use connector_core::Error;

use crate::types::*;

/// Transport level failure talking to a Blockfrost compatible API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("blockfrost transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("blockfrost returned {status} ({error}): {message}")]
    Status {
        status: u16,
        error: String,
        message: String,
    },

    #[error("unexpected blockfrost response: {0}")]
    Body(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            error: String::new(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(404, message)
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|x| x.as_u16()),
            ApiError::Body(_) => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Status { message, error, .. } if message.is_empty() => error.clone(),
            ApiError::Status { message, .. } => message.clone(),
            x => x.to_string(),
        }
    }
}

impl From<ApiError> for Error {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::Status { status: 404, message, .. } => Error::NotFound(message),
            // 418 is Blockfrost's auto-ban after sustained rate limiting
            ApiError::Status { status: 429 | 418, .. } => Error::RateLimited,
            ApiError::Status {
                status,
                error,
                message,
            } => Error::Api {
                status,
                code: (!error.is_empty()).then_some(error),
                message,
            },
            ApiError::Transport(e) if e.is_decode() => Error::DecodeFailed(e.to_string()),
            ApiError::Transport(e) => Error::ProviderInternal(e.to_string()),
            ApiError::Body(x) => Error::DecodeFailed(x),
        }
    }
}

/// The Blockfrost endpoints the adapter relies on.
#[trait_variant::make(Send)]
pub trait BlockfrostApi: Send + Sync {
    /// `GET /epochs/latest/parameters`
    async fn latest_epoch_parameters(&self) -> Result<EpochParams, ApiError>;

    /// `GET /genesis`
    async fn genesis(&self) -> Result<Genesis, ApiError>;

    /// `GET /blocks/latest`
    async fn latest_block(&self) -> Result<Block, ApiError>;

    /// `GET /epochs/latest`
    async fn latest_epoch(&self) -> Result<EpochContent, ApiError>;

    /// `GET /addresses/{address}/utxos[/{unit}]?page={page}`
    async fn address_utxos(
        &self,
        address: &str,
        unit: Option<&str>,
        page: u32,
    ) -> Result<Vec<AddressUtxo>, ApiError>;

    /// `GET /assets/{unit}/addresses?count={count}`
    async fn asset_addresses(&self, unit: &str, count: u32) -> Result<Vec<AssetAddress>, ApiError>;

    /// `GET /txs/{hash}/utxos`
    async fn tx_utxos(&self, hash: &str) -> Result<TxUtxos, ApiError>;

    /// `GET /txs/{hash}`
    async fn tx(&self, hash: &str) -> Result<TxContent, ApiError>;

    /// `GET /accounts/{stake_address}`
    async fn account(&self, stake_address: &str) -> Result<Account, ApiError>;

    /// `GET /scripts/datum/{hash}/cbor`
    async fn datum_cbor(&self, hash: &str) -> Result<CborContent, ApiError>;

    /// `GET /scripts/{hash}`
    async fn script(&self, hash: &str) -> Result<ScriptInfo, ApiError>;

    /// `GET /scripts/{hash}/cbor`
    async fn script_cbor(&self, hash: &str) -> Result<CborContent, ApiError>;

    /// `GET /scripts/{hash}/json`, the JSON form of a timelock script.
    async fn script_json(&self, hash: &str) -> Result<serde_json::Value, ApiError>;

    /// `POST /tx/submit`, or the full `endpoint` url when given. Returns
    /// the raw response body.
    async fn submit(&self, endpoint: Option<&str>, tx: &[u8]) -> Result<String, ApiError>;

    /// `POST /utils/txs/evaluate/utxos`
    async fn evaluate(&self, request: &EvalRequest) -> Result<EvalResponse, ApiError>;
}
