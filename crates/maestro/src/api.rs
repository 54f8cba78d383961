use connector_core::Error;

use crate::types::*;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("maestro transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("maestro returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected maestro response: {0}")]
    Body(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ApiError::Status {
            status,
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
            ApiError::Status { message, .. } => message.clone(),
            x => x.to_string(),
        }
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
        }
    }
}

/// Filters for `/addresses/{address}/utxos`.
#[derive(Debug, Clone, Default)]
pub struct UtxoQuery<'a> {
    pub asset: Option<&'a str>,
    pub cursor: Option<String>,
}

/// The Maestro endpoints the adapter relies on.
#[trait_variant::make(Send)]
pub trait MaestroApi: Send + Sync {
    /// `GET /protocol-parameters`
    async fn protocol_parameters(&self) -> Result<Envelope<ProtocolParams>, ApiError>;

    /// `GET /chain-tip`
    async fn chain_tip(&self) -> Result<Envelope<ChainTip>, ApiError>;

    /// `GET /epochs/current`
    async fn current_epoch(&self) -> Result<Envelope<EpochInfo>, ApiError>;

    /// `GET /blocks/{hash}`
    async fn block(&self, hash: &str) -> Result<Envelope<BlockInfo>, ApiError>;

    /// `GET /addresses/{address}/utxos?with_cbor=true&resolve_datums=true&count=100`
    async fn address_utxos(
        &self,
        address: &str,
        query: UtxoQuery<'_>,
    ) -> Result<Envelope<Vec<Utxo>>, ApiError>;

    /// `GET /assets/{unit}/addresses?count={count}`
    async fn asset_holders(&self, unit: &str, count: u32) -> Result<Envelope<Vec<AssetHolder>>, ApiError>;

    /// `GET /transactions/{hash}/outputs/{index}/txo?with_cbor=true&resolve_datums=true`
    async fn txo(&self, hash: &str, index: u32) -> Result<Envelope<Utxo>, ApiError>;

    /// `GET /transactions/{hash}/cbor`
    async fn tx_cbor(&self, hash: &str) -> Result<Envelope<String>, ApiError>;

    /// `GET /accounts/{stake_address}`
    async fn account(&self, stake_address: &str) -> Result<Envelope<AccountInfo>, ApiError>;

    /// `GET /datums/{hash}`
    async fn datum(&self, hash: &str) -> Result<Envelope<DatumContent>, ApiError>;

    /// `GET /scripts/{hash}`
    async fn script(&self, hash: &str) -> Result<Envelope<ScriptContent>, ApiError>;

    /// `POST /txmanager`, returning the raw response body.
    async fn submit(&self, tx: &[u8]) -> Result<String, ApiError>;

    /// `POST /transactions/evaluate`
    async fn evaluate(&self, request: &EvalRequest) -> Result<Vec<EvalResult>, ApiError>;
}
