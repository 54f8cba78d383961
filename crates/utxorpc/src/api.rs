use futures_util::stream::BoxStream;
use pallas::interop::utxorpc::spec as u5c;
use tonic::Code;

use connector_core::Error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("grpc {}: {}", .0.code(), .0.message())]
    Status(#[from] tonic::Status),

    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("unexpected response: {0}")]
    Body(String),
}

impl ApiError {
    pub fn code(&self) -> Option<Code> {
        match self {
            ApiError::Status(x) => Some(x.code()),
            _ => None,
        }
    }

    /// The server's own wording, without the status prefix.
    pub fn message(&self) -> String {
        match self {
            ApiError::Status(x) => x.message().to_string(),
            x => x.to_string(),
        }
    }
}

fn http_status(code: Code) -> u16 {
    match code {
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => 400,
        Code::Unauthenticated => 401,
        Code::PermissionDenied => 403,
        Code::AlreadyExists | Code::Aborted => 409,
        Code::Unimplemented => 501,
        Code::Unavailable => 503,
        Code::DeadlineExceeded => 504,
        _ => 500,
    }
}

impl From<ApiError> for Error {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::Status(x) => match x.code() {
                Code::NotFound => Error::NotFound(x.message().to_string()),
                Code::ResourceExhausted => Error::RateLimited,
                Code::Cancelled => Error::Cancelled(x.message().to_string()),
                code => Error::Api {
                    status: http_status(code),
                    code: Some(code.description().to_string()),
                    message: x.message().to_string(),
                },
            },
            ApiError::Transport(x) => Error::ProviderInternal(x.to_string()),
            ApiError::Endpoint(x) => Error::InvalidInput(x),
            ApiError::Body(x) => Error::DecodeFailed(x),
        }
    }
}

pub type StageStream = BoxStream<'static, Result<u5c::submit::WaitForTxResponse, ApiError>>;

/// The UTxO RPC (u5c) calls the adapter relies on.
#[trait_variant::make(Send)]
pub trait UtxorpcApi: Send + Sync {
    /// `query.ReadParams`
    async fn read_params(&self) -> Result<u5c::query::ReadParamsResponse, ApiError>;

    /// `query.SearchUtxos`, one page at a time.
    async fn search_utxos(
        &self,
        request: u5c::query::SearchUtxosRequest,
    ) -> Result<u5c::query::SearchUtxosResponse, ApiError>;

    /// `query.ReadUtxos`. Unknown refs are left out of the response.
    async fn read_utxos(
        &self,
        keys: Vec<u5c::query::TxoRef>,
    ) -> Result<u5c::query::ReadUtxosResponse, ApiError>;

    /// `sync.ReadTip`
    async fn read_tip(&self) -> Result<u5c::sync::ReadTipResponse, ApiError>;

    /// `sync.FetchBlock`
    async fn fetch_block(
        &self,
        block: u5c::sync::BlockRef,
    ) -> Result<u5c::sync::FetchBlockResponse, ApiError>;

    /// `submit.SubmitTx` with a single raw tx.
    async fn submit_tx(&self, tx: Vec<u8>) -> Result<u5c::submit::SubmitTxResponse, ApiError>;

    /// `submit.WaitForTx`. The first update carries the current stage.
    async fn wait_for_tx(&self, tx_hash: Vec<u8>) -> Result<StageStream, ApiError>;

    /// `submit.EvalTx` with a single raw tx.
    async fn eval_tx(&self, tx: Vec<u8>) -> Result<u5c::submit::EvalTxResponse, ApiError>;
}
