use serde::{Deserialize, Serialize};

/// Coarse classification of [`Error`], stable across backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    InvalidAddress,
    InvalidUnit,
    InvalidInput,
    AmbiguousResult,
    EvaluationFailed,
    SubmissionFailed,
    Cancelled,
    RateLimited,
    NotImplemented,
    ProviderInternal,
    DecodeFailed,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid unit: {0}")]
    InvalidUnit(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("ambiguous result: {0}")]
    AmbiguousResult(String),

    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("tx submission failed: {0}")]
    SubmissionFailed(String),

    #[error("tx rejected, bad inputs: {0}")]
    BadInputs(String),

    #[error("tx rejected, value not conserved: {0}")]
    ValueNotConserved(String),

    #[error("tx rejected, too large: {0}")]
    TxTooLarge(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("operation not implemented by provider: {0}")]
    NotImplemented(&'static str),

    #[error("provider api error {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("provider internal error: {0}")]
    ProviderInternal(String),

    #[error("decode failed: {0}")]
    DecodeFailed(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Error::InvalidUnit(_) => ErrorKind::InvalidUnit,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::AmbiguousResult(_) => ErrorKind::AmbiguousResult,
            Error::EvaluationFailed(_) => ErrorKind::EvaluationFailed,
            Error::SubmissionFailed(_)
            | Error::BadInputs(_)
            | Error::ValueNotConserved(_)
            | Error::TxTooLarge(_) => ErrorKind::SubmissionFailed,
            Error::Cancelled(_) => ErrorKind::Cancelled,
            Error::RateLimited => ErrorKind::RateLimited,
            Error::NotImplemented(_) => ErrorKind::NotImplemented,
            Error::Api { .. } | Error::ProviderInternal(_) => ErrorKind::ProviderInternal,
            Error::DecodeFailed(_) => ErrorKind::DecodeFailed,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_ambiguous(&self) -> bool {
        self.kind() == ErrorKind::AmbiguousResult
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }

    /// Prefixes the message with the operation or key that produced it.
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        let wrap = |msg: String| format!("{ctx}: {msg}");

        match self {
            Error::NotFound(x) => Error::NotFound(wrap(x)),
            Error::InvalidAddress(x) => Error::InvalidAddress(wrap(x)),
            Error::InvalidUnit(x) => Error::InvalidUnit(wrap(x)),
            Error::InvalidInput(x) => Error::InvalidInput(wrap(x)),
            Error::AmbiguousResult(x) => Error::AmbiguousResult(wrap(x)),
            Error::EvaluationFailed(x) => Error::EvaluationFailed(wrap(x)),
            Error::SubmissionFailed(x) => Error::SubmissionFailed(wrap(x)),
            Error::BadInputs(x) => Error::BadInputs(wrap(x)),
            Error::ValueNotConserved(x) => Error::ValueNotConserved(wrap(x)),
            Error::TxTooLarge(x) => Error::TxTooLarge(wrap(x)),
            Error::Cancelled(x) => Error::Cancelled(wrap(x)),
            Error::ProviderInternal(x) => Error::ProviderInternal(wrap(x)),
            Error::DecodeFailed(x) => Error::DecodeFailed(wrap(x)),
            Error::Api {
                status,
                code,
                message,
            } => Error::Api {
                status,
                code,
                message: wrap(message),
            },
            x @ (Error::RateLimited | Error::NotImplemented(_)) => x,
        }
    }

    /// Classifies a node rejection message into the specific submission
    /// failure it describes.
    pub fn submission(message: impl Into<String>) -> Self {
        let message = message.into();

        if message.contains("BadInputsUTxO") {
            Error::BadInputs(message)
        } else if message.contains("ValueNotConservedUTxO") {
            Error::ValueNotConserved(message)
        } else if message.contains("MaxTxSizeUTxO") {
            Error::TxTooLarge(message)
        } else {
            Error::SubmissionFailed(message)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Extension for attaching operation context to fallible results.
pub trait ResultExt<T> {
    fn context(self, ctx: impl std::fmt::Display) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, ctx: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl From<pallas::codec::minicbor::decode::Error> for Error {
    fn from(error: pallas::codec::minicbor::decode::Error) -> Self {
        Error::DecodeFailed(error.to_string())
    }
}

impl<E: std::fmt::Display> From<pallas::codec::minicbor::encode::Error<E>> for Error {
    fn from(error: pallas::codec::minicbor::encode::Error<E>) -> Self {
        Error::ProviderInternal(format!("cbor encoding: {error}"))
    }
}

impl From<pallas::ledger::traverse::Error> for Error {
    fn from(error: pallas::ledger::traverse::Error) -> Self {
        Error::DecodeFailed(error.to_string())
    }
}

impl From<pallas::ledger::addresses::Error> for Error {
    fn from(error: pallas::ledger::addresses::Error) -> Self {
        Error::InvalidAddress(error.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(error: hex::FromHexError) -> Self {
        Error::DecodeFailed(error.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::DecodeFailed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_kind() {
        let err = Error::NotFound("tx".into()).context("utxos_by_output_ref");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "not found: utxos_by_output_ref: tx");
    }

    #[test]
    fn submission_messages_are_classified() {
        let bad = Error::submission("ConwayUtxowFailure (BadInputsUTxO (fromList [...]))");
        assert!(matches!(bad, Error::BadInputs(_)));

        let value = Error::submission("ValueNotConservedUTxO (Mismatch ...)");
        assert!(matches!(value, Error::ValueNotConserved(_)));

        let size = Error::submission("MaxTxSizeUTxO 20000 16384");
        assert!(matches!(size, Error::TxTooLarge(_)));

        let other = Error::submission("something else");
        assert!(matches!(other, Error::SubmissionFailed(_)));
        assert_eq!(other.kind(), ErrorKind::SubmissionFailed);
    }
}
