use reqwest::{header, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use connector_core::{config::BlockfrostConfig, Error};

use crate::{
    api::{ApiError, BlockfrostApi},
    types::*,
};

const PROJECT_ID_HEADER: &str = "project_id";
const CBOR_CONTENT_TYPE: &str = "application/cbor";

/// [`BlockfrostApi`] over HTTP.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, project_id: impl Into<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::ProviderInternal(format!("can't build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
        })
    }

    pub fn from_config(config: &BlockfrostConfig) -> Result<Self, Error> {
        Self::new(config.resolved_base_url()?, config.project_id.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(PROJECT_ID_HEADER, &self.project_id)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(path, "blockfrost request");

        let response = self.authed(self.http.get(self.url(path))).send().await?;
        let response = check_status(response).await?;

        Ok(response.json().await?)
    }
}

/// Turns a non-2xx response into [`ApiError::Status`], reading the
/// Blockfrost error body when there is one.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();

    let err = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ApiError::Status {
            status: status.as_u16(),
            error: body.error,
            message: body.message,
        },
        Err(_) => ApiError::Status {
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or_default().to_string(),
            message: text,
        },
    };

    Err(err)
}

impl BlockfrostApi for HttpClient {
    async fn latest_epoch_parameters(&self) -> Result<EpochParams, ApiError> {
        self.get("/epochs/latest/parameters").await
    }

    async fn genesis(&self) -> Result<Genesis, ApiError> {
        self.get("/genesis").await
    }

    async fn latest_block(&self) -> Result<Block, ApiError> {
        self.get("/blocks/latest").await
    }

    async fn latest_epoch(&self) -> Result<EpochContent, ApiError> {
        self.get("/epochs/latest").await
    }

    async fn address_utxos(
        &self,
        address: &str,
        unit: Option<&str>,
        page: u32,
    ) -> Result<Vec<AddressUtxo>, ApiError> {
        let path = match unit {
            Some(unit) => format!("/addresses/{address}/utxos/{unit}?page={page}"),
            None => format!("/addresses/{address}/utxos?page={page}"),
        };

        self.get(&path).await
    }

    async fn asset_addresses(&self, unit: &str, count: u32) -> Result<Vec<AssetAddress>, ApiError> {
        self.get(&format!("/assets/{unit}/addresses?count={count}"))
            .await
    }

    async fn tx_utxos(&self, hash: &str) -> Result<TxUtxos, ApiError> {
        self.get(&format!("/txs/{hash}/utxos")).await
    }

    async fn tx(&self, hash: &str) -> Result<TxContent, ApiError> {
        self.get(&format!("/txs/{hash}")).await
    }

    async fn account(&self, stake_address: &str) -> Result<Account, ApiError> {
        self.get(&format!("/accounts/{stake_address}")).await
    }

    async fn datum_cbor(&self, hash: &str) -> Result<CborContent, ApiError> {
        self.get(&format!("/scripts/datum/{hash}/cbor")).await
    }

    async fn script(&self, hash: &str) -> Result<ScriptInfo, ApiError> {
        self.get(&format!("/scripts/{hash}")).await
    }

    async fn script_cbor(&self, hash: &str) -> Result<CborContent, ApiError> {
        self.get(&format!("/scripts/{hash}/cbor")).await
    }

    async fn script_json(&self, hash: &str) -> Result<serde_json::Value, ApiError> {
        self.get(&format!("/scripts/{hash}/json")).await
    }

    async fn submit(&self, endpoint: Option<&str>, tx: &[u8]) -> Result<String, ApiError> {
        let request = match endpoint {
            Some(url) => self.http.post(url),
            None => self.authed(self.http.post(self.url("/tx/submit"))),
        };

        debug!(endpoint = endpoint.unwrap_or("/tx/submit"), "submitting tx");

        let response = request
            .header(header::CONTENT_TYPE, CBOR_CONTENT_TYPE)
            .body(tx.to_vec())
            .send()
            .await?;

        let response = check_status(response).await?;

        Ok(response.text().await?)
    }

    async fn evaluate(&self, request: &EvalRequest) -> Result<EvalResponse, ApiError> {
        debug!(
            additional = request.additional_utxo_set.len(),
            "blockfrost evaluate request"
        );

        let response = self
            .authed(self.http.post(self.url("/utils/txs/evaluate/utxos")))
            .json(request)
            .send()
            .await?;

        let response = check_status(response).await?;

        Ok(response.json().await?)
    }
}
