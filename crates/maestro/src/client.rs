use reqwest::{header, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use connector_core::{config::MaestroConfig, paging::PAGE_SIZE, Error};

use crate::{
    api::{ApiError, MaestroApi, UtxoQuery},
    types::*,
};

const API_KEY_HEADER: &str = "api-key";

/// [`MaestroApi`] over HTTP.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::ProviderInternal(format!("can't build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &MaestroConfig) -> Result<Self, Error> {
        Self::new(config.resolved_base_url()?, config.api_key.clone())
    }

    fn request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(API_KEY_HEADER, &self.api_key)
            .header(header::ACCEPT, "application/json")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        debug!(path, "maestro request");

        let url = format!("{}{}", self.base_url, path);

        let response = self.request(self.http.get(url)).query(query).send().await?;

        Ok(check_status(response).await?.json().await?)
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();

    Err(ApiError::status(status.as_u16(), message))
}

fn with_cbor() -> Vec<(&'static str, String)> {
    vec![
        ("with_cbor", "true".to_string()),
        ("resolve_datums", "true".to_string()),
    ]
}

impl MaestroApi for HttpClient {
    async fn protocol_parameters(&self) -> Result<Envelope<ProtocolParams>, ApiError> {
        self.get("/protocol-parameters", &[]).await
    }

    async fn chain_tip(&self) -> Result<Envelope<ChainTip>, ApiError> {
        self.get("/chain-tip", &[]).await
    }

    async fn current_epoch(&self) -> Result<Envelope<EpochInfo>, ApiError> {
        self.get("/epochs/current", &[]).await
    }

    async fn block(&self, hash: &str) -> Result<Envelope<BlockInfo>, ApiError> {
        self.get(&format!("/blocks/{hash}"), &[]).await
    }

    async fn address_utxos(
        &self,
        address: &str,
        query: UtxoQuery<'_>,
    ) -> Result<Envelope<Vec<Utxo>>, ApiError> {
        let mut params = with_cbor();
        params.push(("count", PAGE_SIZE.to_string()));

        if let Some(asset) = query.asset {
            params.push(("asset", asset.to_string()));
        }

        if let Some(cursor) = query.cursor {
            params.push(("cursor", cursor));
        }

        self.get(&format!("/addresses/{address}/utxos"), &params)
            .await
    }

    async fn asset_holders(&self, unit: &str, count: u32) -> Result<Envelope<Vec<AssetHolder>>, ApiError> {
        self.get(
            &format!("/assets/{unit}/addresses"),
            &[("count", count.to_string())],
        )
        .await
    }

    async fn txo(&self, hash: &str, index: u32) -> Result<Envelope<Utxo>, ApiError> {
        self.get(
            &format!("/transactions/{hash}/outputs/{index}/txo"),
            &with_cbor(),
        )
        .await
    }

    async fn tx_cbor(&self, hash: &str) -> Result<Envelope<String>, ApiError> {
        self.get(&format!("/transactions/{hash}/cbor"), &[]).await
    }

    async fn account(&self, stake_address: &str) -> Result<Envelope<AccountInfo>, ApiError> {
        self.get(&format!("/accounts/{stake_address}"), &[]).await
    }

    async fn datum(&self, hash: &str) -> Result<Envelope<DatumContent>, ApiError> {
        self.get(&format!("/datums/{hash}"), &[]).await
    }

    async fn script(&self, hash: &str) -> Result<Envelope<ScriptContent>, ApiError> {
        self.get(&format!("/scripts/{hash}"), &[]).await
    }

    async fn submit(&self, tx: &[u8]) -> Result<String, ApiError> {
        debug!(bytes = tx.len(), "submitting tx to maestro");

        let url = format!("{}/txmanager", self.base_url);

        let response = self
            .request(self.http.post(url))
            .header(header::CONTENT_TYPE, "application/cbor")
            .body(tx.to_vec())
            .send()
            .await?;

        Ok(check_status(response).await?.text().await?)
    }

    async fn evaluate(&self, request: &EvalRequest) -> Result<Vec<EvalResult>, ApiError> {
        let url = format!("{}/transactions/evaluate", self.base_url);

        let response = self
            .request(self.http.post(url))
            .json(request)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}
