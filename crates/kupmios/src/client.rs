use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use reqwest::{header, Response};
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use tracing::debug;

use connector_core::Error;

use crate::{
    api::{ApiError, KupoApi, OgmiosApi},
    patterns::{MatchFilter, Pattern},
    types::*,
};

fn build_http() -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| Error::ProviderInternal(format!("can't build http client: {e}")))
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();

    Err(ApiError::status(status.as_u16(), message))
}

/// [`KupoApi`] over HTTP.
#[derive(Clone)]
pub struct KupoClient {
    http: reqwest::Client,
    base_url: String,
}

impl KupoClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            http: build_http()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(path, "kupo request");

        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

impl KupoApi for KupoClient {
    async fn matches(&self, pattern: &Pattern, filter: &MatchFilter) -> Result<Vec<Match>, ApiError> {
        let query = filter.to_query();

        let path = match query.is_empty() {
            true => format!("/matches/{pattern}"),
            false => format!("/matches/{pattern}?{query}"),
        };

        self.get(&path).await
    }

    async fn datum(&self, hash: &str) -> Result<Option<KupoDatum>, ApiError> {
        self.get(&format!("/datums/{hash}")).await
    }

    async fn script(&self, hash: &str) -> Result<Option<KupoScript>, ApiError> {
        self.get(&format!("/scripts/{hash}")).await
    }
}

/// [`OgmiosApi`] as JSON-RPC requests over HTTP.
#[derive(Clone)]
pub struct OgmiosClient {
    http: reqwest::Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

impl OgmiosClient {
    pub fn new(url: impl Into<String>) -> Result<Self, Error> {
        let url = url.into();

        // ogmios answers JSON-RPC over plain http on the same port as its
        // websocket
        let url = match url.split_once("://") {
            Some(("ws", rest)) => format!("http://{rest}"),
            Some(("wss", rest)) => format!("https://{rest}"),
            _ => url,
        };

        Ok(Self {
            http: build_http()?,
            url,
            next_id: Default::default(),
        })
    }
}

impl OgmiosApi for OgmiosClient {
    async fn call(&self, method: &str, params: Option<Json>) -> Result<Json, ApiError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        debug!(method, id, "ogmios request");

        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        let response = self.http.post(&self.url).json(&request).send().await?;

        // ogmios reports rpc failures with a non-2xx status and a regular
        // json-rpc body, so the body is read before the status
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<RpcResponse<Json>>(&body) {
            Ok(RpcResponse {
                error: Some(error), ..
            }) => Err(error.into()),
            Ok(RpcResponse {
                result: Some(result),
                ..
            }) => Ok(result),
            _ if !status.is_success() => Err(ApiError::status(status.as_u16(), body)),
            Ok(_) => Ok(Json::Null),
            Err(e) => Err(ApiError::Body(format!("{method}: {e}"))),
        }
    }
}
