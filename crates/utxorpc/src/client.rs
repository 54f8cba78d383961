use futures_util::{StreamExt as _, TryStreamExt as _};
use pallas::interop::utxorpc::spec as u5c;
use tonic::{
    metadata::{Ascii, MetadataValue},
    service::{interceptor::InterceptedService, Interceptor},
    transport::{Channel, ClientTlsConfig, Endpoint},
    Request, Status,
};
use tracing::debug;

use connector_core::{config::UtxorpcConfig, Error};

use u5c::{
    query::query_service_client::QueryServiceClient,
    submit::{any_chain_tx, submit_service_client::SubmitServiceClient, AnyChainTx},
    sync::chain_sync_service_client::ChainSyncServiceClient,
};

use crate::api::{ApiError, StageStream, UtxorpcApi};

const API_KEY_METADATA: &str = "dmtr-api-key";

/// Attaches the api key, when there is one, to every call.
#[derive(Clone, Default)]
pub struct ApiKey(Option<MetadataValue<Ascii>>);

impl ApiKey {
    pub fn new(key: Option<&str>) -> Result<Self, Error> {
        let value = key
            .map(|x| x.parse::<MetadataValue<Ascii>>())
            .transpose()
            .map_err(|e| Error::InvalidInput(format!("api key is not valid metadata: {e}")))?;

        Ok(Self(value))
    }
}

impl Interceptor for ApiKey {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        if let Some(key) = &self.0 {
            request.metadata_mut().insert(API_KEY_METADATA, key.clone());
        }

        Ok(request)
    }
}

type Authed = InterceptedService<Channel, ApiKey>;

fn raw_tx(tx: Vec<u8>) -> AnyChainTx {
    AnyChainTx {
        r#type: Some(any_chain_tx::Type::Raw(tx.into())),
    }
}

/// [`UtxorpcApi`] over a tonic channel.
///
/// The channel connects lazily, on the first call.
#[derive(Clone)]
pub struct GrpcClient {
    query: QueryServiceClient<Authed>,
    submit: SubmitServiceClient<Authed>,
    sync: ChainSyncServiceClient<Authed>,
}

impl GrpcClient {
    pub fn new(url: &str, api_key: Option<&str>) -> Result<Self, Error> {
        let mut endpoint = Endpoint::from_shared(url.to_string())
            .map_err(|e| ApiError::Endpoint(format!("{url}: {e}")))?;

        if url.starts_with("https://") {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_webpki_roots())
                .map_err(ApiError::from)?;
        }

        let channel = endpoint.connect_lazy();
        let key = ApiKey::new(api_key)?;

        Ok(Self {
            query: QueryServiceClient::with_interceptor(channel.clone(), key.clone()),
            submit: SubmitServiceClient::with_interceptor(channel.clone(), key.clone()),
            sync: ChainSyncServiceClient::with_interceptor(channel, key),
        })
    }

    pub fn from_config(config: &UtxorpcConfig) -> Result<Self, Error> {
        Self::new(&config.url, config.api_key.as_deref())
    }
}

impl UtxorpcApi for GrpcClient {
    async fn read_params(&self) -> Result<u5c::query::ReadParamsResponse, ApiError> {
        debug!("u5c read params");

        let request = u5c::query::ReadParamsRequest::default();
        let response = self.query.clone().read_params(request).await?;

        Ok(response.into_inner())
    }

    async fn search_utxos(
        &self,
        request: u5c::query::SearchUtxosRequest,
    ) -> Result<u5c::query::SearchUtxosResponse, ApiError> {
        debug!(start = %request.start_token, "u5c search utxos");

        let response = self.query.clone().search_utxos(request).await?;

        Ok(response.into_inner())
    }

    async fn read_utxos(
        &self,
        keys: Vec<u5c::query::TxoRef>,
    ) -> Result<u5c::query::ReadUtxosResponse, ApiError> {
        debug!(count = keys.len(), "u5c read utxos");

        let request = u5c::query::ReadUtxosRequest {
            keys,
            ..Default::default()
        };

        let response = self.query.clone().read_utxos(request).await?;

        Ok(response.into_inner())
    }

    async fn read_tip(&self) -> Result<u5c::sync::ReadTipResponse, ApiError> {
        debug!("u5c read tip");

        let request = u5c::sync::ReadTipRequest::default();
        let response = self.sync.clone().read_tip(request).await?;

        Ok(response.into_inner())
    }

    async fn fetch_block(
        &self,
        block: u5c::sync::BlockRef,
    ) -> Result<u5c::sync::FetchBlockResponse, ApiError> {
        debug!("u5c fetch block");

        let request = u5c::sync::FetchBlockRequest {
            r#ref: vec![block],
            ..Default::default()
        };

        let response = self.sync.clone().fetch_block(request).await?;

        Ok(response.into_inner())
    }

    async fn submit_tx(&self, tx: Vec<u8>) -> Result<u5c::submit::SubmitTxResponse, ApiError> {
        debug!(size = tx.len(), "u5c submit tx");

        let request = u5c::submit::SubmitTxRequest {
            tx: vec![raw_tx(tx)],
        };

        let response = self.submit.clone().submit_tx(request).await?;

        Ok(response.into_inner())
    }

    async fn wait_for_tx(&self, tx_hash: Vec<u8>) -> Result<StageStream, ApiError> {
        debug!(tx = hex::encode(&tx_hash), "u5c wait for tx");

        let request = u5c::submit::WaitForTxRequest {
            r#ref: vec![tx_hash.into()],
        };

        let stream = self.submit.clone().wait_for_tx(request).await?.into_inner();

        Ok(stream.map_err(ApiError::from).boxed())
    }

    async fn eval_tx(&self, tx: Vec<u8>) -> Result<u5c::submit::EvalTxResponse, ApiError> {
        debug!(size = tx.len(), "u5c eval tx");

        let request = u5c::submit::EvalTxRequest {
            tx: vec![raw_tx(tx)],
        };

        let response = self.submit.clone().eval_tx(request).await?;

        Ok(response.into_inner())
    }
}
