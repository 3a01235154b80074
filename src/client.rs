//! Authenticated HTTP client for the JobBoard API

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::pipeline::{
    BearerAuth, ContentNegotiation, MultipartPayload, OutboundRequest, Pipeline, RequestBody,
};
use crate::reauth::ReauthHandler;
use crate::refresh::RefreshOnUnauthorized;
use crate::store::TokenStore;
use crate::transport::{RawResponse, ReqwestTransport, Transport};

/// HTTP client with session support
///
/// Every call goes through the authenticated pipeline: bearer attachment,
/// content negotiation, then refresh-and-replay on `401`.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    store: Arc<TokenStore>,
    transport: Arc<dyn Transport>,
    pipeline: Pipeline,
    anonymous: Pipeline,
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        store: Arc<TokenStore>,
        reauth: Arc<dyn ReauthHandler>,
    ) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config.clone())?);
        Ok(Self::with_transport(config, store, transport, reauth))
    }

    pub fn with_transport(
        config: ClientConfig,
        store: Arc<TokenStore>,
        transport: Arc<dyn Transport>,
        reauth: Arc<dyn ReauthHandler>,
    ) -> Self {
        let pipeline = Pipeline::new()
            .with_request_stage(BearerAuth::new(store.clone()))
            .with_request_stage(ContentNegotiation)
            .with_response_stage(RefreshOnUnauthorized::new(
                store.clone(),
                transport.clone(),
                reauth,
                config.refresh_path.clone(),
            ));
        Self::with_pipeline(config, store, transport, pipeline)
    }

    /// Use a custom pipeline for authenticated calls
    pub fn with_pipeline(
        config: ClientConfig,
        store: Arc<TokenStore>,
        transport: Arc<dyn Transport>,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            config,
            store,
            transport,
            pipeline,
            anonymous: Pipeline::new().with_request_stage(ContentNegotiation),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Send through the authenticated pipeline and return the raw response
    pub async fn send(&self, request: OutboundRequest) -> Result<RawResponse> {
        self.pipeline.execute(self.transport.as_ref(), request).await
    }

    /// Send without a bearer and without refresh handling (login and other public endpoints)
    pub async fn send_anonymous(&self, request: OutboundRequest) -> Result<RawResponse> {
        self.anonymous.execute(self.transport.as_ref(), request).await
    }

    pub async fn request<R>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        headers: HeaderMap,
    ) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let request = OutboundRequest::new(method, path)
            .with_headers(headers)
            .with_body(body);
        let response = self.send(request).await?;
        Self::into_result(response)
    }

    /// Map a final response to the caller's type or a typed failure
    pub fn into_result<R: DeserializeOwned>(response: RawResponse) -> Result<R> {
        match response.status {
            status if status.is_success() => response.json(),
            StatusCode::UNAUTHORIZED => Err(ClientError::token_expired(response.error_message())),
            StatusCode::FORBIDDEN => Err(ClientError::authorization(response.error_message())),
            status => Err(ClientError::api(status.as_u16(), response.error_message())),
        }
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.request(Method::GET, path, RequestBody::Empty, HeaderMap::new())
            .await
    }

    pub async fn post_json<T, R>(&self, path: &str, payload: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::POST, path, RequestBody::json(payload)?, HeaderMap::new())
            .await
    }

    pub async fn patch_json<T, R>(&self, path: &str, payload: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::PATCH, path, RequestBody::json(payload)?, HeaderMap::new())
            .await
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.request(Method::DELETE, path, RequestBody::Empty, HeaderMap::new())
            .await
    }

    pub async fn post_multipart<R: DeserializeOwned>(
        &self,
        path: &str,
        payload: MultipartPayload,
    ) -> Result<R> {
        self.request(
            Method::POST,
            path,
            RequestBody::Multipart(payload),
            HeaderMap::new(),
        )
        .await
    }

    pub async fn patch_multipart<R: DeserializeOwned>(
        &self,
        path: &str,
        payload: MultipartPayload,
    ) -> Result<R> {
        self.request(
            Method::PATCH,
            path,
            RequestBody::Multipart(payload),
            HeaderMap::new(),
        )
        .await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("store", &self.store)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
