//! HTTP transport used by the request pipeline

use async_trait::async_trait;
use jobboard_protocol::ErrorBody;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::trace;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::pipeline::{OutboundRequest, RequestBody};

/// Response with the body fully read
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn json_value(status: StatusCode, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body; an empty body reads as JSON `null`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_str("null").map_err(|_| {
                ClientError::invalid_response(format!(
                    "Empty response body (status {})",
                    self.status.as_u16()
                ))
            });
        }
        serde_json::from_slice(&self.body).map_err(|e| {
            ClientError::invalid_response(format!(
                "Invalid API response ({}): {}",
                e,
                truncate(&self.text(), 200)
            ))
        })
    }

    /// Human readable failure reason: the API's `detail`, else the raw body,
    /// else the status reason phrase
    pub fn error_message(&self) -> String {
        if let Ok(body) = serde_json::from_slice::<ErrorBody>(&self.body) {
            if let Some(detail) = body.message() {
                return detail.to_string();
            }
        }
        let text = self.text();
        if !text.trim().is_empty() {
            return truncate(text.trim(), 200);
        }
        self.status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

/// Sends a fully prepared request. Implementations must not alter headers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut client_builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(crate::version::user_agent());

        if !config.use_proxy {
            client_builder = client_builder.no_proxy();
        }

        let client = client_builder.build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse> {
        let url = self.config.endpoint_url(&request.path);

        let mut request_builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());

        request_builder = match &request.body {
            RequestBody::Empty => request_builder,
            RequestBody::Json(value) => request_builder.body(serde_json::to_vec(value)?),
            RequestBody::Multipart(payload) => request_builder.multipart(payload.to_form()?),
        };

        let response = request_builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        trace!(method = %request.method, url = %url, status = status.as_u16(), "response received");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
