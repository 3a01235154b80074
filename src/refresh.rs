//! Refresh-on-401 response stage
//!
//! A `401` on a request that has not been replayed yet triggers one refresh
//! of the access credential followed by a single replay. Refreshes are
//! serialised: a request that was waiting behind another request's refresh
//! finds the access credential already rotated and replays straight away.
//! If the refresh itself fails the session is cleared and the
//! [`ReauthHandler`] is told exactly once.

use async_trait::async_trait;
use jobboard_protocol::api::auth::{RefreshTokenRequest, RefreshTokenResponse};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::pipeline::{Dispatch, OutboundRequest, ResponseStage, JSON_CONTENT_TYPE};
use crate::reauth::ReauthHandler;
use crate::store::TokenStore;
use crate::transport::{RawResponse, Transport};

pub struct RefreshOnUnauthorized {
    store: Arc<TokenStore>,
    transport: Arc<dyn Transport>,
    reauth: Arc<dyn ReauthHandler>,
    refresh_path: String,
    gate: Mutex<()>,
}

impl RefreshOnUnauthorized {
    pub fn new(
        store: Arc<TokenStore>,
        transport: Arc<dyn Transport>,
        reauth: Arc<dyn ReauthHandler>,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            reauth,
            refresh_path: refresh_path.into(),
            gate: Mutex::new(()),
        }
    }

    /// Exchange the refresh credential for a new access credential.
    /// Sent directly on the transport: no bearer, no response stages.
    async fn request_access(&self, refresh: &str) -> Result<String> {
        let request = OutboundRequest::post(self.refresh_path.as_str())
            .with_json(&RefreshTokenRequest {
                refresh: refresh.to_string(),
            })?
            .with_header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(ClientError::refresh_failed(format!(
                "refresh rejected ({}): {}",
                response.status.as_u16(),
                response.error_message()
            )));
        }

        let body: RefreshTokenResponse = response.json().map_err(|e| {
            ClientError::refresh_failed_with_source("refresh response was not understood", e)
        })?;
        if body.access.trim().is_empty() {
            return Err(ClientError::refresh_failed(
                "refresh response carried an empty access credential",
            ));
        }
        Ok(body.access)
    }

    fn end_session(&self, err: ClientError) -> ClientError {
        warn!(error = %err, "could not refresh the session, signing out");
        self.store.clear();
        self.reauth.reauthenticate("Your session has expired. Please sign in again.");
        if err.is_refresh_failure() {
            err
        } else {
            ClientError::refresh_failed_with_source("could not refresh the session", err)
        }
    }
}

#[async_trait]
impl ResponseStage for RefreshOnUnauthorized {
    fn name(&self) -> &'static str {
        "refresh-on-unauthorized"
    }

    async fn handle(
        &self,
        request: &mut OutboundRequest,
        response: RawResponse,
        dispatch: &dyn Dispatch,
    ) -> Result<RawResponse> {
        if response.status != StatusCode::UNAUTHORIZED || request.is_retried() {
            return Ok(response);
        }
        request.mark_retried();
        let sent_with = request.bearer().map(str::to_string);

        let gate = self.gate.lock().await;

        let Some(held) = self.store.credentials() else {
            debug!(path = %request.path, "401 without a refresh credential");
            return Ok(response);
        };

        if Some(held.access.as_str()) != sent_with.as_deref() {
            drop(gate);
            debug!(path = %request.path, "access credential already rotated, replaying");
            return dispatch.dispatch(request).await;
        }

        self.store.begin_refresh();
        let pair = match self.request_access(&held.refresh).await {
            Ok(access) => held.with_access(access),
            Err(e) => return Err(self.end_session(e)),
        };
        if let Err(e) = self.store.set_credentials(pair) {
            return Err(self.end_session(e));
        }
        drop(gate);

        info!(path = %request.path, "access credential refreshed, replaying request");
        dispatch.dispatch(request).await
    }
}
