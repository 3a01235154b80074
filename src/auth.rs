//! Sign-in, sign-out and session status

use chrono::{DateTime, Utc};
use jobboard_protocol::api::auth::{LoginRequest, LoginResponse};
use jobboard_protocol::Role;
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::client::ApiClient;
use crate::error::{ClientError, Result};
use crate::pipeline::OutboundRequest;
use crate::session::{IdentityClaims, SessionState};

/// Snapshot of the current session for display
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: String,
    pub subject: Option<String>,
    pub role: Option<Role>,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// The access credential is past its expiry; the next call will refresh it
    pub expired: bool,
}

impl SessionStatus {
    fn from_parts(state: SessionState, claims: Option<IdentityClaims>) -> Self {
        match claims {
            Some(claims) => Self {
                state: state.to_string(),
                expired: claims.is_expired(),
                subject: Some(claims.subject),
                role: Some(claims.role),
                email: claims.email,
                expires_at: Some(claims.expires_at),
            },
            None => Self {
                state: state.to_string(),
                subject: None,
                role: None,
                email: None,
                expires_at: None,
                expired: false,
            },
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.subject.is_some()
    }
}

/// Authentication client
#[derive(Debug, Clone)]
pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Exchange email and password for a credential pair and store it
    pub async fn login(&self, email: &str, password: &str) -> Result<IdentityClaims> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let outbound = OutboundRequest::post(self.client.config().login_path.as_str())
            .with_json(&request)?;
        let response = self.client.send_anonymous(outbound).await?;

        match response.status {
            status if status.is_success() => {}
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                return Err(ClientError::invalid_credentials(response.error_message()));
            }
            status => return Err(ClientError::api(status.as_u16(), response.error_message())),
        }

        let pair: LoginResponse = response.json()?;
        let store = self.client.store();
        store.set_credentials(pair)?;

        let claims = store
            .claims()
            .ok_or_else(|| ClientError::internal("credentials stored without claims"))?;
        info!(subject = %claims.subject, role = %claims.role, "signed in");
        Ok(claims)
    }

    pub fn logout(&self) {
        self.client.store().clear();
        info!("signed out");
    }

    pub fn status(&self) -> SessionStatus {
        let store = self.client.store();
        SessionStatus::from_parts(store.state(), store.claims())
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::tests::mocks::{CountingReauth, MockTransport};
    use crate::tests::utils::test_helpers::{
        access_token, future_access_token, memory_store, signed_in_store, test_config,
    };
    use crate::transport::RawResponse;
    use reqwest::Method;
    use serde_json::json;

    const LOGIN_PATH: &str = "/api/users/token/";

    fn service(store: Arc<crate::store::TokenStore>, transport: Arc<MockTransport>) -> AuthService {
        let client = ApiClient::with_transport(
            test_config("http://jobs.test"),
            store,
            transport,
            Arc::new(CountingReauth::default()),
        );
        AuthService::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_login_stores_pair_and_returns_claims() {
        let store = memory_store();
        let transport = Arc::new(MockTransport::new());
        let access = future_access_token("21", Role::Employer);
        transport.on_json(
            Method::POST,
            LOGIN_PATH,
            StatusCode::OK,
            json!({"access": access, "refresh": "refresh-21"}),
        );

        let auth = service(store.clone(), transport.clone());
        let claims = auth.login(" hr@acme.io ", "hunter2").await.unwrap();

        assert_eq!(claims.subject, "21");
        assert_eq!(claims.role, Role::Employer);
        assert_eq!(store.access_credential(), Some(access));
        assert_eq!(store.refresh_credential().as_deref(), Some("refresh-21"));

        let sent = transport.requests();
        assert_eq!(
            sent[0].json_body(),
            Some(&json!({"email": "hr@acme.io", "password": "hunter2"}))
        );
        assert_eq!(sent[0].bearer(), None);
    }

    #[tokio::test]
    async fn test_login_validates_before_sending() {
        let transport = Arc::new(MockTransport::new());
        let auth = service(memory_store(), transport.clone());

        assert!(auth.login("not-an-email", "pw").await.is_err());
        assert!(auth.login("a@b.io", "").await.is_err());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_login_rejected_credentials() {
        let transport = Arc::new(MockTransport::new());
        transport.on_json(
            Method::POST,
            LOGIN_PATH,
            StatusCode::UNAUTHORIZED,
            json!({"detail": "No active account found with the given credentials"}),
        );
        let store = signed_in_store("4", Role::Candidate);
        let auth = service(store.clone(), transport.clone());

        let err = auth.login("a@b.io", "wrong").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCredentials);
        assert!(err.to_string().contains("No active account"));
        // the refresh stage never ran
        assert_eq!(transport.requests().len(), 1);
        assert!(store.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_with_undecodable_access_stays_logged_out() {
        let transport = Arc::new(MockTransport::new());
        transport.on_json(
            Method::POST,
            LOGIN_PATH,
            StatusCode::OK,
            json!({"access": "opaque", "refresh": "r"}),
        );
        let store = memory_store();
        let auth = service(store.clone(), transport);

        let err = auth.login("a@b.io", "pw").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedCredential);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_status_and_logout() {
        let store = signed_in_store("8", Role::Candidate);
        let auth = service(store.clone(), Arc::new(MockTransport::new()));

        let status = auth.status();
        assert!(status.is_authenticated());
        assert_eq!(status.state, "authenticated");
        assert_eq!(status.subject.as_deref(), Some("8"));
        assert_eq!(status.role, Some(Role::Candidate));
        assert_eq!(status.email.as_deref(), Some("user8@jobs.test"));
        assert!(!status.expired);

        auth.logout();
        let status = auth.status();
        assert!(!status.is_authenticated());
        assert_eq!(status.state, "logged out");
        assert!(store.credentials().is_none());
    }

    #[test]
    fn test_status_reports_expired_access() {
        let store = memory_store();
        store
            .set_credentials(jobboard_protocol::TokenPair::new(
                access_token("8", Role::Candidate, 1_000),
                "refresh-8",
            ))
            .unwrap();
        let auth = service(store, Arc::new(MockTransport::new()));

        let status = auth.status();
        assert!(status.is_authenticated());
        assert!(status.expired);
    }
}
