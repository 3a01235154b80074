//! JobBoard client
//!
//! Session handling for the JobBoard REST API: a durable [`TokenStore`] for
//! the access/refresh credential pair and an [`ApiClient`] whose request
//! pipeline attaches the bearer credential and transparently refreshes it
//! once when the API answers `401`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use jobboard::{ApiClient, AuthService, ClientConfig, LoginRedirect, TokenStore};
//!
//! # async fn run() -> jobboard::Result<()> {
//! let config = ClientConfig::load()?;
//! let store = Arc::new(TokenStore::from_config(&config.storage));
//! store.initialize();
//!
//! let redirect = Arc::new(LoginRedirect::new(config.login_entry_point.clone()));
//! let client = Arc::new(ApiClient::new(config, store, redirect)?);
//!
//! let auth = AuthService::new(client.clone());
//! auth.login("candidate@example.com", "secret").await?;
//! let favorites: serde_json::Value = client.get("/api/jobs/favorites/").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod favorites;
pub mod guard;
pub mod notifications;
pub mod pipeline;
pub mod reauth;
pub mod refresh;
pub mod scoped;
pub mod session;
pub mod storage;
pub mod store;
pub mod transport;
pub mod version;


pub use auth::{AuthService, SessionStatus};
pub use client::ApiClient;
pub use config::{ClientConfig, ClientConfigBuilder, StorageConfig};
pub use error::{ClientError, ErrorCode, Result};
pub use favorites::FavoriteJobs;
pub use guard::{Guard, GuardDecision};
pub use notifications::NotificationCenter;
pub use pipeline::{
    MultipartPayload, OutboundRequest, Pipeline, RequestBody, RequestStage, ResponseStage,
};
pub use reauth::{LoginRedirect, ReauthHandler};
pub use session::{IdentityClaims, SessionState};
pub use store::TokenStore;
pub use transport::{RawResponse, ReqwestTransport, Transport};

pub use jobboard_protocol::{Role, TokenPair};
