//! Test utilities and helpers for unit tests
//!
//! This module provides common testing utilities including:
//! - Unsigned access credentials with chosen claims
//! - Token stores that are already signed in
//! - Client configuration pointing at a mock server

#[cfg(test)]
pub mod test_helpers {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::Utc;
    use jobboard_protocol::{Role, TokenPair};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use crate::config::{ClientConfig, StorageConfig};
    use crate::storage::MemorySlotStorage;
    use crate::store::TokenStore;

    static NEXT_JTI: AtomicU64 = AtomicU64::new(1);

    /// Three-segment token whose payload is `payload_json`; the signature is a placeholder
    pub fn access_token_from_json(payload_json: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload_json);
        format!("{}.{}.c2lnbmF0dXJl", header, payload)
    }

    /// Access token for `subject`; every call yields a distinct string
    pub fn access_token(subject: &str, role: Role, exp: i64) -> String {
        let jti = NEXT_JTI.fetch_add(1, Ordering::SeqCst);
        let payload = serde_json::json!({
            "token_type": "access",
            "user_id": subject,
            "role": role.as_str(),
            "email": format!("user{}@jobs.test", subject),
            "exp": exp,
            "iat": Utc::now().timestamp(),
            "jti": format!("jti-{}", jti),
        });
        access_token_from_json(&payload.to_string())
    }

    /// Access token valid for another hour
    pub fn future_access_token(subject: &str, role: Role) -> String {
        access_token(subject, role, Utc::now().timestamp() + 3600)
    }

    pub fn memory_store() -> Arc<TokenStore> {
        Arc::new(TokenStore::new(Arc::new(MemorySlotStorage::new())))
    }

    /// In-memory store holding a fresh pair for `subject`
    pub fn signed_in_store(subject: &str, role: Role) -> Arc<TokenStore> {
        let store = memory_store();
        store
            .set_credentials(TokenPair::new(
                future_access_token(subject, role),
                format!("refresh-{}", subject),
            ))
            .expect("Failed to sign in test store");
        store
    }

    /// Non-persistent config for a server at `base_url`
    pub fn test_config(base_url: &str) -> ClientConfig {
        ClientConfig {
            base_url: base_url.to_string(),
            timeout: 5,
            use_proxy: false,
            storage: StorageConfig {
                persistent: false,
                storage_dir: None,
            },
            ..ClientConfig::default()
        }
    }
}
