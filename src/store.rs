//! Token storage for the JobBoard client
//!
//! `TokenStore` is the only writer of the credential pair, both in memory and
//! in the durable slot. Everything else reads through it and listens for
//! [`SessionState`] changes via [`TokenStore::subscribe`].

use jobboard_protocol::TokenPair;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::config::StorageConfig;
use crate::error::{ClientError, ErrorCode, Result};
use crate::session::{IdentityClaims, SessionState};
use crate::storage::{FileSlotStorage, MemorySlotStorage, SlotStorage};

/// Name of the durable slot holding `{"access": ..., "refresh": ...}`
pub const CREDENTIALS_SLOT: &str = "authTokens";

#[derive(Default)]
struct Credentials {
    pair: Option<TokenPair>,
    claims: Option<IdentityClaims>,
}

/// Token storage manager
pub struct TokenStore {
    storage: Arc<dyn SlotStorage>,
    slot: String,
    current: RwLock<Credentials>,
    state: watch::Sender<SessionState>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn SlotStorage>) -> Self {
        Self::with_slot(storage, CREDENTIALS_SLOT)
    }

    pub fn with_slot(storage: Arc<dyn SlotStorage>, slot: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SessionState::LoggedOut);
        Self {
            storage,
            slot: slot.into(),
            current: RwLock::new(Credentials::default()),
            state,
        }
    }

    /// File-backed store when persistence is enabled, in-memory otherwise
    pub fn from_config(config: &StorageConfig) -> Self {
        if config.persistent {
            Self::new(Arc::new(FileSlotStorage::new(config.resolved_dir())))
        } else {
            Self::new(Arc::new(MemorySlotStorage::new()))
        }
    }

    /// Restore the pair saved by a previous process.
    ///
    /// Anything in the slot that is not a complete, decodable pair is removed
    /// and the store starts logged out. Never fails.
    pub fn initialize(&self) -> Option<TokenPair> {
        let mut current = self.current.write();

        let parsed = self
            .storage
            .read(&self.slot)
            .and_then(|raw| raw.map(|raw| Self::parse_stored(&raw)).transpose());

        match parsed {
            Ok(Some((pair, claims))) => {
                debug!(subject = %claims.subject, role = %claims.role, "restored session");
                current.pair = Some(pair.clone());
                current.claims = Some(claims);
                self.publish(SessionState::Authenticated);
                Some(pair)
            }
            Ok(None) => {
                debug!("no stored credentials");
                self.reset_locked(&mut current);
                None
            }
            Err(e) if e.code() == ErrorCode::StorageCorrupt => {
                warn!(error = %e, "discarding stored credentials");
                if let Err(e) = self.storage.remove(&self.slot) {
                    warn!(error = %e, "failed to remove corrupt credential slot");
                }
                self.reset_locked(&mut current);
                None
            }
            Err(e) => {
                warn!(error = %e, "stored credentials could not be read, starting logged out");
                self.reset_locked(&mut current);
                None
            }
        }
    }

    fn parse_stored(raw: &str) -> Result<(TokenPair, IdentityClaims)> {
        let pair: TokenPair = serde_json::from_str(raw)
            .map_err(|e| ClientError::storage_corrupt(format!("not a credential pair: {}", e)))?;
        pair.validate()
            .map_err(|_| ClientError::storage_corrupt("credential pair has empty fields"))?;
        let claims = IdentityClaims::decode(&pair.access)
            .map_err(|e| ClientError::storage_corrupt(e.to_string()))?;
        Ok((pair, claims))
    }

    /// Replace the current pair and persist it.
    ///
    /// An access credential whose claims cannot be decoded logs the session
    /// out and returns the decode error.
    pub fn set_credentials(&self, pair: TokenPair) -> Result<()> {
        if pair.validate().is_err() {
            return Err(ClientError::invalid_credentials(
                "access and refresh credentials must both be non-empty",
            ));
        }

        let claims = match IdentityClaims::decode(&pair.access) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "received an undecodable access credential, logging out");
                self.clear();
                return Err(e);
            }
        };

        let serialized = serde_json::to_string(&pair)?;

        let mut current = self.current.write();
        self.storage.write(&self.slot, &serialized)?;
        debug!(subject = %claims.subject, expires_at = %claims.expires_at, "credentials updated");
        current.pair = Some(pair);
        current.claims = Some(claims);
        self.publish(SessionState::Authenticated);
        Ok(())
    }

    /// Forget the pair in memory and on disk.
    pub fn clear(&self) {
        let mut current = self.current.write();
        if let Err(e) = self.storage.remove(&self.slot) {
            warn!(error = %e, "failed to remove credential slot");
        }
        if current.pair.is_some() {
            info!("session cleared");
        }
        self.reset_locked(&mut current);
    }

    /// Mark a refresh as in flight. Only meaningful while authenticated.
    pub fn begin_refresh(&self) {
        let _current = self.current.read();
        self.state.send_if_modified(|state| {
            if *state == SessionState::Authenticated {
                *state = SessionState::Refreshing;
                true
            } else {
                false
            }
        });
    }

    pub fn access_credential(&self) -> Option<String> {
        self.current.read().pair.as_ref().map(|p| p.access.clone())
    }

    pub fn refresh_credential(&self) -> Option<String> {
        self.current.read().pair.as_ref().map(|p| p.refresh.clone())
    }

    pub fn credentials(&self) -> Option<TokenPair> {
        self.current.read().pair.clone()
    }

    pub fn claims(&self) -> Option<IdentityClaims> {
        self.current.read().claims.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        let current = self.current.read();
        current.pair.is_some() && current.claims.is_some()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition from now on
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn reset_locked(&self, current: &mut Credentials) {
        current.pair = None;
        current.claims = None;
        self.publish(SessionState::LoggedOut);
    }

    fn publish(&self, next: SessionState) {
        self.state.send_if_modified(|state| {
            if *state != next {
                *state = next;
                true
            } else {
                false
            }
        });
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("storage", &self.storage)
            .field("slot", &self.slot)
            .field("state", &self.state())
            .finish()
    }
}
