//! Re-authentication hook invoked when a session cannot be recovered

use parking_lot::Mutex;
use tracing::warn;

/// Called once per failed refresh, after the token store has been cleared
pub trait ReauthHandler: Send + Sync {
    fn reauthenticate(&self, reason: &str);
}

/// Records that the user has to go back through the login entry point.
///
/// The CLI checks [`LoginRedirect::take_pending`] after a command fails and
/// prints the instruction instead of a bare authentication error.
#[derive(Debug)]
pub struct LoginRedirect {
    entry_point: String,
    pending: Mutex<Option<String>>,
}

impl LoginRedirect {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            pending: Mutex::new(None),
        }
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Reason of the last redirect, clearing it
    pub fn take_pending(&self) -> Option<String> {
        self.pending.lock().take()
    }
}

impl ReauthHandler for LoginRedirect {
    fn reauthenticate(&self, reason: &str) {
        warn!(entry_point = %self.entry_point, reason, "session ended, redirecting to login");
        *self.pending.lock() = Some(reason.to_string());
    }
}
