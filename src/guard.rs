//! Access checks for screens that need a session or a specific role

use jobboard_protocol::Role;

use crate::store::TokenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Any signed-in user
    Authenticated,
    /// Signed in with exactly this role
    Role(Role),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectToLogin,
    /// Signed in, but not allowed here
    RedirectHome,
}

impl Guard {
    pub fn check(&self, store: &TokenStore) -> GuardDecision {
        let Some(claims) = store.claims() else {
            return GuardDecision::RedirectToLogin;
        };
        match self {
            Guard::Authenticated => GuardDecision::Allow,
            Guard::Role(role) if claims.has_role(*role) => GuardDecision::Allow,
            Guard::Role(_) => GuardDecision::RedirectHome,
        }
    }
}
