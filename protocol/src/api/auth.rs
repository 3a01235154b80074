//! Authentication API DTOs
//!
//! Login and token refresh request/response bodies.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

pub use crate::common::{Claims, TokenPair};

// ============================================================================
// Login DTOs
// ============================================================================

/// Email/password login request
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login response: the credential pair (extra user fields are ignored)
pub type LoginResponse = TokenPair;

// ============================================================================
// Token Refresh DTOs
// ============================================================================

/// Refresh access token request
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1))]
    pub refresh: String,
}

impl fmt::Debug for RefreshTokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTokenRequest")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Refresh response: a new access credential only
#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub access: String,
}

impl fmt::Debug for RefreshTokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTokenResponse")
            .field("access", &"<redacted>")
            .finish()
    }
}
