//! API DTOs module
//!
//! This module contains all API data transfer objects organized by domain:
//! - `auth`: login and token refresh
//! - `favorites`: saved jobs of the signed-in candidate
//! - `notifications`: per-user notification feed

pub mod auth;
pub mod favorites;
pub mod notifications;

pub use auth::*;
pub use favorites::*;
pub use notifications::*;
