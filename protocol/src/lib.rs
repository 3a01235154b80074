//! Wire types for the JobBoard REST API
//!
//! - `common`: types shared across endpoints (credential pair, claims, roles, error bodies)
//! - `api`: request and response DTOs grouped by endpoint family

pub mod api;
pub mod common;

pub use common::*;
