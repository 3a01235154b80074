//! Authentication-related common types

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use validator::Validate;

/// Access and refresh credentials issued together by the login endpoint
///
/// Both fields are required; a pair with an empty field fails validation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TokenPair {
    #[validate(length(min = 1))]
    pub access: String,
    #[validate(length(min = 1))]
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// Same refresh credential, new access credential
    pub fn with_access(&self, access: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: self.refresh.clone(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Account role carried in the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Candidate,
    Employer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Employer => "employer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims embedded in the access token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id). Issued as `user_id`; `sub` is accepted too.
    #[serde(
        rename = "user_id",
        alias = "sub",
        deserialize_with = "string_or_number"
    )]
    pub sub: String,
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Subject {
        Text(String),
        Number(u64),
    }

    Ok(match Subject::deserialize(deserializer)? {
        Subject::Text(text) => text,
        Subject::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_accept_numeric_user_id() {
        let claims: Claims = serde_json::from_str(
            r#"{"token_type":"access","user_id":42,"role":"employer","exp":1700000000,"email":"hr@acme.io"}"#,
        )
        .unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, Role::Employer);
        assert_eq!(claims.email.as_deref(), Some("hr@acme.io"));
    }

    #[test]
    fn test_claims_accept_sub_alias() {
        let claims: Claims =
            serde_json::from_str(r#"{"sub":"u-7","role":"candidate","exp":1}"#).unwrap();
        assert_eq!(claims.sub, "u-7");
        assert!(claims.iat.is_none());
    }

    #[test]
    fn test_claims_reject_unknown_role() {
        let result = serde_json::from_str::<Claims>(r#"{"sub":"1","role":"pirate","exp":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_token_pair_validation() {
        assert!(TokenPair::new("a", "r").validate().is_ok());
        assert!(TokenPair::new("", "r").validate().is_err());
        assert!(TokenPair::new("a", "").validate().is_err());
    }

    #[test]
    fn test_token_pair_debug_is_redacted() {
        let pair = TokenPair::new("secret-access", "secret-refresh");
        let printed = format!("{:?}", pair);
        assert!(!printed.contains("secret"));
    }
}
