//! Session state and identity claims derived from the access credential

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use jobboard_protocol::{Claims, Role};
use std::fmt;

use crate::error::{ClientError, Result};

/// Coarse session state published by the token store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Authenticated,
    /// A 401 triggered a refresh that has not completed yet
    Refreshing,
}

impl SessionState {
    /// `Refreshing` still counts as signed in: the pair is present
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, SessionState::LoggedOut)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionState::LoggedOut => "logged out",
            SessionState::Authenticated => "authenticated",
            SessionState::Refreshing => "refreshing",
        };
        f.write_str(text)
    }
}

/// Identity decoded from the access credential's payload
///
/// The signature is not checked here; the API verifies every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub subject: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub email: Option<String>,
}

impl IdentityClaims {
    pub fn decode(access: &str) -> Result<Self> {
        let mut segments = access.split('.');
        let payload = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(header), Some(payload), Some(_signature), None)
                if !header.is_empty() && !payload.is_empty() =>
            {
                payload
            }
            _ => {
                return Err(ClientError::malformed_credential(
                    "access credential is not a three-segment token",
                ))
            }
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| {
                ClientError::malformed_credential(format!("payload is not base64url: {}", e))
            })?;

        let claims: Claims = serde_json::from_slice(&bytes).map_err(|e| {
            ClientError::malformed_credential(format!("payload is not a claims object: {}", e))
        })?;

        Self::from_claims(claims)
    }

    fn from_claims(claims: Claims) -> Result<Self> {
        if claims.sub.trim().is_empty() {
            return Err(ClientError::malformed_credential("empty subject claim"));
        }

        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or_else(|| {
            ClientError::malformed_credential(format!("exp out of range: {}", claims.exp))
        })?;
        let issued_at = claims.iat.and_then(|iat| DateTime::from_timestamp(iat, 0));

        Ok(Self {
            subject: claims.sub,
            role: claims.role,
            expires_at,
            issued_at,
            email: claims.email,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::test_helpers::{access_token, access_token_from_json};
    use chrono::Duration;

    #[test]
    fn test_decode_valid_token() {
        let exp = Utc::now() + Duration::minutes(5);
        let token = access_token("17", Role::Employer, exp.timestamp());

        let claims = IdentityClaims::decode(&token).unwrap();
        assert_eq!(claims.subject, "17");
        assert!(claims.has_role(Role::Employer));
        assert_eq!(claims.expires_at.timestamp(), exp.timestamp());
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_decode_expired_token_still_decodes() {
        let token = access_token("17", Role::Candidate, 1_000);
        let claims = IdentityClaims::decode(&token).unwrap();
        assert!(claims.is_expired());
    }

    #[test]
    fn test_decode_tolerates_padding() {
        let token = access_token_from_json(r#"{"user_id":3,"role":"admin","exp":4102444800}"#);
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        while parts[1].len() % 4 != 0 {
            parts[1].push('=');
        }
        let claims = IdentityClaims::decode(&parts.join(".")).unwrap();
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        for bad in ["", "abc", "a.b", "a.b.c.d", "a.!!!.c", ".eyJ9.sig"] {
            let err = IdentityClaims::decode(bad).unwrap_err();
            assert_eq!(err.code(), crate::error::ErrorCode::MalformedCredential, "{bad}");
        }
    }

    #[test]
    fn test_decode_rejects_missing_role() {
        let token = access_token_from_json(r#"{"user_id":3,"exp":4102444800}"#);
        assert!(IdentityClaims::decode(&token).is_err());
    }

    #[test]
    fn test_decode_rejects_empty_subject() {
        let token = access_token_from_json(r#"{"sub":"  ","role":"candidate","exp":4102444800}"#);
        assert!(IdentityClaims::decode(&token).is_err());
    }

    #[test]
    fn test_session_state_authenticated() {
        assert!(!SessionState::LoggedOut.is_authenticated());
        assert!(SessionState::Authenticated.is_authenticated());
        assert!(SessionState::Refreshing.is_authenticated());
    }
}
