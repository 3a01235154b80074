//! Unified error handling for the JobBoard client and CLI
//!
//! Every error carries an [`ErrorCode`] so failures can be told apart without
//! matching on message text:
//! - J1XX: Authentication, session and authorization errors
//! - J2XX: Network and API errors
//! - J3XX: Credential storage errors
//! - J4XX: Configuration errors
//! - J5XX: Validation and input errors
//! - J8XX: UI and interaction errors
//! - J9XX: Internal errors

use std::fmt;
use thiserror::Error;

/// Unified Result type for all JobBoard client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (J1XX)
    /// J101: Authentication failed
    AuthenticationFailed,
    /// J102: Authorization denied
    AuthorizationDenied,
    /// J103: Access credential rejected by the API (401)
    TokenExpired,
    /// J104: Refresh endpoint rejected the refresh credential
    RefreshFailed,
    /// J105: Access credential could not be decoded
    MalformedCredential,
    /// J106: Credential pair with missing fields
    InvalidCredentials,
    /// J107: Operation requires a signed-in session
    NotAuthenticated,

    // Network (J2XX)
    /// J201: HTTP request failed
    HttpError,
    /// J202: Connection timeout
    ConnectionTimeout,
    /// J203: Connection refused
    ConnectionRefused,
    /// J204: API returned error response
    ApiError,
    /// J205: Invalid API response format
    InvalidResponse,

    // Storage (J3XX)
    /// J301: Stored credentials are unreadable
    StorageCorrupt,
    /// J302: Storage read error
    StorageReadError,
    /// J303: Storage write error
    StorageWriteError,

    // Configuration (J4XX)
    /// J401: Configuration error
    ConfigError,
    /// J402: Invalid endpoint URL
    InvalidEndpoint,

    // Validation (J5XX)
    /// J501: Invalid input
    InvalidInput,
    /// J502: Validation failed
    ValidationFailed,

    // UI (J8XX)
    /// J801: Dialog error
    DialogError,

    // Internal (J9XX)
    /// J901: Internal error
    InternalError,
    /// J902: Serialization error
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::AuthenticationFailed => 101,
            ErrorCode::AuthorizationDenied => 102,
            ErrorCode::TokenExpired => 103,
            ErrorCode::RefreshFailed => 104,
            ErrorCode::MalformedCredential => 105,
            ErrorCode::InvalidCredentials => 106,
            ErrorCode::NotAuthenticated => 107,

            ErrorCode::HttpError => 201,
            ErrorCode::ConnectionTimeout => 202,
            ErrorCode::ConnectionRefused => 203,
            ErrorCode::ApiError => 204,
            ErrorCode::InvalidResponse => 205,

            ErrorCode::StorageCorrupt => 301,
            ErrorCode::StorageReadError => 302,
            ErrorCode::StorageWriteError => 303,

            ErrorCode::ConfigError => 401,
            ErrorCode::InvalidEndpoint => 402,

            ErrorCode::InvalidInput => 501,
            ErrorCode::ValidationFailed => 502,

            ErrorCode::DialogError => 801,

            ErrorCode::InternalError => 901,
            ErrorCode::SerializationError => 902,
        }
    }

    /// Get the string code (e.g., "J101")
    pub fn as_str(&self) -> String {
        format!("J{}", self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "J{}", self.code())
    }
}

/// Main error type for all JobBoard client operations
#[derive(Error, Debug)]
pub enum ClientError {
    // ==================== Authentication Errors (J1XX) ====================
    #[error("[{code}] Authentication failed: {message}")]
    Authentication {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[{code}] Authorization denied: {message}")]
    Authorization { code: ErrorCode, message: String },

    // ==================== Network Errors (J2XX) ====================
    #[error("[{code}] Network error: {message}")]
    Network {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("[{code}] API error ({status}): {message}")]
    Api {
        code: ErrorCode,
        status: u16,
        message: String,
    },

    // ==================== Storage Errors (J3XX) ====================
    #[error("[{code}] {context}: {message}")]
    Storage {
        code: ErrorCode,
        context: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // ==================== Configuration Errors (J4XX) ====================
    #[error("[{code}] Configuration error: {message}")]
    Config {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<config::ConfigError>,
    },

    // ==================== Validation Errors (J5XX) ====================
    #[error("[{code}] Validation error: {message}")]
    Validation {
        code: ErrorCode,
        message: String,
        field: Option<String>,
    },

    #[error("[{code}] Invalid input: {message}")]
    InvalidInput { code: ErrorCode, message: String },

    // ==================== UI Errors (J8XX) ====================
    #[error("[{code}] UI error: {message}")]
    Ui { code: ErrorCode, message: String },

    // ==================== Internal Errors (J9XX) ====================
    #[error("[{code}] Internal error: {message}")]
    Internal { code: ErrorCode, message: String },

    #[error("[{code}] Serialization error: {message}")]
    Serialization {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("[J202] Operation timed out")]
    Timeout,
}

// ==================== Constructor Methods ====================

impl ClientError {
    // --- Authentication ---

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::AuthenticationFailed,
            message: message.into(),
            source: None,
        }
    }

    /// 401 from the API that was not (or could not be) recovered by a refresh
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::TokenExpired,
            message: message.into(),
            source: None,
        }
    }

    pub fn refresh_failed(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::RefreshFailed,
            message: message.into(),
            source: None,
        }
    }

    pub fn refresh_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Authentication {
            code: ErrorCode::RefreshFailed,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn malformed_credential(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::MalformedCredential,
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::InvalidCredentials,
            message: message.into(),
            source: None,
        }
    }

    pub fn not_authenticated() -> Self {
        Self::Authentication {
            code: ErrorCode::NotAuthenticated,
            message: "Not signed in. Run `jobboard login` first.".to_string(),
            source: None,
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            code: ErrorCode::AuthorizationDenied,
            message: message.into(),
        }
    }

    // --- Network ---

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            code: ErrorCode::HttpError,
            message: message.into(),
            source: None,
        }
    }

    pub fn network_from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }

        let code = if err.is_connect() {
            ErrorCode::ConnectionRefused
        } else {
            ErrorCode::HttpError
        };

        Self::Network {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::ApiError,
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::InvalidResponse,
            status: 0,
            message: message.into(),
        }
    }

    // --- Storage ---

    pub fn storage(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            code: ErrorCode::StorageReadError,
            context: context.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_from_error(context: impl Into<String>, err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::WriteZero => {
                ErrorCode::StorageWriteError
            }
            _ => ErrorCode::StorageReadError,
        };

        Self::Storage {
            code,
            context: context.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    pub fn storage_write(context: impl Into<String>, err: std::io::Error) -> Self {
        Self::Storage {
            code: ErrorCode::StorageWriteError,
            context: context.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    pub fn storage_corrupt(message: impl Into<String>) -> Self {
        Self::Storage {
            code: ErrorCode::StorageCorrupt,
            context: "Stored credentials are unreadable".to_string(),
            message: message.into(),
            source: None,
        }
    }

    // --- Configuration ---

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: message.into(),
            source: None,
        }
    }

    pub fn config_from_error(err: config::ConfigError) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: err.to_string(),
            source: Some(err),
        }
    }

    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::InvalidEndpoint,
            message: message.into(),
            source: None,
        }
    }

    // --- Validation ---

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    // --- Internal ---

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: message.into(),
        }
    }


    // ==================== Inspection ====================

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Authorization { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Api { code, .. } => *code,
            Self::Storage { code, .. } => *code,
            Self::Config { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::InvalidInput { code, .. } => *code,
            Self::Ui { code, .. } => *code,
            Self::Internal { code, .. } => *code,
            Self::Serialization { code, .. } => *code,
            Self::Timeout => ErrorCode::ConnectionTimeout,
        }
    }

    /// HTTP status carried by API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } if *status != 0 => Some(*status),
            Self::Authentication {
                code: ErrorCode::TokenExpired,
                ..
            } => Some(401),
            Self::Authorization { .. } => Some(403),
            _ => None,
        }
    }

    /// Check if this is an authentication error
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Authorization { .. }
        )
    }

    /// Check if the session was torn down because the refresh credential was rejected
    pub fn is_refresh_failure(&self) -> bool {
        self.code() == ErrorCode::RefreshFailed
    }

    /// Check if this is a network error
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Api { .. } | Self::Timeout
        )
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Timeout
                | Self::Api { status: 503, .. }
                | Self::Api { status: 429, .. }
        )
    }
}

// ==================== From Implementations ====================

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::storage_from_error("IO operation", err)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::network_from_reqwest(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        Self::config_from_error(err)
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|name| name.to_string());
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: err.to_string(),
            field,
        }
    }
}

impl From<dialoguer::Error> for ClientError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Ui {
            code: ErrorCode::DialogError,
            message: format!("Dialog error: {}", err),
        }
    }
}

// Manual Clone implementation that drops non-cloneable sources
impl Clone for ClientError {
    fn clone(&self) -> Self {
        match self {
            Self::Authentication { code, message, .. } => Self::Authentication {
                code: *code,
                message: message.clone(),
                source: None,
            },
            Self::Authorization { code, message } => Self::Authorization {
                code: *code,
                message: message.clone(),
            },
            Self::Network { code, message, .. } => Self::Network {
                code: *code,
                message: message.clone(),
                source: None,
            },
            Self::Api {
                code,
                status,
                message,
            } => Self::Api {
                code: *code,
                status: *status,
                message: message.clone(),
            },
            Self::Storage {
                code,
                context,
                message,
                ..
            } => Self::Storage {
                code: *code,
                context: context.clone(),
                message: message.clone(),
                source: None,
            },
            Self::Config { code, message, .. } => Self::Config {
                code: *code,
                message: message.clone(),
                source: None,
            },
            Self::Validation {
                code,
                message,
                field,
            } => Self::Validation {
                code: *code,
                message: message.clone(),
                field: field.clone(),
            },
            Self::InvalidInput { code, message } => Self::InvalidInput {
                code: *code,
                message: message.clone(),
            },
            Self::Ui { code, message } => Self::Ui {
                code: *code,
                message: message.clone(),
            },
            Self::Internal { code, message } => Self::Internal {
                code: *code,
                message: message.clone(),
            },
            Self::Serialization { code, message, .. } => Self::Serialization {
                code: *code,
                message: message.clone(),
                source: None,
            },
            Self::Timeout => Self::Timeout,
        }
    }
}
