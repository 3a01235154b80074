//! Error body returned by the API on non-success responses

use serde::{Deserialize, Serialize};

/// `{"detail": "..."}` as produced by the API for most failures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}
