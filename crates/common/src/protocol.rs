//! Request and response types exchanged over the public record API.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity headers
// ---------------------------------------------------------------------------

/// Header carrying the calling application's name.
pub const APP_NAME_HEADER: &str = "mcubed-app-name";

/// Header carrying the calling application's provisioned key.
pub const APP_KEY_HEADER: &str = "mcubed-app-key";

/// Query-parameter suffix that requests case-insensitive matching of a field,
/// e.g. `?name-insensitive=foo`.
pub const INSENSITIVE_SUFFIX: &str = "-insensitive";

// ---------------------------------------------------------------------------
// Mutation results
// ---------------------------------------------------------------------------

/// Response body for predicate-based update and delete requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedResponse {
    /// Number of records the operation touched. Zero is a normal result.
    pub affected: usize,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"forbidden"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.message())
    }
}
