//! Error types for the scan engine

use crate::scan::ScanPhase;
use thiserror::Error;

/// Result type for transport operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by the transport client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Endpoint could not be built from the base URL
    #[error("Invalid URL: {0}")]
    BadUrl(String),

    /// Non-2xx response other than 401/403
    #[error("Unexpected HTTP {status}: {body}")]
    BadResponse { status: u16, body: String },

    /// 401 or 403; the platform answers 401 for authorization failures too
    #[error("Insufficient permissions for {endpoint}")]
    InsufficientPermissions { endpoint: String },

    /// Response body did not have the expected JSON or XML shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Client-credentials exchange was refused
    #[error("Authentication failed with HTTP {status}: {body}")]
    AuthenticationFailed { status: u16, body: String },

    /// Connection, timeout or TLS failure
    #[error("Network error: {0}")]
    Network(String),

    /// Redirect chain exceeded the hop limit
    #[error("Too many redirects starting at {0}")]
    TooManyRedirects(String),

    /// Redirect pointed at another scheme, host or port
    #[error("Refusing redirect from {from} to {to}")]
    CrossOriginRedirect { from: String, to: String },
}

impl ApiError {
    /// Get the error code for CLI/API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadUrl(_) => "BAD_URL",
            Self::BadResponse { .. } => "BAD_RESPONSE",
            Self::InsufficientPermissions { .. } => "PERMISSION_DENIED",
            Self::Decode(_) => "DECODE_ERROR",
            Self::AuthenticationFailed { .. } => "AUTH_FAILED",
            Self::Network(_) => "NETWORK_ERROR",
            Self::TooManyRedirects(_) => "TOO_MANY_REDIRECTS",
            Self::CrossOriginRedirect { .. } => "CROSS_ORIGIN_REDIRECT",
        }
    }

    /// Short description used when summarising swallowed failures
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::InsufficientPermissions { endpoint } => {
                format!("insufficient permissions for {endpoint}")
            }
            Self::BadResponse { status, .. } | Self::AuthenticationFailed { status, .. } => {
                format!("HTTP {status}")
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::BadUrl(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<quick_xml::Error> for ApiError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// A scan that could not produce an attribute list
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Scan failed while {phase}: {source}")]
pub struct ScanError {
    /// Phase the scan was in when it failed
    pub phase: ScanPhase,
    /// Underlying transport error
    #[source]
    pub source: ApiError,
}

impl ScanError {
    pub(crate) fn new(phase: ScanPhase, source: ApiError) -> Self {
        Self { phase, source }
    }
}
