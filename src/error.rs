//! Error types for wraith crate.

use std::time::Duration;

use crate::response::Response;
use crate::validate::ValidationError;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during HTTP operations.
///
/// Callers branch on the variant: transport failures, HTTP status failures,
/// body decode failures, and shape validation failures are distinct kinds and
/// none of them is retried or transformed on the way up.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport error (DNS, connect, pooled request execution).
    #[error("Transport error: {0}")]
    Transport(String),

    /// TLS/SSL error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Per-request timeout expired.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx HTTP status. Carries the full response.
    #[error("HTTP {status}: request returned error status")]
    HttpStatus { status: u16, response: Response },

    /// Response body is not syntactically valid JSON.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Decoded body does not conform to the requested shape.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Shape descriptor is not a valid JSON Schema document.
    #[error("Invalid shape descriptor: {0}")]
    Schema(String),

    /// Decompression error.
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    Header(String),
}

impl Error {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a TLS error.
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an HTTP status error carrying the offending response.
    pub fn http_status(response: Response) -> Self {
        Self::HttpStatus {
            status: response.status().as_u16(),
            response,
        }
    }

    /// Create an invalid-shape error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create an invalid-header error.
    pub fn header(message: impl Into<String>) -> Self {
        Self::Header(message.into())
    }
}
