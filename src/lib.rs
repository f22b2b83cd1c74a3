//! # Wraith
//!
//! Typed HTTP client facade with TLS profile control.
//!
//! One long-lived [`NetworkingManager`] owns a shared, lazily-initialized
//! connection pool bound to a [`TlsProfile`] (ALPN list, TLS version bounds,
//! randomized cipher order). Requests either return a raw [`Response`] or a
//! [`TypedResponse`] whose body has been validated against a caller-supplied
//! [`Shape`]. Failures propagate immediately — no retries, no fallbacks.

pub mod connector;
pub mod error;
pub mod logging;
pub mod manager;
pub mod response;
pub mod tls;
pub mod validate;

// Re-exports
pub use error::{Error, Result};
pub use manager::{NetworkingManager, RequestOptions, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use response::Response;
pub use tls::{
    TlsProfile, TlsVersion, TLS_PROFILE_HTTP1, TLS_PROFILE_HTTP1_NO_TLS13, TLS_PROFILE_HTTP2,
    TLS_PROFILE_HTTP2_NO_TLS13,
};
pub use validate::{Shape, TypedResponse, ValidationError};
