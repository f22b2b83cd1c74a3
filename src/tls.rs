//! TLS profile construction.
//!
//! A [`TlsProfile`] is an immutable bundle of ALPN protocol list, TLS version
//! bounds, and a cipher-suite order. The cipher order is shuffled uniformly
//! once at construction and frozen for the profile's lifetime, so each
//! process run presents a distinguishable ordering instead of a static,
//! trivially fingerprinted one.

use boring::ssl::{SslConnector, SslMethod, SslVersion};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;

use crate::error::{Error, Result};

/// BoringSSL's default TLS 1.2 client cipher suites (OpenSSL names).
///
/// The TLS 1.3 suite set is fixed by the library and not subject to
/// cipher-list control, so this list is what the randomized order covers.
pub const DEFAULT_CIPHER_SUITES: &[&str] = &[
    "ECDHE-ECDSA-AES128-GCM-SHA256",
    "ECDHE-RSA-AES128-GCM-SHA256",
    "ECDHE-ECDSA-AES256-GCM-SHA384",
    "ECDHE-RSA-AES256-GCM-SHA384",
    "ECDHE-ECDSA-CHACHA20-POLY1305",
    "ECDHE-RSA-CHACHA20-POLY1305",
    "ECDHE-ECDSA-AES128-SHA",
    "ECDHE-RSA-AES128-SHA",
    "ECDHE-ECDSA-AES256-SHA",
    "ECDHE-RSA-AES256-SHA",
    "AES128-GCM-SHA256",
    "AES256-GCM-SHA384",
    "AES128-SHA",
    "AES256-SHA",
];

/// TLS protocol version bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    Tls12,
    Tls13,
}

impl TlsVersion {
    fn as_ssl_version(self) -> SslVersion {
        match self {
            Self::Tls12 => SslVersion::TLS1_2,
            Self::Tls13 => SslVersion::TLS1_3,
        }
    }
}

/// Immutable TLS client configuration.
///
/// Constructed once, never mutated, shared by reference across all requests
/// using it.
#[derive(Debug, Clone)]
pub struct TlsProfile {
    alpn: Vec<&'static str>,
    min_version: TlsVersion,
    max_version: TlsVersion,
    ciphers: Vec<&'static str>,
}

impl TlsProfile {
    /// Build a profile from the two control flags.
    ///
    /// ALPN advertises `h2` ahead of `http/1.1` when HTTP/2 is enabled.
    /// Minimum version is always TLS 1.2; maximum is TLS 1.2 when TLS 1.3 is
    /// disabled. Side effect: consumes entropy for the cipher shuffle.
    pub fn build(enable_http2: bool, disable_tls13: bool) -> Self {
        let alpn = if enable_http2 {
            vec!["h2", "http/1.1"]
        } else {
            vec!["http/1.1"]
        };

        let max_version = if disable_tls13 {
            TlsVersion::Tls12
        } else {
            TlsVersion::Tls13
        };

        let mut ciphers = DEFAULT_CIPHER_SUITES.to_vec();
        ciphers.shuffle(&mut rand::thread_rng());

        Self {
            alpn,
            min_version: TlsVersion::Tls12,
            max_version,
            ciphers,
        }
    }

    /// ALPN protocols in advertised order.
    pub fn alpn(&self) -> &[&'static str] {
        &self.alpn
    }

    /// Minimum negotiable TLS version.
    pub fn min_version(&self) -> TlsVersion {
        self.min_version
    }

    /// Maximum negotiable TLS version.
    pub fn max_version(&self) -> TlsVersion {
        self.max_version
    }

    /// Cipher suites in this profile's frozen order.
    pub fn ciphers(&self) -> &[&'static str] {
        &self.ciphers
    }

    /// ALPN list in TLS wire format (length-prefixed protocol names).
    pub fn alpn_wire(&self) -> Vec<u8> {
        let mut wire = Vec::new();
        for proto in &self.alpn {
            wire.push(proto.len() as u8);
            wire.extend_from_slice(proto.as_bytes());
        }
        wire
    }

    /// Materialize a BoringSSL connector configured from this profile.
    pub fn ssl_connector(&self) -> Result<SslConnector> {
        let mut builder = SslConnector::builder(SslMethod::tls_client())
            .map_err(|e| Error::tls(format!("Failed to create SSL connector: {}", e)))?;

        builder
            .set_min_proto_version(Some(self.min_version.as_ssl_version()))
            .map_err(|e| Error::tls(format!("Failed to set min TLS version: {}", e)))?;
        builder
            .set_max_proto_version(Some(self.max_version.as_ssl_version()))
            .map_err(|e| Error::tls(format!("Failed to set max TLS version: {}", e)))?;

        let cipher_str = self.ciphers.join(":");
        builder
            .set_cipher_list(&cipher_str)
            .map_err(|e| Error::tls(format!("Failed to set cipher list: {}", e)))?;

        builder
            .set_alpn_protos(&self.alpn_wire())
            .map_err(|e| Error::tls(format!("Failed to set ALPN: {}", e)))?;

        Ok(builder.build())
    }
}

/// HTTP/2-capable profile, TLS 1.3 allowed.
pub static TLS_PROFILE_HTTP2: Lazy<TlsProfile> = Lazy::new(|| TlsProfile::build(true, false));

/// HTTP/1.1-only profile, TLS 1.3 allowed.
pub static TLS_PROFILE_HTTP1: Lazy<TlsProfile> = Lazy::new(|| TlsProfile::build(false, false));

/// HTTP/2-capable profile, TLS 1.3 disabled.
pub static TLS_PROFILE_HTTP2_NO_TLS13: Lazy<TlsProfile> =
    Lazy::new(|| TlsProfile::build(true, true));

/// HTTP/1.1-only profile, TLS 1.3 disabled.
pub static TLS_PROFILE_HTTP1_NO_TLS13: Lazy<TlsProfile> =
    Lazy::new(|| TlsProfile::build(false, true));
