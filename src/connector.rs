//! BoringSSL TLS connector feeding the pooled hyper client.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_boring::SslStream;
use tower::Service;

use crate::error::{Error, Result};
use crate::tls::TlsProfile;

/// Negotiated ALPN protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlpnProtocol {
    /// HTTP/2 ("h2")
    H2,
    /// HTTP/1.1 ("http/1.1")
    Http1,
    /// No ALPN negotiated or unknown protocol
    Unknown,
}

impl AlpnProtocol {
    /// Check if HTTP/2 was negotiated.
    pub fn is_h2(&self) -> bool {
        matches!(self, Self::H2)
    }
}

/// Stream that can be either HTTP (plain TCP) or HTTPS (TLS).
///
/// The bool on the `Https` variant records whether the owning manager has
/// HTTP/2 enabled; a negotiated `h2` connection is only driven as HTTP/2
/// when it is set.
#[derive(Debug)]
pub enum MaybeHttpsStream {
    /// Plain TCP stream for HTTP.
    Http(TcpStream),
    /// TLS-wrapped stream for HTTPS.
    Https(SslStream<TcpStream>, bool),
}

impl MaybeHttpsStream {
    /// Get the negotiated ALPN protocol.
    ///
    /// Plain HTTP connections report `Unknown` (no TLS means no ALPN).
    pub fn alpn_protocol(&self) -> AlpnProtocol {
        match self {
            MaybeHttpsStream::Http(_) => AlpnProtocol::Unknown,
            MaybeHttpsStream::Https(stream, _) => match stream.ssl().selected_alpn_protocol() {
                Some(b"h2") => AlpnProtocol::H2,
                Some(b"http/1.1") => AlpnProtocol::Http1,
                _ => AlpnProtocol::Unknown,
            },
        }
    }
}

impl Connection for MaybeHttpsStream {
    fn connected(&self) -> Connected {
        match self {
            MaybeHttpsStream::Http(_) => Connected::new(),
            MaybeHttpsStream::Https(_, http2_enabled) => {
                if *http2_enabled && self.alpn_protocol().is_h2() {
                    Connected::new().negotiated_h2()
                } else {
                    Connected::new()
                }
            }
        }
    }
}

impl AsyncRead for MaybeHttpsStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_read(cx, buf),
            MaybeHttpsStream::Https(stream, _) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeHttpsStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_write(cx, buf),
            MaybeHttpsStream::Https(stream, _) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_flush(cx),
            MaybeHttpsStream::Https(stream, _) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_shutdown(cx),
            MaybeHttpsStream::Https(stream, _) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Connector binding one TLS profile to every connection it opens.
#[derive(Clone)]
pub struct ProfileConnector {
    profile: Arc<TlsProfile>,
    enable_http2: bool,
}

impl ProfileConnector {
    /// Create a connector for the given profile.
    pub fn new(profile: Arc<TlsProfile>, enable_http2: bool) -> Self {
        Self {
            profile,
            enable_http2,
        }
    }

    /// Connect to a URI, returning either a plain TCP or TLS stream.
    pub async fn connect(&self, uri: &Uri) -> Result<MaybeHttpsStream> {
        let host = uri
            .host()
            .ok_or_else(|| Error::transport("Missing host"))?;
        let port = uri
            .port_u16()
            .unwrap_or(if uri.scheme_str() == Some("https") {
                443
            } else {
                80
            });

        let addr = format!("{}:{}", host, port);
        let tcp_stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| Error::transport(format!("Failed to connect to {}: {}", addr, e)))?;

        if uri.scheme_str() == Some("https") {
            let ssl_connector = self.profile.ssl_connector()?;

            let ssl_config = ssl_connector
                .configure()
                .map_err(|e| Error::tls(format!("Failed to configure SSL: {}", e)))?;

            let ssl_stream = tokio_boring::connect(ssl_config, host, tcp_stream)
                .await
                .map_err(|e| Error::tls(format!("TLS handshake failed: {}", e)))?;

            Ok(MaybeHttpsStream::Https(ssl_stream, self.enable_http2))
        } else {
            Ok(MaybeHttpsStream::Http(tcp_stream))
        }
    }
}

impl Service<Uri> for ProfileConnector {
    type Response = TokioIo<MaybeHttpsStream>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let connector = self.clone();
        Box::pin(async move { connector.connect(&uri).await.map(TokioIo::new) })
    }
}
