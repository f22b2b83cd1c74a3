//! Connection manager: one shared, lazily-created transport client.
//!
//! [`NetworkingManager`] owns a single pooled hyper client bound to one TLS
//! profile. The handle has three states — uninitialized, active, closed —
//! and only [`NetworkingManager::startup`] / [`NetworkingManager::shutdown`]
//! move between them; requests share the handle read-only. A request issued
//! against a cold manager initializes the client first. That implicit
//! startup is a deliberate ergonomic affordance, logged when it happens, and
//! guarded so concurrent cold-start requests collapse into a single
//! construction.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, USER_AGENT};
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client as PoolClient;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use url::Url;

use crate::connector::ProfileConnector;
use crate::error::{Error, Result};
use crate::logging::backtrace;
use crate::response::Response;
use crate::tls::{TlsProfile, TLS_PROFILE_HTTP2};
use crate::validate::{Shape, TypedResponse};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(9);

/// Default desktop-browser user agent.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux i686; rv:130.0) Gecko/20100101 Firefox/130.0";

type SharedClient = PoolClient<ProfileConnector, Full<Bytes>>;

/// Per-request options.
///
/// Builder-style; everything is optional. Proxy configuration is accepted
/// for call-site compatibility but not supported — it is discarded with a
/// warning.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
    body: Option<Bytes>,
    query: Vec<(String, String)>,
    proxy: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request header. Caller headers override the defaults on name
    /// collision.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the per-request timeout (default 9 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Append a query parameter to the request URL.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Proxy option: accepted, never used.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

/// Long-lived connection manager with an explicit startup/shutdown
/// lifecycle.
///
/// Construct independent managers freely; each owns its own client handle.
pub struct NetworkingManager {
    profile: Arc<TlsProfile>,
    enable_http2: bool,
    client: Arc<RwLock<Option<SharedClient>>>,
}

impl NetworkingManager {
    /// Manager over the HTTP/2-capable, TLS-1.3-allowed profile.
    pub fn new() -> Self {
        Self::with_profile(TLS_PROFILE_HTTP2.clone(), true)
    }

    /// Manager over a specific TLS profile.
    ///
    /// `enable_http2` governs whether an ALPN-negotiated `h2` connection is
    /// driven as HTTP/2; pair it with a profile that advertises `h2`.
    pub fn with_profile(profile: TlsProfile, enable_http2: bool) -> Self {
        Self {
            profile: Arc::new(profile),
            enable_http2,
            client: Arc::new(RwLock::new(None)),
        }
    }

    fn build_client(&self) -> SharedClient {
        let connector = ProfileConnector::new(self.profile.clone(), self.enable_http2);
        PoolClient::builder(TokioExecutor::new()).build(connector)
    }

    /// Initialize the persistent HTTP client.
    ///
    /// Calling startup on an active manager is tolerated: it logs a warning
    /// and leaves the existing handle in place.
    pub async fn startup(&self) {
        let mut guard = self.client.write().await;
        if guard.is_some() {
            tracing::warn!("HTTP client already initialized.");
        } else {
            tracing::info!("Initializing persistent HTTP client");
            *guard = Some(self.build_client());
        }
    }

    /// Close the persistent HTTP client, releasing its pooled connections.
    ///
    /// In-flight requests hold their own reference to the client and
    /// complete or fail independently; they are not aborted. Calling
    /// shutdown on an inactive manager logs a warning and no-ops.
    pub async fn shutdown(&self) {
        let mut guard = self.client.write().await;
        if guard.take().is_some() {
            tracing::info!("Closing persistent HTTP client");
        } else {
            tracing::warn!("HTTP client not initialized or already closed.");
        }
    }

    /// Whether a live client handle exists.
    pub async fn is_active(&self) -> bool {
        self.client.read().await.is_some()
    }

    /// Get the shared client, constructing it on first use.
    ///
    /// Double-checked under the write lock: concurrent cold-start callers
    /// collapse into one construction and never observe a half-built
    /// handle.
    async fn ensure_client(&self) -> SharedClient {
        {
            let guard = self.client.read().await;
            if let Some(client) = guard.as_ref() {
                return client.clone();
            }
        }

        tracing::info!("NetworkingManager not started. Initializing client on first use...");
        let mut guard = self.client.write().await;
        if let Some(client) = guard.as_ref() {
            // Lost the construction race; use the winner's handle.
            return client.clone();
        }
        let client = self.build_client();
        *guard = Some(client.clone());
        client
    }

    /// Issue a request and return the raw response.
    ///
    /// Non-2xx statuses fail with [`Error::HttpStatus`]; nothing is retried.
    /// Raw responses are deprecated in favor of the typed entry points, and
    /// each call logs a deprecation warning.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let client = self.ensure_client().await;
        match self.execute(client, method, url, options).await {
            Ok(response) => {
                tracing::warn!(
                    "Non-typed responses are deprecated and will be removed in a future \
                     version. Use the typed request methods instead."
                );
                Ok(response)
            }
            Err(e) => {
                tracing::error!("Request to {} failed: {}\n{}", url, e, backtrace());
                Err(e)
            }
        }
    }

    /// Issue a request and validate the response body against `shape`.
    pub async fn request_typed<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        shape: &Shape<T>,
        options: RequestOptions,
    ) -> Result<TypedResponse<T>> {
        let client = self.ensure_client().await;
        let result = async {
            let response = self.execute(client, method, url, options).await?;
            TypedResponse::from_response(response, shape)
        }
        .await;

        match result {
            Ok(typed) => Ok(typed),
            Err(e) => {
                tracing::error!("Request to {} failed: {}\n{}", url, e, backtrace());
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        client: SharedClient,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        if options.proxy.is_some() {
            tracing::warn!("Proxy configuration is not supported; ignoring proxy option.");
        }

        let timeout = options.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let uri = build_uri(url, &options.query)?;
        let headers = merge_headers(&options.headers)?;

        tracing::info!("Requesting {} {} with timeout {:?}", method, url, timeout);

        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(header_map) = builder.headers_mut() {
            *header_map = headers;
        }
        let request = builder
            .body(Full::new(options.body.unwrap_or_default()))
            .map_err(|e| Error::transport(format!("Failed to build request: {}", e)))?;

        let response = tokio::time::timeout(timeout, async {
            let response = client
                .request(request)
                .await
                .map_err(|e| Error::transport(e.to_string()))?;

            let (parts, body) = response.into_parts();
            let body_bytes = body
                .collect()
                .await
                .map_err(|e| Error::transport(format!("Failed to read body: {}", e)))?
                .to_bytes();

            Ok::<Response, Error>(Response::new(
                parts.status,
                parts.headers,
                body_bytes,
                parts.version,
            ))
        })
        .await
        .map_err(|_| Error::Timeout(timeout))??;

        if !response.is_success() {
            return Err(Error::http_status(response));
        }
        Ok(response)
    }

    /// Make a GET request returning the raw response.
    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::GET, url, options).await
    }

    /// Make a POST request returning the raw response.
    pub async fn post(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::POST, url, options).await
    }

    /// Make a PUT request returning the raw response.
    pub async fn put(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::PUT, url, options).await
    }

    /// Make a DELETE request returning the raw response.
    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::DELETE, url, options).await
    }

    /// Make a HEAD request returning the raw response.
    pub async fn head(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::HEAD, url, options).await
    }

    /// Make an OPTIONS request returning the raw response.
    pub async fn options(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::OPTIONS, url, options).await
    }

    /// Make a PATCH request returning the raw response.
    pub async fn patch(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::PATCH, url, options).await
    }

    /// Make a GET request validated against `shape`.
    pub async fn get_typed<T: DeserializeOwned>(
        &self,
        url: &str,
        shape: &Shape<T>,
        options: RequestOptions,
    ) -> Result<TypedResponse<T>> {
        self.request_typed(Method::GET, url, shape, options).await
    }

    /// Make a POST request validated against `shape`.
    pub async fn post_typed<T: DeserializeOwned>(
        &self,
        url: &str,
        shape: &Shape<T>,
        options: RequestOptions,
    ) -> Result<TypedResponse<T>> {
        self.request_typed(Method::POST, url, shape, options).await
    }

    /// Make a PUT request validated against `shape`.
    pub async fn put_typed<T: DeserializeOwned>(
        &self,
        url: &str,
        shape: &Shape<T>,
        options: RequestOptions,
    ) -> Result<TypedResponse<T>> {
        self.request_typed(Method::PUT, url, shape, options).await
    }

    /// Make a DELETE request validated against `shape`.
    pub async fn delete_typed<T: DeserializeOwned>(
        &self,
        url: &str,
        shape: &Shape<T>,
        options: RequestOptions,
    ) -> Result<TypedResponse<T>> {
        self.request_typed(Method::DELETE, url, shape, options).await
    }

    /// Make a HEAD request validated against `shape`.
    pub async fn head_typed<T: DeserializeOwned>(
        &self,
        url: &str,
        shape: &Shape<T>,
        options: RequestOptions,
    ) -> Result<TypedResponse<T>> {
        self.request_typed(Method::HEAD, url, shape, options).await
    }

    /// Make an OPTIONS request validated against `shape`.
    pub async fn options_typed<T: DeserializeOwned>(
        &self,
        url: &str,
        shape: &Shape<T>,
        options: RequestOptions,
    ) -> Result<TypedResponse<T>> {
        self.request_typed(Method::OPTIONS, url, shape, options).await
    }

    /// Make a PATCH request validated against `shape`.
    pub async fn patch_typed<T: DeserializeOwned>(
        &self,
        url: &str,
        shape: &Shape<T>,
        options: RequestOptions,
    ) -> Result<TypedResponse<T>> {
        self.request_typed(Method::PATCH, url, shape, options).await
    }
}

impl Default for NetworkingManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a URL, appending query pairs, and convert to a request URI.
fn build_uri(url: &str, query: &[(String, String)]) -> Result<Uri> {
    let mut target = Url::parse(url)?;
    if !query.is_empty() {
        target
            .query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    target
        .as_str()
        .parse()
        .map_err(|e| Error::transport(format!("Invalid request URI: {}", e)))
}

/// Merge caller headers on top of the three fixed defaults.
fn merge_headers(caller: &[(String, String)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip,deflate"));

    for (name, value) in caller {
        let name: HeaderName = name
            .parse()
            .map_err(|_| Error::header(format!("Invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::header(format!("Invalid value for header {}", name)))?;
        headers.insert(name, value);
    }

    Ok(headers)
}
