//! Blocking request gateway.
//!
//! [`RequestGateway`] owns one session (a current-thread Tokio runtime plus
//! an [`HttpClient`]) and exposes `fetch`/`submit` calls that block the
//! calling thread until the exchange completes or the timeout elapses.
//! Responses are decoded into [`JsonMap`]; failures are [`GatewayError`]s.

mod config;
mod error;

pub use config::{GatewayConfig, normalize_base_url};
pub use error::GatewayError;

use crate::builder::HttpClientBuilder;
use crate::client::HttpClient;
use crate::config::{TlsRootConfig, TransportSecurity};
use crate::error::HttpError;
use error::{Operation, map_http_error};
use std::future::Future;
use std::time::Duration;

/// Decoded JSON object returned by gateway calls.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Body of a [`RequestGateway::submit`] call.
#[derive(Debug, Clone, Copy, Default)]
pub enum Payload<'a> {
    /// No body
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` fields
    Form(&'a [(&'a str, &'a str)]),
    /// `application/json` document
    Json(&'a serde_json::Value),
}

/// The reusable connection resource behind an open gateway.
struct Session {
    runtime: tokio::runtime::Runtime,
    client: HttpClient,
}

impl Session {
    fn open(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GatewayError::Configuration(format!("failed to start runtime: {e}")))?;

        // The request buffer spawns its worker onto the current runtime.
        let client = {
            let _enter = runtime.enter();
            HttpClientBuilder::with_config(config.client_config())
                .build()
                .map_err(|e| GatewayError::Configuration(e.to_string()))?
        };

        Ok(Self { runtime, client })
    }

    /// Drive one request/response exchange to completion.
    ///
    /// The deadline spans sending and reading the whole body; the client's
    /// own timeout stops at the response headers.
    fn exchange<F>(&self, timeout: Duration, exchange: F) -> Result<serde_json::Value, HttpError>
    where
        F: Future<Output = Result<serde_json::Value, HttpError>>,
    {
        self.runtime.block_on(async {
            tokio::time::timeout(timeout, exchange)
                .await
                .unwrap_or_else(|_elapsed| Err(HttpError::Timeout(timeout)))
        })
    }

    fn close(self) {
        let Self { runtime, client } = self;
        drop(client);
        runtime.shutdown_background();
    }
}

/// Blocking HTTP gateway with a fixed base address, timeout and default
/// headers.
///
/// States: **open** after construction, **closed** after [`release`]
/// (explicit, through [`scoped`], or on drop). Requests on a closed
/// gateway fail with [`GatewayError::Closed`]; releasing twice is a no-op.
///
/// Calls take `&mut self`, so one gateway serves one caller at a time.
/// Calls block on an internal runtime and must not be made from inside an
/// async context.
///
/// # Example
///
/// ```ignore
/// let mut gateway = RequestGateway::builder()
///     .base_url("https://api.example.com/")
///     .header("Authorization", "Bearer token123")
///     .build()?;
///
/// let item = gateway.fetch_with_query("/items", &[("page", "1")])?;
/// let created = gateway.submit("/items", Payload::Json(&json!({"name": "x"})))?;
/// gateway.release();
/// ```
///
/// [`release`]: RequestGateway::release
/// [`scoped`]: RequestGateway::scoped
pub struct RequestGateway {
    base_url: String,
    timeout: Duration,
    headers: std::collections::BTreeMap<String, String>,
    session: Option<Session>,
}

impl std::fmt::Debug for RequestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGateway")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl RequestGateway {
    /// Open a gateway from configuration.
    ///
    /// # Errors
    /// Returns `GatewayError::Configuration` if a default header is invalid,
    /// TLS cannot be initialised, or the runtime cannot start.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let session = Session::open(&config)?;
        let base_url = normalize_base_url(&config.base_url).to_owned();

        tracing::debug!(
            base_url = %base_url,
            timeout = ?config.timeout,
            headers = config.headers.len(),
            "gateway session opened"
        );

        Ok(Self {
            base_url,
            timeout: config.timeout,
            headers: config.headers,
            session: Some(session),
        })
    }

    #[must_use]
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    /// Normalized base address (no trailing `/`).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Default headers applied to every request.
    #[must_use]
    pub fn headers(&self) -> &std::collections::BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    /// Full target address for `path`.
    ///
    /// With an empty base address the path is used verbatim.
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        if self.base_url.is_empty() {
            path.to_owned()
        } else {
            format!("{}{path}", self.base_url)
        }
    }

    /// GET `path` and decode the JSON object it returns.
    ///
    /// # Errors
    /// - `GatewayError::NotFound` on HTTP 404
    /// - `GatewayError::Network` on any other error status or transport failure
    /// - `GatewayError::Decode` if the body is not a JSON object
    /// - `GatewayError::Closed` after [`release`](Self::release)
    pub fn fetch(&mut self, path: &str) -> Result<JsonMap, GatewayError> {
        self.fetch_with_query(path, &[] as &[(&str, &str)])
    }

    /// GET `path` with URL-encoded query parameters.
    ///
    /// `query` is anything `serde_urlencoded` accepts: a pair slice, a map,
    /// or a flat struct.
    ///
    /// # Errors
    /// Same as [`fetch`](Self::fetch).
    pub fn fetch_with_query<Q>(&mut self, path: &str, query: &Q) -> Result<JsonMap, GatewayError>
    where
        Q: serde::Serialize + ?Sized,
    {
        let url = self.resolve(path);
        let session = self.session.as_ref().ok_or(GatewayError::Closed)?;

        let request = session.client.get(&url).query(query);
        let result = session.exchange(self.timeout, async move {
            request.send().await?.json::<serde_json::Value>().await
        });

        finish(result, Operation::Fetch, &url)
    }

    /// POST `payload` to `path` and decode the JSON object it returns.
    ///
    /// Unlike [`fetch`](Self::fetch), a 404 is reported as a network failure.
    ///
    /// # Errors
    /// - `GatewayError::Network` on any error status or transport failure
    /// - `GatewayError::Decode` if the body is not a JSON object
    /// - `GatewayError::Closed` after [`release`](Self::release)
    pub fn submit(&mut self, path: &str, payload: Payload<'_>) -> Result<JsonMap, GatewayError> {
        let url = self.resolve(path);
        let session = self.session.as_ref().ok_or(GatewayError::Closed)?;

        let request = session.client.post(&url);
        let request = match payload {
            Payload::Empty => Ok(request),
            Payload::Form(fields) => request.form(fields),
            Payload::Json(value) => request.json(value),
        };
        let result = session.exchange(self.timeout, async move {
            request?.send().await?.json::<serde_json::Value>().await
        });

        finish(result, Operation::Submit, &url)
    }

    /// Close the session. Calling it again does nothing.
    pub fn release(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
            tracing::debug!(base_url = %self.base_url, "gateway session released");
        }
    }

    /// Run `f` with this gateway, then release it on every exit path,
    /// unwinding included.
    ///
    /// ```ignore
    /// let item = gateway.scoped(|gw| gw.fetch("/items/1"))?;
    /// assert!(gateway.is_closed());
    /// ```
    pub fn scoped<T, F>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        struct ReleaseOnExit<'a>(&'a mut RequestGateway);

        impl Drop for ReleaseOnExit<'_> {
            fn drop(&mut self) {
                self.0.release();
            }
        }

        let guard = ReleaseOnExit(self);
        f(&mut *guard.0)
    }
}

impl Drop for RequestGateway {
    fn drop(&mut self) {
        self.release();
    }
}

fn finish(
    result: Result<serde_json::Value, HttpError>,
    operation: Operation,
    url: &str,
) -> Result<JsonMap, GatewayError> {
    match result {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(GatewayError::Decode(serde::de::Error::invalid_type(
            unexpected(&other),
            &"a JSON object",
        ))),
        Err(err) => {
            let err = map_http_error(err, operation, url);
            tracing::debug!(url, error = %err, "gateway request failed");
            Err(err)
        }
    }
}

fn unexpected(value: &serde_json::Value) -> serde::de::Unexpected<'_> {
    use serde::de::Unexpected;
    match value {
        serde_json::Value::Null => Unexpected::Unit,
        serde_json::Value::Bool(b) => Unexpected::Bool(*b),
        serde_json::Value::Number(_) => Unexpected::Other("number"),
        serde_json::Value::String(s) => Unexpected::Str(s),
        serde_json::Value::Array(_) => Unexpected::Seq,
        serde_json::Value::Object(_) => Unexpected::Map,
    }
}

/// Fluent construction of a [`RequestGateway`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct GatewayBuilder {
    config: GatewayConfig,
}

impl GatewayBuilder {
    pub fn with_config(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config
            .headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.config.transport = transport;
        self
    }

    /// Refuse plain `http://` addresses.
    pub fn tls_only(self) -> Self {
        self.transport(TransportSecurity::TlsOnly)
    }

    pub fn tls_roots(mut self, tls_roots: TlsRootConfig) -> Self {
        self.config.tls_roots = tls_roots;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// # Errors
    /// See [`RequestGateway::new`].
    pub fn build(self) -> Result<RequestGateway, GatewayError> {
        RequestGateway::new(self.config)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests;
