use crate::config::{
    DEFAULT_MAX_BODY_SIZE, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpClientConfig, TlsRootConfig,
    TransportSecurity,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Endpoint configuration of a [`RequestGateway`](crate::RequestGateway).
///
/// Deserializable from YAML/JSON/env; every field has a default.
///
/// ```yaml
/// base_url: https://api.example.com/
/// timeout: 30s
/// headers:
///   Authorization: Bearer token123
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Prefix for every request path. Empty means paths are full URLs.
    pub base_url: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Headers applied to every request
    pub headers: BTreeMap<String, String>,

    /// Accepted URL schemes (default: both `http` and `https`)
    pub transport: TransportSecurity,

    pub tls_roots: TlsRootConfig,

    pub user_agent: String,

    /// Upper bound on a decoded response body, in bytes
    pub max_body_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
            headers: BTreeMap::new(),
            transport: TransportSecurity::AllowInsecureHttp,
            tls_roots: TlsRootConfig::default(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub(crate) fn client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            request_timeout: self.timeout,
            max_body_size: self.max_body_size,
            user_agent: self.user_agent.clone(),
            default_headers: self
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            transport: self.transport,
            tls_roots: self.tls_roots,
            ..HttpClientConfig::default()
        }
    }
}

/// Strip every trailing `/` from a base address.
#[must_use]
pub fn normalize_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}
