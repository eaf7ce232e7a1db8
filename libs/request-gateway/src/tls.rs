//! HTTPS connector for the gateway's client.

use crate::config::{TlsRootConfig, TransportSecurity};
use crate::error::HttpError;
use hyper_rustls::{ConfigBuilderExt, HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::RootCertStore;
use rustls::crypto::CryptoProvider;
use std::sync::{Arc, OnceLock};

/// OS trust store, parsed on first use and shared by every later client.
static NATIVE_ROOTS: OnceLock<Arc<RootCertStore>> = OnceLock::new();

fn native_roots() -> Arc<RootCertStore> {
    Arc::clone(NATIVE_ROOTS.get_or_init(|| {
        let loaded = rustls_native_certs::load_native_certs();
        for err in &loaded.errors {
            tracing::warn!(error = %err, "skipping unreadable native root certificate");
        }

        let mut store = RootCertStore::empty();
        let (added, ignored) = store.add_parsable_certificates(loaded.certs);
        tracing::debug!(added, ignored, "native root store loaded");
        Arc::new(store)
    }))
}

fn tls_error(message: impl Into<String>) -> HttpError {
    HttpError::Tls(message.into().into())
}

/// Build the connector for `tls_roots`; `transport` decides whether plain
/// `http://` connections are possible at all. ALPN offers h2 and http/1.1.
///
/// # Errors
/// `HttpError::Tls` when the chosen root store is empty or rustls rejects
/// the protocol versions.
pub(crate) fn build_https_connector(
    tls_roots: TlsRootConfig,
    transport: TransportSecurity,
) -> Result<HttpsConnector<HttpConnector>, HttpError> {
    // Reuse a process-wide provider when the application installed one.
    let provider = CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    let versions = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error(format!("unsupported TLS protocol versions: {e}")))?;

    let client_config = match tls_roots {
        TlsRootConfig::WebPki => versions.with_webpki_roots().with_no_client_auth(),
        TlsRootConfig::Native => {
            let roots = native_roots();
            if roots.is_empty() {
                return Err(tls_error("OS certificate store has no usable root certificates"));
            }
            versions
                .with_root_certificates(roots)
                .with_no_client_auth()
        }
    };

    let builder = HttpsConnectorBuilder::new().with_tls_config(client_config);
    let builder = match transport {
        TransportSecurity::AllowInsecureHttp => builder.https_or_http(),
        TransportSecurity::TlsOnly => builder.https_only(),
    };
    Ok(builder.enable_all_versions().build())
}
