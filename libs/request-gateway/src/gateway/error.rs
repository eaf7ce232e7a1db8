use crate::error::HttpError;
use thiserror::Error;

/// Failures returned by [`RequestGateway`](crate::RequestGateway).
///
/// Transport-specific errors never leak past the gateway except as the
/// `source` of a [`GatewayError::Network`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    /// Invalid setup: bad default header, TLS initialisation failure, ...
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid input data
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure, or an HTTP error status other than a 404 on fetch
    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: HttpError,
    },

    /// The fetched resource does not exist (HTTP 404)
    #[error("Resource not found: {url}")]
    NotFound { url: String },

    /// The gateway was released and can no longer send requests
    #[error("Gateway is closed")]
    Closed,

    /// The response body is not a JSON object
    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl GatewayError {
    /// HTTP status behind this failure, when the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Self::Network { source, .. } => source.status(),
            Self::NotFound { .. } => Some(http::StatusCode::NOT_FOUND),
            _ => None,
        }
    }
}

/// Which gateway operation produced the transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Fetch,
    Submit,
}

/// Fold a transport error into the gateway taxonomy.
///
/// Only `fetch` distinguishes 404; `submit` treats every failure as a
/// network failure. JSON errors stay decode errors for both.
pub(crate) fn map_http_error(err: HttpError, operation: Operation, url: &str) -> GatewayError {
    match err {
        HttpError::Json(e) => GatewayError::Decode(e),
        HttpError::HttpStatus { status, .. }
            if status == http::StatusCode::NOT_FOUND && operation == Operation::Fetch =>
        {
            GatewayError::NotFound {
                url: url.to_owned(),
            }
        }
        HttpError::HttpStatus { status, .. } => GatewayError::Network {
            message: format!("HTTP error occurred: {status} for url: {url}"),
            source: err,
        },
        other => GatewayError::Network {
            message: format!("Network error occurred: {other}"),
            source: other,
        },
    }
}
