#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Blocking HTTP request gateway
//!
//! [`RequestGateway`] talks to one remote service: it holds a base address,
//! a per-request timeout and default headers, and exposes two calls:
//! - `fetch`: GET a path (optionally with query parameters)
//! - `submit`: POST a form or JSON payload to a path
//!
//! Both block until the response is decoded into a JSON object ([`JsonMap`])
//! and report failures through [`GatewayError`]:
//! - `NotFound` for a 404 on `fetch`
//! - `Network` for every other HTTP error status and every transport failure
//! - `Configuration` when the gateway cannot be constructed
//!
//! Underneath sits an async [`HttpClient`] built on hyper with a tower
//! middleware stack (timeout, default headers, User-Agent, transparent
//! decompression, redirect following) and rustls for TLS. It is usable on
//! its own from async code.
//!
//! # Example
//!
//! ```ignore
//! use request_gateway::{Payload, RequestGateway};
//! use std::time::Duration;
//!
//! let mut gateway = RequestGateway::builder()
//!     .base_url("https://api.example.com/")
//!     .timeout(Duration::from_secs(10))
//!     .header("Authorization", "Bearer token123")
//!     .build()?;
//!
//! let user = gateway.scoped(|gw| gw.fetch("/users/1"))?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod gateway;
pub mod layers;
mod request;
mod response;
mod tls;

pub use builder::HttpClientBuilder;
pub use client::{BufferedService, HttpClient, ServiceFuture};
pub use config::{
    DEFAULT_MAX_BODY_SIZE, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpClientConfig, TlsRootConfig,
    TransportSecurity,
};
pub use error::{HttpError, InvalidUriKind};
pub use gateway::{
    GatewayBuilder, GatewayConfig, GatewayError, JsonMap, Payload, RequestGateway,
    normalize_base_url,
};
pub use request::RequestBuilder;
pub use response::{ERROR_BODY_PREVIEW_LIMIT, HttpResponse, ResponseBody};
