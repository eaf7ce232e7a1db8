use super::*;
use httpmock::prelude::*;
use serde_json::json;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Instant;

fn gateway_for(server: &MockServer) -> RequestGateway {
    RequestGateway::builder()
        .base_url(server.base_url())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[test]
fn test_base_url_trailing_slash_removed() {
    let gateway = RequestGateway::builder()
        .base_url("https://api.example.com/")
        .build()
        .unwrap();

    assert_eq!(gateway.base_url(), "https://api.example.com");
    assert_eq!(gateway.resolve("/test"), "https://api.example.com/test");
}

#[test]
fn test_defaults() {
    let gateway = RequestGateway::new(GatewayConfig::new("https://api.example.com")).unwrap();

    assert_eq!(gateway.timeout(), Duration::from_secs(30));
    assert!(gateway.headers().is_empty());
    assert!(!gateway.is_closed());
}

#[test]
fn test_headers_and_timeout_stored() {
    let gateway = RequestGateway::builder()
        .base_url("https://api.example.com")
        .timeout(Duration::from_secs(60))
        .header("Authorization", "Bearer token123")
        .build()
        .unwrap();

    assert_eq!(gateway.timeout(), Duration::from_secs(60));
    assert_eq!(gateway.headers()["Authorization"], "Bearer token123");
}

#[test]
fn test_empty_base_url_uses_path_verbatim() {
    let gateway = RequestGateway::new(GatewayConfig::default()).unwrap();
    assert_eq!(
        gateway.resolve("https://other.example.com/x"),
        "https://other.example.com/x"
    );
}

#[test]
fn test_invalid_header_is_configuration_error() {
    let result = RequestGateway::builder()
        .base_url("https://api.example.com")
        .header("bad header", "value")
        .build();

    match result {
        Err(GatewayError::Configuration(msg)) => assert!(msg.contains("header")),
        other => panic!("expected Configuration error, got: {other:?}"),
    }
}

#[test]
fn test_fetch_returns_json_object() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(Method::GET).path("/test");
        then.status(200).json_body(json!({"data": "test"}));
    });

    let mut gateway = gateway_for(&server);
    let result = gateway.fetch("/test").unwrap();

    assert_eq!(result["data"], "test");
    m.assert();
}

#[test]
fn test_fetch_with_query_params() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(Method::GET)
            .path("/items")
            .query_param("page", "2")
            .query_param("q", "a b");
        then.status(200).json_body(json!({"items": []}));
    });

    let mut gateway = gateway_for(&server);
    let result = gateway
        .fetch_with_query("/items", &[("page", "2"), ("q", "a b")])
        .unwrap();

    assert_eq!(result["items"], json!([]));
    m.assert();
}

#[test]
fn test_fetch_404_is_not_found() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::GET).path("/missing");
        then.status(404).body("nope");
    });

    let mut gateway = gateway_for(&server);
    let err = gateway.fetch("/missing").unwrap_err();

    let url = server.url("/missing");
    assert!(matches!(&err, GatewayError::NotFound { url: u } if *u == url));
    assert_eq!(err.to_string(), format!("Resource not found: {url}"));
}

#[test]
fn test_fetch_500_is_network_error() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::GET).path("/broken");
        then.status(500);
    });

    let mut gateway = gateway_for(&server);
    let err = gateway.fetch("/broken").unwrap_err();

    assert!(matches!(err, GatewayError::Network { .. }));
    assert!(err.to_string().contains("HTTP error occurred"));
    assert_eq!(err.status(), Some(http::StatusCode::INTERNAL_SERVER_ERROR));
}

#[test]
fn test_fetch_non_object_is_decode_error() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::GET).path("/list");
        then.status(200).json_body(json!([1, 2, 3]));
    });

    let mut gateway = gateway_for(&server);
    let err = gateway.fetch("/list").unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[test]
fn test_fetch_invalid_json_is_decode_error() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::GET).path("/html");
        then.status(200).body("<html></html>");
    });

    let mut gateway = gateway_for(&server);
    let err = gateway.fetch("/html").unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[test]
fn test_fetch_connection_refused_is_network_error() {
    let mut gateway = RequestGateway::builder()
        .base_url("http://127.0.0.1:9")
        .build()
        .unwrap();

    let err = gateway.fetch("/").unwrap_err();
    assert!(err.to_string().starts_with("Network error occurred:"));
    assert_eq!(err.status(), None);
}

#[test]
fn test_fetch_timeout_is_network_error() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::GET).path("/slow");
        then.status(200)
            .json_body(json!({}))
            .delay(Duration::from_millis(500));
    });

    let mut gateway = RequestGateway::builder()
        .base_url(server.base_url())
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let err = gateway.fetch("/slow").unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Network {
            source: HttpError::Timeout(_),
            ..
        }
    ));
}

/// Serve one connection: full headers announcing 100 bytes, then only a
/// fragment of the body, then silence.
fn stalled_body_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 4096];
        let _ = stream.read(&mut request);
        stream
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"a\":",
            )
            .unwrap();
        stream.flush().unwrap();
        std::thread::sleep(Duration::from_secs(5));
    });
    format!("http://{addr}")
}

#[test]
fn test_fetch_timeout_covers_stalled_body() {
    let mut gateway = RequestGateway::builder()
        .base_url(stalled_body_server())
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();

    let started = Instant::now();
    let err = gateway.fetch("/x").unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(
        err,
        GatewayError::Network {
            source: HttpError::Timeout(d),
            ..
        } if d == Duration::from_millis(300)
    ));
}

#[test]
fn test_submit_timeout_covers_stalled_body() {
    let mut gateway = RequestGateway::builder()
        .base_url(stalled_body_server())
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();

    let started = Instant::now();
    let err = gateway
        .submit("/x", Payload::Json(&json!({"name": "widget"})))
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(err.to_string().starts_with("Network error occurred:"));
}

#[test]
fn test_default_config_accepts_plain_http() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(Method::GET).path("/x");
        then.status(200).json_body(json!({"plain": true}));
    });

    let mut gateway = RequestGateway::new(GatewayConfig::new(server.base_url())).unwrap();
    let result = gateway.fetch("/x").unwrap();

    assert_eq!(result["plain"], true);
    m.assert();
}

#[test]
fn test_plain_http_rejected_when_tls_only() {
    let server = MockServer::start();
    let mut gateway = RequestGateway::builder()
        .base_url(server.base_url())
        .tls_only()
        .build()
        .unwrap();

    let err = gateway.fetch("/test").unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Network {
            source: HttpError::InvalidScheme { .. },
            ..
        }
    ));
}

#[test]
fn test_default_headers_sent() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(Method::GET)
            .path("/secure")
            .header("authorization", "Bearer token123");
        then.status(200).json_body(json!({"ok": true}));
    });

    let mut gateway = RequestGateway::builder()
        .base_url(server.base_url())
        .header("Authorization", "Bearer token123")
        .build()
        .unwrap();

    gateway.fetch("/secure").unwrap();
    m.assert();
}

#[test]
fn test_submit_json() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(Method::POST)
            .path("/items")
            .header("content-type", "application/json")
            .json_body(json!({"name": "widget"}));
        then.status(201).json_body(json!({"id": 1, "name": "widget"}));
    });

    let mut gateway = gateway_for(&server);
    let result = gateway
        .submit("/items", Payload::Json(&json!({"name": "widget"})))
        .unwrap();

    assert_eq!(result["id"], 1);
    m.assert();
}

#[test]
fn test_submit_form() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(Method::POST)
            .path("/submit")
            .header("content-type", "application/x-www-form-urlencoded")
            .body("key=value");
        then.status(200).json_body(json!({"success": true}));
    });

    let mut gateway = gateway_for(&server);
    let result = gateway
        .submit("/submit", Payload::Form(&[("key", "value")]))
        .unwrap();

    assert_eq!(result["success"], true);
    m.assert();
}

#[test]
fn test_submit_empty_body() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(Method::POST).path("/ping");
        then.status(200).json_body(json!({"pong": true}));
    });

    let mut gateway = gateway_for(&server);
    gateway.submit("/ping", Payload::Empty).unwrap();
    m.assert();
}

#[test]
fn test_submit_400_is_network_error() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::POST).path("/items");
        then.status(400).json_body(json!({"error": "bad"}));
    });

    let mut gateway = gateway_for(&server);
    let err = gateway
        .submit("/items", Payload::Form(&[("key", "value")]))
        .unwrap_err();

    assert!(err.to_string().contains("HTTP error occurred"));
    assert_eq!(err.status(), Some(http::StatusCode::BAD_REQUEST));
}

#[test]
fn test_submit_404_is_network_not_not_found() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::POST).path("/missing");
        then.status(404);
    });

    let mut gateway = gateway_for(&server);
    let err = gateway.submit("/missing", Payload::Empty).unwrap_err();

    assert!(matches!(err, GatewayError::Network { .. }));
    assert_eq!(err.status(), Some(http::StatusCode::NOT_FOUND));
}

#[test]
fn test_release_is_idempotent() {
    let mut gateway = RequestGateway::new(GatewayConfig::new("https://api.example.com")).unwrap();

    gateway.release();
    assert!(gateway.is_closed());
    gateway.release();
    assert!(gateway.is_closed());
}

#[test]
fn test_operations_after_release_fail_closed() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(Method::GET).path("/test");
        then.status(200).json_body(json!({}));
    });

    let mut gateway = gateway_for(&server);
    gateway.release();

    assert!(matches!(gateway.fetch("/test"), Err(GatewayError::Closed)));
    assert!(matches!(
        gateway.submit("/test", Payload::Empty),
        Err(GatewayError::Closed)
    ));
    assert_eq!(m.calls(), 0);
}

#[test]
fn test_scoped_releases_on_return() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::GET).path("/test");
        then.status(200).json_body(json!({"data": "test"}));
    });

    let mut gateway = gateway_for(&server);
    let result = gateway.scoped(|gw| gw.fetch("/test")).unwrap();

    assert_eq!(result["data"], "test");
    assert!(gateway.is_closed());
}

#[test]
fn test_scoped_releases_on_error() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(Method::GET).path("/missing");
        then.status(404);
    });

    let mut gateway = gateway_for(&server);
    let result = gateway.scoped(|gw| gw.fetch("/missing"));

    assert!(matches!(result, Err(GatewayError::NotFound { .. })));
    assert!(gateway.is_closed());
}

#[test]
fn test_scoped_releases_on_panic() {
    let mut gateway = RequestGateway::new(GatewayConfig::new("https://api.example.com")).unwrap();

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        gateway.scoped(|_| panic!("boom"));
    }));

    assert!(outcome.is_err());
    assert!(gateway.is_closed());
}

#[test]
fn test_gateway_reused_across_calls() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(Method::GET).path("/test");
        then.status(200).json_body(json!({"n": 1}));
    });

    let mut gateway = gateway_for(&server);
    for _ in 0..3 {
        gateway.fetch("/test").unwrap();
    }
    assert_eq!(m.calls(), 3);
}
