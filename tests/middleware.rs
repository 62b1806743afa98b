//! End-to-end tests: the layer resolves once per request and handlers read
//! the outcome through the extractor or the request extensions.

use axum::Router;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::routing::get;
use client_ip::{client_ip, ClientIp, ClientIpLayer};
use std::net::SocketAddr;
use tower::ServiceExt;

/// Router whose handler echoes the resolved IP, or `-` when there is none.
fn app() -> Router {
    Router::new()
        .route(
            "/ip",
            get(|ip: Option<ClientIp>| async move {
                ip.map_or_else(|| "-".to_owned(), |ClientIp(ip)| ip.to_string())
            }),
        )
        .route(
            "/strict",
            get(|ClientIp(ip): ClientIp| async move { ip.to_string() }),
        )
        .layer(ClientIpLayer)
}

fn request(uri: &str, headers: &[(&str, &str)], peer: Option<&str>) -> Request {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let mut req = builder.body(Body::empty()).expect("build request");
    if let Some(peer) = peer {
        let addr: SocketAddr = peer.parse().expect("peer address");
        req.extensions_mut().insert(ConnectInfo(addr));
    }
    req
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[tokio::test]
async fn header_outranks_peer_address() {
    let req = request(
        "/ip",
        &[("x-client-ip", "203.0.113.7")],
        Some("45.0.0.40:8080"),
    );
    let response = app().oneshot(req).await.expect("call service");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "203.0.113.7");
}

#[tokio::test]
async fn peer_address_is_the_fallback() {
    let req = request("/ip", &[], Some("45.0.0.40:8080"));
    let response = app().oneshot(req).await.expect("call service");
    assert_eq!(body_string(response).await, "45.0.0.40");
}

#[tokio::test]
async fn ipv6_peer_address_resolves() {
    let req = request("/ip", &[], Some("[2001:db8::1]:9000"));
    let response = app().oneshot(req).await.expect("call service");
    assert_eq!(body_string(response).await, "2001:db8::1");
}

#[tokio::test]
async fn forwarded_chain_through_the_stack() {
    let req = request(
        "/ip",
        &[("x-forwarded-for", "unknown, 10.0.0.1:12345, 10.0.0.2")],
        Some("45.0.0.40:8080"),
    );
    let response = app().oneshot(req).await.expect("call service");
    assert_eq!(body_string(response).await, "10.0.0.1");
}

#[tokio::test]
async fn unresolvable_request_still_reaches_the_handler() {
    let req = request("/ip", &[("x-real-ip", "not-an-ip")], None);
    let response = app().oneshot(req).await.expect("call service");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "-");
}

#[tokio::test]
async fn strict_extractor_rejects_when_unresolved() {
    let req = request("/strict", &[], None);
    let response = app().oneshot(req).await.expect("call service");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn strict_extractor_rejects_without_the_layer() {
    let bare = Router::new().route(
        "/strict",
        get(|ClientIp(ip): ClientIp| async move { ip.to_string() }),
    );
    let req = request("/strict", &[("x-client-ip", "203.0.113.7")], None);
    let response = bare.oneshot(req).await.expect("call service");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn headers_are_not_mutated() {
    let echo = Router::new()
        .route(
            "/echo",
            get(|req: Request| async move {
                let xff = req
                    .headers()
                    .get("x-forwarded-for")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_owned();
                let ip = client_ip(req.extensions())
                    .map_or_else(|| "-".to_owned(), |ip| ip.to_string());
                format!("{xff}|{ip}")
            }),
        )
        .layer(ClientIpLayer);

    let req = request("/echo", &[("x-forwarded-for", "unknown, 10.0.0.1")], None);
    let response = echo.oneshot(req).await.expect("call service");
    assert_eq!(body_string(response).await, "unknown, 10.0.0.1|10.0.0.1");
}
