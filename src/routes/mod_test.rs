use super::*;
use crate::state::test_helpers;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_app(state: AppState) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    addr
}

async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn health_reports_counts() {
    let state = test_helpers::test_app_state();
    let (_client, _rx) = test_helpers::attach_client(&state).await;
    state
        .board
        .write()
        .await
        .canvas
        .create_shape(test_helpers::stroke("s1"));

    let Json(body) = health(State(state)).await;

    assert_eq!(body.status, "ok");
    assert!(body.timestamp > 0);
    assert_eq!(body.shapes, 1);
    assert_eq!(body.clients, 1);
}

#[tokio::test]
async fn health_endpoint_serves_json() {
    let addr = spawn_app(test_helpers::test_app_state()).await;

    let response = http_get(addr, "/health").await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#""status":"ok""#), "{response}");
}

#[tokio::test]
async fn ui_pages_are_served() {
    let addr = spawn_app(test_helpers::test_app_state()).await;

    for path in ["/", "/admin", "/atelier"] {
        let response = http_get(addr, path).await;
        assert!(response.starts_with("HTTP/1.1 200"), "{path}: {response}");
        assert!(response.contains("<html"), "{path}: {response}");
    }
}

#[tokio::test]
async fn unknown_asset_is_404() {
    let addr = spawn_app(test_helpers::test_app_state()).await;

    let response = http_get(addr, "/nope.js").await;

    assert!(response.starts_with("HTTP/1.1 404"), "{response}");
}
