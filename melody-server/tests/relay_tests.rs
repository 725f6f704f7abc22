//! Integration tests for the audio relay
//!
//! A throwaway axum server on an ephemeral port stands in for the remote
//! audio host.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Redirect},
    routing::get,
    Router,
};
use melody_server::config::ServerConfig;
use melody_server::{build_router, AppState};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const AUDIO: &[u8] = b"0123456789abcdefghij";

/// Serves `AUDIO`, honouring a simple `bytes=start-end` range
async fn serve_audio(headers: HeaderMap) -> impl IntoResponse {
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
        .and_then(|v| v.split_once('-'))
        .and_then(|(start, end)| Some((start.parse::<usize>().ok()?, end.parse::<usize>().ok()?)));

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    match range {
        Some((start, end)) if start <= end && end < AUDIO.len() => (
            StatusCode::PARTIAL_CONTENT,
            [
                (header::CONTENT_TYPE, "audio/ogg".to_string()),
                (
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, AUDIO.len()),
                ),
                (header::HeaderName::from_static("x-seen-agent"), user_agent),
            ],
            AUDIO[start..=end].to_vec(),
        )
            .into_response(),
        _ => (
            [(header::HeaderName::from_static("x-seen-agent"), user_agent)],
            AUDIO.to_vec(),
        )
            .into_response(),
    }
}

/// Echoes the forwarded `If-Range` value as the body
async fn echo_if_range(headers: HeaderMap) -> impl IntoResponse {
    headers
        .get(header::IF_RANGE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string()
}

async fn spawn_upstream() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Same server reached under another host name, which is not allow-listed
    let offsite = format!("http://localhost:{}/song.mp3", addr.port());
    let onsite = format!("http://{}/song.mp3", addr);

    let app = Router::new()
        .route("/song.mp3", get(serve_audio))
        .route("/gone.mp3", get(|| async { StatusCode::GONE }))
        .route("/echo.mp3", get(echo_if_range))
        .route(
            "/slow.mp3",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                AUDIO.to_vec()
            }),
        )
        .route(
            "/hop.mp3",
            get(move || async move { Redirect::temporary(&offsite) }),
        )
        .route(
            "/moved.mp3",
            get(move || async move { Redirect::temporary(&onsite) }),
        );

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn setup_app(allowed: &[&str]) -> (Router, TempDir) {
    setup_app_with_timeout(allowed, Duration::from_secs(5))
}

fn setup_app_with_timeout(allowed: &[&str], proxy_timeout: Duration) -> (Router, TempDir) {
    let root = tempfile::tempdir().unwrap();
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect_lazy("sqlite::memory:")
        .unwrap();

    let config = ServerConfig {
        root_folder: root.path().to_path_buf(),
        bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        proxy_allowed_hosts: allowed.iter().map(|h| h.to_string()).collect(),
        proxy_timeout,
        app_url: None,
        upload_limit_mb: 1,
        seed: false,
    };

    let state = AppState::new(pool, &config).unwrap();
    (build_router(state), root)
}

fn proxy_request(target: &str, range: Option<&str>) -> Request<Body> {
    let uri = format!("/audio/proxy?url={}", urlencoding::encode(target));
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(range) = range {
        builder = builder.header(header::RANGE, range);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

#[tokio::test]
async fn test_relay_streams_full_body_with_defaults() {
    let upstream = spawn_upstream().await;
    let (app, _root) = setup_app(&["127.0.0.1"]);

    let response = app
        .oneshot(proxy_request(&format!("http://{}/song.mp3", upstream), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(headers[header::CONTENT_LENGTH], AUDIO.len().to_string().as_str());
    assert!(headers.get("x-seen-agent").is_none(), "upstream headers must not leak");
    assert_eq!(body_bytes(response.into_body()).await, AUDIO);
}

#[tokio::test]
async fn test_relay_forwards_range() {
    let upstream = spawn_upstream().await;
    let (app, _root) = setup_app(&["127.0.0.1"]);

    let response = app
        .oneshot(proxy_request(
            &format!("http://{}/song.mp3", upstream),
            Some("bytes=2-5"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/ogg");
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-5/20");
    assert_eq!(body_bytes(response.into_body()).await, b"2345");
}

#[tokio::test]
async fn test_relay_rejects_unsupported_scheme() {
    let (app, _root) = setup_app(&["127.0.0.1"]);

    let response = app
        .oneshot(proxy_request("file:///etc/passwd", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_relay_rejects_host_off_allow_list() {
    let upstream = spawn_upstream().await;
    let (app, _root) = setup_app(&["samplelib.com"]);

    let response = app
        .oneshot(proxy_request(&format!("http://{}/song.mp3", upstream), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_relay_missing_url_is_not_found() {
    let (app, _root) = setup_app(&["127.0.0.1"]);

    let request = Request::builder()
        .uri("/audio/proxy")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_relay_passes_through_upstream_failure() {
    let upstream = spawn_upstream().await;
    let (app, _root) = setup_app(&["127.0.0.1"]);

    let response = app
        .oneshot(proxy_request(&format!("http://{}/gone.mp3", upstream), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GONE);
}

#[tokio::test]
async fn test_relay_unreachable_upstream_is_bad_gateway() {
    // Bind and drop to get a port nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let (app, _root) = setup_app(&["127.0.0.1"]);

    let response = app
        .oneshot(proxy_request(&format!("http://127.0.0.1:{}/song.mp3", port), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_relay_forwards_if_range() {
    let upstream = spawn_upstream().await;
    let (app, _root) = setup_app(&["127.0.0.1"]);

    let uri = format!(
        "/audio/proxy?url={}",
        urlencoding::encode(&format!("http://{}/echo.mp3", upstream))
    );
    let request = Request::builder()
        .uri(uri)
        .header(header::IF_RANGE, "\"v1\"")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"\"v1\"");
}

#[tokio::test]
async fn test_relay_slow_upstream_is_bad_gateway() {
    let upstream = spawn_upstream().await;
    let (app, _root) = setup_app_with_timeout(&["127.0.0.1"], Duration::from_millis(200));

    let response = app
        .oneshot(proxy_request(&format!("http://{}/slow.mp3", upstream), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_relay_refuses_redirect_off_allow_list() {
    let upstream = spawn_upstream().await;
    let (app, _root) = setup_app(&["127.0.0.1"]);

    // The redirect target is refused when requested directly
    let direct = app
        .clone()
        .oneshot(proxy_request(
            &format!("http://localhost:{}/song.mp3", upstream.port()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(direct.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(proxy_request(&format!("http://{}/hop.mp3", upstream), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_ne!(body_bytes(response.into_body()).await, AUDIO);
}

#[tokio::test]
async fn test_relay_follows_redirect_within_allow_list() {
    let upstream = spawn_upstream().await;
    let (app, _root) = setup_app(&["127.0.0.1"]);

    let response = app
        .oneshot(proxy_request(&format!("http://{}/moved.mp3", upstream), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, AUDIO);
}
