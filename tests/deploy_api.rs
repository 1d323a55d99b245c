mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use httpmock::MockServer;
use serde_json::{Value, json};
use tower::ServiceExt;

use pagedrop::application::deploy::DeployService;
use pagedrop::domain::deploy::DEPLOY_SUCCESS_MESSAGE;
use pagedrop::infra::http::{HttpState, build_router};
use pagedrop::infra::platform::PlatformClient;

use support::{CaptureServer, closed_port_url, read_single_entry, send_json, upstream_settings};

const BODY_LIMIT: usize = 1024 * 1024;

fn app(base_url: &str) -> Router {
    let client = PlatformClient::new(&upstream_settings(base_url, Duration::from_secs(5)))
        .expect("client");
    let deploy = DeployService::new(Arc::new(client));
    build_router(HttpState::new(deploy), BODY_LIMIT)
}

async fn upstream_replying(status: u16, body: &str) -> MockServer {
    let server = MockServer::start_async().await;
    let body = body.to_string();
    server
        .mock_async(move |when, then| {
            when.method("POST").path("/api/uploadProjectDirect");
            then.status(status)
                .header("content-type", "application/json")
                .body(body);
        })
        .await;
    server
}

async fn post_raw(app: &Router, content_type: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/deployHtml")
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("request should build");
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

#[tokio::test]
async fn deploy_returns_preview_url() {
    let upstream = CaptureServer::start(json!({
        "code": 200,
        "message": "ok",
        "info": {"url": "https://x/preview/abc"}
    }))
    .await;
    let app = app(&upstream.base_url);

    let html = "<!doctype html><html><body>hello</body></html>";
    let (status, body) = send_json(&app, "/deployHtml", json!({ "html": html }).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "message": DEPLOY_SUCCESS_MESSAGE,
            "previewUrl": "https://x/preview/abc",
        })
    );

    let requests = upstream.requests().await;
    assert_eq!(requests.len(), 1);
    let file = requests[0]
        .iter()
        .find(|f| f.name == "file")
        .expect("file field");
    let (_, content) = read_single_entry(&file.data);
    assert_eq!(content, html.as_bytes());
}

#[tokio::test]
async fn success_without_url_returns_empty_preview() {
    let upstream = upstream_replying(200, r#"{"code":200,"info":{}}"#).await;
    let app = app(&upstream.base_url());

    let (status, body) = send_json(&app, "/deployHtml", json!({ "html": "" }).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["previewUrl"], json!(""));
}

#[tokio::test]
async fn upstream_logic_failure_is_bad_gateway() {
    let upstream = upstream_replying(200, r#"{"code":500,"message":"quota exceeded"}"#).await;
    let app = app(&upstream.base_url());

    let (status, body) =
        send_json(&app, "/deployHtml", json!({ "html": "<p>x</p>" }).to_string()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], json!("upstream_logic"));
    let message = body["error"]["message"].as_str().expect("message");
    assert!(message.contains("quota exceeded"), "message: {message}");
}

#[tokio::test]
async fn upstream_status_failure_is_bad_gateway() {
    let upstream = upstream_replying(503, r#"{"code":200,"info":{"url":"https://x"}}"#).await;
    let app = app(&upstream.base_url());

    let (status, body) =
        send_json(&app, "/deployHtml", json!({ "html": "<p>x</p>" }).to_string()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], json!("upstream_status"));
    let message = body["error"]["message"].as_str().expect("message");
    assert!(message.contains("HTTP 503"), "message: {message}");
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let app = app(&closed_port_url().await);

    let (status, body) =
        send_json(&app, "/deployHtml", json!({ "html": "<p>x</p>" }).to_string()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], json!("upstream_transport"));
}

#[tokio::test]
async fn malformed_upstream_body_is_internal_error() {
    let upstream = upstream_replying(200, "not json at all").await;
    let app = app(&upstream.base_url());

    let (status, body) =
        send_json(&app, "/deployHtml", json!({ "html": "<p>x</p>" }).to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], json!("internal_error"));
}

#[tokio::test]
async fn missing_html_is_rejected_before_upload() {
    // An unreachable upstream would answer 502 if the pipeline ran.
    let app = app(&closed_port_url().await);

    let (status, body) =
        send_json(&app, "/deployHtml", json!({ "markup": "<p>x</p>" }).to_string()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("validation_failed"));
    assert!(body["error"]["hint"].is_string());
}

#[tokio::test]
async fn non_string_html_is_rejected() {
    let app = app(&closed_port_url().await);

    let (status, body) = send_json(&app, "/deployHtml", json!({ "html": 42 }).to_string()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("validation_failed"));
}

#[tokio::test]
async fn invalid_json_syntax_is_bad_request() {
    let app = app(&closed_port_url().await);

    let (status, body) = send_json(&app, "/deployHtml", "{\"html\": ".to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("validation_failed"));
}

#[tokio::test]
async fn health_does_not_contact_upstream() {
    let app = app(&closed_port_url().await);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .expect("request should build");
    let response = app.oneshot(request).await.expect("router should respond");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn non_json_content_type_is_unsupported_media_type() {
    let app = app(&closed_port_url().await);

    let body = json!({ "html": "<p>x</p>" }).to_string();
    let (status, body) = post_raw(&app, "text/plain", body).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"]["code"], json!("validation_failed"));
}

#[tokio::test]
async fn oversized_body_is_rejected_before_upload() {
    // An unreachable upstream would answer 502 if the pipeline ran.
    let app = app(&closed_port_url().await);

    let html = "x".repeat(BODY_LIMIT + 1);
    let (status, body) =
        post_raw(&app, "application/json", json!({ "html": html }).to_string()).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], json!("validation_failed"));
}
