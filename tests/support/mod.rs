#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{Multipart, State},
    http::{Request, StatusCode, header::CONTENT_TYPE},
    routing::post,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::ServiceExt;
use url::Url;
use zip::ZipArchive;

use pagedrop::config::UpstreamSettings;

pub fn upstream_settings(base_url: &str, timeout: Duration) -> UpstreamSettings {
    UpstreamSettings {
        base_url: Url::parse(base_url).expect("valid base url"),
        code: "test-code".to_string(),
        timeout,
    }
}

/// Base URL of a port nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

/// Decode a single-entry archive, returning the entry name and content.
pub fn read_single_entry(bytes: &[u8]) -> (String, Vec<u8>) {
    let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).expect("readable archive");
    assert_eq!(archive.len(), 1, "archive must hold exactly one entry");
    let mut entry = archive.by_index(0).expect("entry");
    let mut content = Vec::new();
    entry.read_to_end(&mut content).expect("entry content");
    (entry.name().to_string(), content)
}

pub async fn send_json(app: &Router, uri: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
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
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[derive(Debug, Clone)]
pub struct CapturedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone)]
struct CaptureState {
    requests: Arc<Mutex<Vec<Vec<CapturedField>>>>,
    reply: Value,
}

/// A stand-in preview platform that records every multipart upload it receives.
pub struct CaptureServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Vec<CapturedField>>>>,
}

impl CaptureServer {
    pub async fn start(reply: Value) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = CaptureState {
            requests: requests.clone(),
            reply,
        };

        let app = Router::new()
            .route("/api/uploadProjectDirect", post(capture_upload))
            .with_state(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub async fn requests(&self) -> Vec<Vec<CapturedField>> {
        self.requests.lock().await.clone()
    }
}

async fn capture_upload(State(state): State<CaptureState>, mut multipart: Multipart) -> Json<Value> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.expect("field bytes").to_vec();
        fields.push(CapturedField {
            name,
            file_name,
            content_type,
            data,
        });
    }
    state.requests.lock().await.push(fields);
    Json(state.reply.clone())
}
