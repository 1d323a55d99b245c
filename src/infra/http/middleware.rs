use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub(crate) const REQUEST_ID_HEADER: &str = "x-request-id";

/// Run the request inside a span carrying a fresh request id, so deploy and
/// upstream events can be tied back to the response that reported them.
pub async fn set_request_context(request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Log every 4xx/5xx response together with the diagnostics its handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let elapsed_ms = start.elapsed().as_millis();
    let report = response.extensions_mut().remove::<ErrorReport>();
    let (source, code, messages) = match report {
        Some(report) => (report.source, report.code, report.messages),
        None => ("unknown", None, Vec::new()),
    };
    let code = code.unwrap_or("unclassified");
    let detail = messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());

    if status.is_server_error() {
        error!(
            target = "pagedrop::http::response",
            status = status.as_u16(),
            code,
            elapsed_ms,
            source,
            detail = %detail,
            chain = ?messages,
            "request failed",
        );
    } else {
        warn!(
            target = "pagedrop::http::response",
            status = status.as_u16(),
            code,
            elapsed_ms,
            source,
            detail = %detail,
            "client request error",
        );
    }

    response
}
