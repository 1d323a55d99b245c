//! HTTP client for the preview-hosting platform.

use std::{
    error::Error as StdError,
    fmt,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use metrics::histogram;
use reqwest::{
    Client, Response,
    multipart::{Form, Part},
    redirect::Policy,
};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::application::archive::Archive;
use crate::application::platform::PreviewPlatform;
use crate::config::UpstreamSettings;
use crate::domain::deploy::UploadOutcome;

use super::error::InfraError;

/// Endpoint path, relative to the configured base URL, that accepts uploads.
pub const UPLOAD_PATH: &str = "/api/uploadProjectDirect";
/// File name announced for the archive part.
pub const UPLOAD_FILE_NAME: &str = "hello_project_mcp.zip";
pub const UPLOAD_CONTENT_TYPE: &str = "application/zip";

pub(crate) const UPSTREAM_LATENCY_METRIC: &str = "pagedrop_upstream_request_ms";

const SUCCESS_CODE: i64 = 200;
const UNKNOWN_ERROR_MESSAGE: &str = "unknown error";

/// Uploads archives to `{base_url}/api/uploadProjectDirect` as multipart forms.
///
/// Every call makes a single request bounded by the configured timeout.
/// Redirects are not followed, so a 3xx answer is reported as a status error.
#[derive(Clone)]
pub struct PlatformClient {
    client: Client,
    endpoint: Url,
    code: String,
    timeout: Duration,
}

impl fmt::Debug for PlatformClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl PlatformClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, InfraError> {
        let endpoint = upload_endpoint(&settings.base_url)?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client,
            endpoint,
            code: settings.code.clone(),
            timeout: settings.timeout,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("pagedrop/", env!("CARGO_PKG_VERSION"))
    }

    async fn send(&self, archive: Archive) -> Result<Response, reqwest::Error> {
        let part = Part::bytes(archive.into_bytes())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(UPLOAD_CONTENT_TYPE)?;
        let form = Form::new()
            .text("code", self.code.clone())
            .part("file", part);

        self.client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
    }

    async fn classify_response(&self, response: Response) -> UploadOutcome {
        let status = response.status();
        if !status.is_success() {
            return UploadOutcome::UpstreamStatusError {
                code: status.as_u16(),
            };
        }

        match response.bytes().await {
            Ok(body) => classify_body(&body),
            Err(err) => self.transport_failure(&err),
        }
    }

    fn transport_failure(&self, err: &reqwest::Error) -> UploadOutcome {
        let detail = if err.is_timeout() {
            format!("request timed out after {}s", self.timeout.as_secs_f64())
        } else {
            error_chain(err)
        };
        UploadOutcome::UpstreamTransportError { detail }
    }
}

#[async_trait]
impl PreviewPlatform for PlatformClient {
    async fn upload(&self, archive: Archive) -> UploadOutcome {
        let started = Instant::now();
        debug!(
            target = "pagedrop::upstream",
            endpoint = %self.endpoint,
            archive_bytes = archive.len(),
            "uploading archive"
        );

        let outcome = match self.send(archive).await {
            Ok(response) => self.classify_response(response).await,
            Err(err) => self.transport_failure(&err),
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!(UPSTREAM_LATENCY_METRIC).record(elapsed_ms);

        match &outcome {
            UploadOutcome::Success { .. } => debug!(
                target = "pagedrop::upstream",
                elapsed_ms,
                "preview platform accepted archive"
            ),
            failure => warn!(
                target = "pagedrop::upstream",
                elapsed_ms,
                outcome = failure.kind(),
                detail = ?failure,
                "preview platform upload failed"
            ),
        }

        outcome
    }
}

/// Build the absolute upload URL, tolerating a trailing slash on the base.
pub fn upload_endpoint(base_url: &Url) -> Result<Url, InfraError> {
    if base_url.query().is_some() || base_url.fragment().is_some() {
        return Err(InfraError::configuration(format!(
            "base URL `{base_url}` must not carry a query string or fragment"
        )));
    }
    let candidate = format!("{}{}", base_url.as_str().trim_end_matches('/'), UPLOAD_PATH);
    Url::parse(&candidate).map_err(|err| {
        InfraError::configuration(format!("invalid upload endpoint `{candidate}`: {err}"))
    })
}

/// Interpret a 2xx response body from the platform.
///
/// The body must be a JSON object; `code == 200` marks success and the
/// preview link is read from `info.url`.
pub fn classify_body(body: &[u8]) -> UploadOutcome {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => {
            return UploadOutcome::MalformedResponse {
                detail: format!("preview platform response is not valid JSON: {err}"),
            };
        }
    };

    let Some(object) = value.as_object() else {
        return UploadOutcome::MalformedResponse {
            detail: "preview platform response is not a JSON object".to_string(),
        };
    };

    if !is_success_code(object.get("code")) {
        let message = match object.get("message") {
            None | Some(Value::Null) => UNKNOWN_ERROR_MESSAGE.to_string(),
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
        };
        return UploadOutcome::UpstreamLogicError { message };
    }

    let url = object
        .get("info")
        .and_then(|info| info.get("url"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    UploadOutcome::Success { url }
}

/// Numeric comparison, so `200` and `200.0` both count. Strings never do.
fn is_success_code(code: Option<&Value>) -> bool {
    match code {
        Some(Value::Number(number)) => {
            number.as_i64() == Some(SUCCESS_CODE) || number.as_f64() == Some(SUCCESS_CODE as f64)
        }
        _ => false,
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(inner) = current {
        parts.push(inner.to_string());
        current = inner.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_yields_preview_url() {
        let outcome = classify_body(br#"{"code":200,"info":{"url":"https://x/preview/abc"}}"#);
        assert_eq!(
            outcome,
            UploadOutcome::Success {
                url: "https://x/preview/abc".to_string()
            }
        );
    }

    #[test]
    fn success_without_info_url_is_empty() {
        assert_eq!(
            classify_body(br#"{"code":200,"info":{}}"#),
            UploadOutcome::Success { url: String::new() }
        );
        assert_eq!(
            classify_body(br#"{"code":200}"#),
            UploadOutcome::Success { url: String::new() }
        );
    }

    #[test]
    fn non_success_code_carries_upstream_message() {
        assert_eq!(
            classify_body(br#"{"code":500,"message":"quota exceeded"}"#),
            UploadOutcome::UpstreamLogicError {
                message: "quota exceeded".to_string()
            }
        );
    }

    #[test]
    fn missing_message_falls_back() {
        assert_eq!(
            classify_body(br#"{"code":401}"#),
            UploadOutcome::UpstreamLogicError {
                message: UNKNOWN_ERROR_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn float_success_code_is_success() {
        assert_eq!(
            classify_body(br#"{"code":200.0,"info":{"url":"https://x/p"}}"#),
            UploadOutcome::Success {
                url: "https://x/p".to_string()
            }
        );
        assert!(matches!(
            classify_body(br#"{"code":200.5,"message":"odd"}"#),
            UploadOutcome::UpstreamLogicError { .. }
        ));
    }

    #[test]
    fn string_code_is_not_success() {
        let outcome = classify_body(br#"{"code":"200","message":"typed wrong"}"#);
        assert!(matches!(outcome, UploadOutcome::UpstreamLogicError { .. }));
    }

    #[test]
    fn non_json_and_non_object_bodies_are_malformed() {
        assert!(matches!(
            classify_body(b"<html>bad gateway</html>"),
            UploadOutcome::MalformedResponse { .. }
        ));
        assert!(matches!(
            classify_body(b"[1,2,3]"),
            UploadOutcome::MalformedResponse { .. }
        ));
    }

    #[test]
    fn endpoint_joins_base_with_or_without_trailing_slash() {
        let plain = Url::parse("https://html.example.com").expect("url");
        let slashed = Url::parse("https://html.example.com/prefix/").expect("url");

        assert_eq!(
            upload_endpoint(&plain).expect("endpoint").as_str(),
            "https://html.example.com/api/uploadProjectDirect"
        );
        assert_eq!(
            upload_endpoint(&slashed).expect("endpoint").as_str(),
            "https://html.example.com/prefix/api/uploadProjectDirect"
        );
    }

    #[test]
    fn endpoint_rejects_query_and_fragment() {
        for base in ["https://h.example/?tenant=a", "https://h.example/#top"] {
            let url = Url::parse(base).expect("url");
            assert!(
                matches!(upload_endpoint(&url), Err(InfraError::Configuration { .. })),
                "accepted {base}"
            );
        }
    }

    #[test]
    fn debug_output_hides_code() {
        let settings = UpstreamSettings {
            base_url: Url::parse("https://html.example.com").expect("url"),
            code: "top-secret".to_string(),
            timeout: Duration::from_secs(60),
        };
        let client = PlatformClient::new(&settings).expect("client");
        assert!(!format!("{client:?}").contains("top-secret"));
    }
}
