use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::{DeployError, ErrorReport};

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const ENCODING_FAILED: &str = "encoding_failed";
    pub const UPSTREAM_STATUS: &str = "upstream_status";
    pub const UPSTREAM_TRANSPORT: &str = "upstream_transport";
    pub const UPSTREAM_LOGIC: &str = "upstream_logic";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        let message = message.into();
        let report = ErrorReport::from_message(
            "infra::http::api",
            status,
            format!("{code}: {message}"),
        )
        .with_code(code);
        Self {
            status,
            code,
            message,
            hint,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            rejection.status(),
            codes::VALIDATION_FAILED,
            rejection.body_text(),
            Some("expected a JSON object with a string `html` field".to_string()),
        )
    }
}

impl From<DeployError> for ApiError {
    fn from(error: DeployError) -> Self {
        let (status, code) = match &error {
            DeployError::Encoding(_) => (StatusCode::INTERNAL_SERVER_ERROR, codes::ENCODING_FAILED),
            DeployError::UpstreamStatus { .. } => (StatusCode::BAD_GATEWAY, codes::UPSTREAM_STATUS),
            DeployError::UpstreamTransport { .. } => {
                (StatusCode::BAD_GATEWAY, codes::UPSTREAM_TRANSPORT)
            }
            DeployError::UpstreamLogic { .. } => (StatusCode::BAD_GATEWAY, codes::UPSTREAM_LOGIC),
            DeployError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL),
        };
        let report = ErrorReport::from_error("application::deploy::DeployService", status, &error)
            .with_code(code);
        Self {
            status,
            code,
            message: error.to_string(),
            hint: None,
            report,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        // Attach a structured report so shared logging middleware can emit rich diagnostics.
        self.report.attach(&mut response);
        response
    }
}
