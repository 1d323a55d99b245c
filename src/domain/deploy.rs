//! Deployment results and upstream outcomes.

use serde::Serialize;

/// Message returned alongside every successful deployment.
pub const DEPLOY_SUCCESS_MESSAGE: &str = "HTML packaged and uploaded successfully";

/// Final result handed back to callers of a deployment.
///
/// Only successful deployments produce this value; failures travel through
/// [`crate::application::error::DeployError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub success: bool,
    pub message: String,
    pub preview_url: String,
}

impl DeployResult {
    pub fn succeeded(preview_url: impl Into<String>) -> Self {
        Self {
            success: true,
            message: DEPLOY_SUCCESS_MESSAGE.to_string(),
            preview_url: preview_url.into(),
        }
    }
}

/// Classified result of a single upload to the preview platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The platform accepted the archive. `url` is empty when the platform
    /// omitted `info.url` from its response.
    Success { url: String },
    /// The platform answered with a non-success HTTP status.
    UpstreamStatusError { code: u16 },
    /// The exchange could not complete (connect, DNS, timeout, body read).
    UpstreamTransportError { detail: String },
    /// The platform answered 2xx but flagged an application-level failure.
    UpstreamLogicError { message: String },
    /// The platform answered 2xx with a body that is not a JSON object.
    MalformedResponse { detail: String },
}

impl UploadOutcome {
    /// Short label used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadOutcome::Success { .. } => "success",
            UploadOutcome::UpstreamStatusError { .. } => "upstream_status",
            UploadOutcome::UpstreamTransportError { .. } => "upstream_transport",
            UploadOutcome::UpstreamLogicError { .. } => "upstream_logic",
            UploadOutcome::MalformedResponse { .. } => "malformed_response",
        }
    }
}
