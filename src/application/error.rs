use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{application::archive::ArchiveError, config::LoadError, infra::error::InfraError};

/// Diagnostic details attached to failing responses for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub code: Option<&'static str>,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            code: None,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            code: None,
            status,
            messages: vec![message.into()],
        }
    }

    /// Tag the report with the machine-readable error code sent to the client.
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Classified failure of a single deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to package HTML: {0}")]
    Encoding(#[from] ArchiveError),
    #[error("upload to preview platform failed: HTTP {code}")]
    UpstreamStatus { code: u16 },
    #[error("could not connect to preview platform: {detail}")]
    UpstreamTransport { detail: String },
    #[error("preview platform returned an error: {message}")]
    UpstreamLogic { message: String },
    #[error("processing failed: {0}")]
    Internal(String),
}

impl DeployError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::Encoding(_) => "encoding_failed",
            DeployError::UpstreamStatus { .. } => "upstream_status",
            DeployError::UpstreamTransport { .. } => "upstream_transport",
            DeployError::UpstreamLogic { .. } => "upstream_logic",
            DeployError::Internal(_) => "internal_error",
        }
    }

    /// Whether the failure originated at the preview platform.
    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            DeployError::UpstreamStatus { .. }
                | DeployError::UpstreamTransport { .. }
                | DeployError::UpstreamLogic { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Deploy(#[from] DeployError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
