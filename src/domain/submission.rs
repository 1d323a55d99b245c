//! Inbound HTML submissions.

use serde::Deserialize;

/// A complete HTML document submitted for deployment.
///
/// The markup is carried verbatim; empty documents are accepted and no
/// structural validation is performed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Submission {
    pub html: String,
}

impl Submission {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}
