//! Seam between the deployment pipeline and the preview-hosting platform.

use async_trait::async_trait;

use crate::application::archive::Archive;
use crate::domain::deploy::UploadOutcome;

/// A destination that accepts packaged archives.
///
/// Implementations make exactly one attempt per call and report every
/// expected failure as an [`UploadOutcome`] variant instead of an error.
#[async_trait]
pub trait PreviewPlatform: Send + Sync {
    async fn upload(&self, archive: Archive) -> UploadOutcome;
}
