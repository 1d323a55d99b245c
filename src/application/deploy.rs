//! The deployment pipeline: package, upload, classify.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use crate::application::archive::ArchiveBuilder;
use crate::application::error::DeployError;
use crate::application::platform::PreviewPlatform;
use crate::domain::deploy::{DeployResult, UploadOutcome};
use crate::domain::submission::Submission;

pub(crate) const DEPLOY_TOTAL_METRIC: &str = "pagedrop_deploy_total";

/// Coordinates archive construction and the upstream upload for one submission.
///
/// The service is stateless; clones share the same platform client.
#[derive(Clone)]
pub struct DeployService {
    archives: ArchiveBuilder,
    platform: Arc<dyn PreviewPlatform>,
}

impl DeployService {
    pub fn new(platform: Arc<dyn PreviewPlatform>) -> Self {
        Self {
            archives: ArchiveBuilder::new(),
            platform,
        }
    }

    pub async fn deploy(&self, submission: Submission) -> Result<DeployResult, DeployError> {
        let result = self.run(submission).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.kind(),
        };
        counter!(DEPLOY_TOTAL_METRIC, "outcome" => outcome).increment(1);

        result
    }

    async fn run(&self, submission: Submission) -> Result<DeployResult, DeployError> {
        let archive = self.archives.build(&submission.html)?;
        debug!(
            target = "pagedrop::deploy",
            html_bytes = submission.html.len(),
            archive_bytes = archive.len(),
            "packaged submission"
        );
        drop(submission);

        let outcome = self.platform.upload(archive).await;
        debug!(
            target = "pagedrop::deploy",
            outcome = outcome.kind(),
            "upload finished"
        );

        let result = classify(outcome)?;
        info!(
            target = "pagedrop::deploy",
            preview_url = %result.preview_url,
            "deployment completed"
        );
        Ok(result)
    }
}

fn classify(outcome: UploadOutcome) -> Result<DeployResult, DeployError> {
    match outcome {
        UploadOutcome::Success { url } => {
            if url.is_empty() {
                warn!(
                    target = "pagedrop::deploy",
                    "preview platform reported success without info.url; returning an empty preview URL"
                );
            }
            Ok(DeployResult::succeeded(url))
        }
        UploadOutcome::UpstreamStatusError { code } => Err(DeployError::UpstreamStatus { code }),
        UploadOutcome::UpstreamTransportError { detail } => {
            Err(DeployError::UpstreamTransport { detail })
        }
        UploadOutcome::UpstreamLogicError { message } => {
            Err(DeployError::UpstreamLogic { message })
        }
        UploadOutcome::MalformedResponse { detail } => Err(DeployError::internal(detail)),
    }
}
