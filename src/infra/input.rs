//! Reading HTML documents for one-shot deployments.

use std::path::Path;

use tokio::io::AsyncReadExt;

use super::error::InfraError;

/// Read raw document bytes from `path`, or from standard input when the path
/// is absent or `-`.
pub async fn read_document(path: Option<&Path>) -> Result<Vec<u8>, InfraError> {
    match path {
        Some(path) if path != Path::new("-") => Ok(tokio::fs::read(path).await?),
        _ => {
            let mut buffer = Vec::new();
            tokio::io::stdin().read_to_end(&mut buffer).await?;
            Ok(buffer)
        }
    }
}
