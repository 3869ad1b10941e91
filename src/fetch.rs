use crate::error::{FailedAttempt, InstallError};
use crate::github::CandidateAsset;
use crate::http::{HttpClient, RequestKind};
use std::path::{Path, PathBuf};

/// Download one candidate into `dir`, named after the asset.
pub async fn fetch(
    http: &dyn HttpClient,
    candidate: &CandidateAsset,
    dir: &Path,
) -> Result<PathBuf, InstallError> {
    let failed = |reason: String| {
        InstallError::FetchFailed(FailedAttempt {
            url: candidate.url.clone(),
            reason,
        })
    };

    let response = http
        .get(&candidate.url, RequestKind::Download)
        .await
        .map_err(|e| failed(format!("{:#}", e)))?;

    if !response.is_success() {
        return Err(failed(format!("HTTP {}", response.status)));
    }

    if response.body.is_empty() {
        return Err(failed("empty response body".to_string()));
    }

    let path = dir.join(&candidate.name);
    tokio::fs::write(&path, &response.body)
        .await
        .map_err(|e| failed(format!("writing {}: {}", path.display(), e)))?;

    log::debug!(
        "Fetched {} ({} bytes) to {}",
        candidate.url,
        response.body.len(),
        path.display()
    );

    Ok(path)
}
