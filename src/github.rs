use crate::config::ReleaseConfig;
use crate::error::InstallError;
use crate::http::{HttpClient, RequestKind};
use crate::platform::Platform;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: Option<serde_json::Value>,
}

/// Release tag exactly as the index reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetForm {
    Archive,
    BareExecutable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAsset {
    pub url: String,
    pub name: String,
    pub form: AssetForm,
}

pub fn latest_release_url(config: &ReleaseConfig) -> String {
    format!(
        "{}/repos/{}/{}/releases/latest",
        config.api_base.trim_end_matches('/'),
        config.owner,
        config.repo
    )
}

/// Ask the release index for the newest published tag.
pub async fn latest_version(
    http: &dyn HttpClient,
    config: &ReleaseConfig,
) -> Result<ReleaseVersion, InstallError> {
    let url = latest_release_url(config);
    let failed = |reason: String| InstallError::ResolutionFailed {
        repo: config.slug(),
        reason,
    };

    log::debug!("Resolving latest release via {}", url);

    let response = http
        .get(&url, RequestKind::Index)
        .await
        .map_err(|e| failed(format!("{:#}", e)))?;

    if !response.is_success() {
        return Err(failed(format!("{} returned HTTP {}", url, response.status)));
    }

    let release: Release = serde_json::from_slice(&response.body)
        .map_err(|e| failed(format!("unreadable release document: {}", e)))?;

    match release.tag_name {
        Some(serde_json::Value::String(tag)) if !tag.trim().is_empty() => {
            Ok(ReleaseVersion::new(tag))
        }
        Some(_) => Err(failed("tag_name is not a non-empty string".to_string())),
        None => Err(failed("release document has no tag_name".to_string())),
    }
}

/// Download candidates for a release, most preferred first.
pub fn candidates(
    config: &ReleaseConfig,
    version: &ReleaseVersion,
    platform: &Platform,
) -> Vec<CandidateAsset> {
    let stem = format!("{}-{}", config.binary, platform.triple);
    let forms = [
        (format!("{}.{}", stem, platform.archive_ext()), AssetForm::Archive),
        (format!("{}{}", stem, platform.exe_suffix()), AssetForm::BareExecutable),
    ];

    forms
        .into_iter()
        .map(|(name, form)| CandidateAsset {
            url: format!(
                "{}/{}/{}/releases/download/{}/{}",
                config.download_base.trim_end_matches('/'),
                config.owner,
                config.repo,
                version,
                name
            ),
            name,
            form,
        })
        .collect()
}
