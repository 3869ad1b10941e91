use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One download attempt that did not produce a file.
#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub url: String,
    pub reason: String,
}

impl fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("unsupported platform: {os}-{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("could not resolve the latest release of {repo}: {reason}")]
    ResolutionFailed { repo: String, reason: String },

    #[error("could not fetch {0}")]
    FetchFailed(FailedAttempt),

    #[error("no release asset could be fetched, tried:\n{}", format_attempts(.attempts))]
    DownloadFailed { attempts: Vec<FailedAttempt> },

    #[error("could not extract {}: {reason}", .path.display())]
    ExtractFailed { path: PathBuf, reason: String },

    #[error("permission denied writing to {}: {reason}", .path.display())]
    PermissionDenied { path: PathBuf, reason: String },

    #[error("could not install into {}: {reason}", .path.display())]
    InstallFailed { path: PathBuf, reason: String },

    #[error("could not update PATH in {location}: {reason}")]
    PathUpdateFailed { location: String, reason: String },

    #[error("could not create a temporary workspace: {0}")]
    Workspace(std::io::Error),
}

fn format_attempts(attempts: &[FailedAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("  - {}", a))
        .collect::<Vec<_>>()
        .join("\n")
}
