use crate::color::{Colors, DOWNLOAD, PACKAGE, SEARCH};
use crate::config::ReleaseConfig;
use crate::error::{FailedAttempt, InstallError};
use crate::extract::materialize;
use crate::fetch::fetch;
use crate::github::{CandidateAsset, ReleaseVersion, candidates, latest_version};
use crate::http::HttpClient;
use crate::install::{InstallTarget, InstalledBinary, PrivilegedMover, TargetInputs, install};
use crate::path::{PathOutcome, PathStore, ensure_on_path};
use crate::platform::Platform;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Progress of one install run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    PlatformDetected,
    VersionResolved,
    Downloaded,
    Extracted,
    Installed,
    PathEnsured,
    Done,
}

impl Stage {
    /// The step that has to succeed to reach this stage.
    pub fn step(&self) -> &'static str {
        match self {
            Stage::Start => "workspace setup",
            Stage::PlatformDetected => "platform detection",
            Stage::VersionResolved => "version resolution",
            Stage::Downloaded => "download",
            Stage::Extracted => "extraction",
            Stage::Installed => "installation",
            Stage::PathEnsured => "PATH registration",
            Stage::Done => "completion",
        }
    }
}

/// Terminal state of a run that did not reach `Done`.
#[derive(Debug)]
pub struct Failure {
    pub stage: Stage,
    pub error: InstallError,
    pub workspace: Option<PathBuf>,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage.step(), self.error)
    }
}

// The wrapped error is already part of the message.
impl std::error::Error for Failure {}

#[derive(Debug)]
pub struct Report {
    pub stage: Stage,
    pub platform: Platform,
    pub version: ReleaseVersion,
    pub asset: CandidateAsset,
    /// Candidates that were tried and skipped before `asset`.
    pub skipped: Vec<FailedAttempt>,
    pub target: InstallTarget,
    pub installed: InstalledBinary,
    pub sha256: String,
    pub path: PathOutcome,
    pub workspace: PathBuf,
}

pub struct Pipeline<'a> {
    config: ReleaseConfig,
    http: &'a dyn HttpClient,
    mover: &'a dyn PrivilegedMover,
    path_store: &'a dyn PathStore,
    targets: TargetInputs,
    host: (String, String),
    workspace_root: Option<PathBuf>,
}

type StepResult<T> = Result<T, (Stage, InstallError)>;

impl<'a> Pipeline<'a> {
    pub fn new(
        config: ReleaseConfig,
        http: &'a dyn HttpClient,
        mover: &'a dyn PrivilegedMover,
        path_store: &'a dyn PathStore,
        targets: TargetInputs,
    ) -> Self {
        Self {
            config,
            http,
            mover,
            path_store,
            targets,
            host: (
                std::env::consts::OS.to_string(),
                std::env::consts::ARCH.to_string(),
            ),
            workspace_root: None,
        }
    }

    /// Pretend to run on another OS/architecture.
    pub fn with_host(mut self, os: &str, arch: &str) -> Self {
        self.host = (os.to_string(), arch.to_string());
        self
    }

    /// Create workspaces under `root` instead of the system temp directory.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub async fn run(&self) -> Result<Report, Failure> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("enuma-install-");
            builder
        };
        let workspace = match &self.workspace_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| Failure {
            stage: Stage::Start,
            error: InstallError::Workspace(e),
            workspace: None,
        })?;

        let workspace_path = workspace.path().to_path_buf();
        log::debug!("Workspace: {}", workspace_path.display());

        let result = self.run_in(&workspace_path).await;

        if let Err(e) = workspace.close() {
            log::debug!("Failed to remove workspace: {}", e);
        }

        result.map_err(|(stage, error)| Failure {
            stage,
            error,
            workspace: Some(workspace_path),
        })
    }

    async fn run_in(&self, workspace: &Path) -> StepResult<Report> {
        let config = &self.config;

        let platform = Platform::from_parts(&self.host.0, &self.host.1)
            .map_err(|e| (Stage::PlatformDetected, e))?;
        println!("{} Platform: {}", SEARCH, Colors::info(platform.triple.as_str()));

        let version = latest_version(self.http, config)
            .await
            .map_err(|e| (Stage::VersionResolved, e))?;
        println!(
            "{} Latest {} release: {}",
            PACKAGE,
            config.binary,
            Colors::version(version.as_str())
        );

        let (asset, fetched, skipped) = self.download(&version, &platform, workspace).await?;

        let executable_name = platform.executable_name(&config.binary);
        let executable = materialize(&fetched, asset.form, &executable_name, workspace)
            .await
            .map_err(|e| (Stage::Extracted, e))?;

        let target = self.targets.choose().map_err(|e| (Stage::Installed, e))?;
        let installed = install(&executable, &target.dir, &executable_name, self.mover)
            .map_err(|e| (Stage::Installed, e))?;
        let sha256 = digest(&installed.path).map_err(|e| (Stage::Installed, e))?;

        let path = ensure_on_path(self.path_store, &target.dir, platform.is_windows());
        log::debug!("PATH registration: {:?}", path);

        Ok(Report {
            stage: Stage::Done,
            platform,
            version,
            asset,
            skipped,
            target,
            installed,
            sha256,
            path,
            workspace: workspace.to_path_buf(),
        })
    }

    /// Try each candidate in order; only running out of candidates is fatal.
    async fn download(
        &self,
        version: &ReleaseVersion,
        platform: &Platform,
        workspace: &Path,
    ) -> StepResult<(CandidateAsset, PathBuf, Vec<FailedAttempt>)> {
        let mut attempts = Vec::new();

        for candidate in candidates(&self.config, version, platform) {
            println!("{} Downloading {}", DOWNLOAD, Colors::muted(&candidate.url));
            match fetch(self.http, &candidate, workspace).await {
                Ok(path) => return Ok((candidate, path, attempts)),
                Err(InstallError::FetchFailed(attempt)) => {
                    log::debug!("Candidate unavailable: {}", attempt);
                    attempts.push(attempt);
                }
                Err(e) => return Err((Stage::Downloaded, e)),
            }
        }

        Err((Stage::Downloaded, InstallError::DownloadFailed { attempts }))
    }
}

fn digest(path: &Path) -> Result<String, InstallError> {
    let bytes = std::fs::read(path).map_err(|e| InstallError::InstallFailed {
        path: path.to_path_buf(),
        reason: format!("could not read installed file: {}", e),
    })?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
