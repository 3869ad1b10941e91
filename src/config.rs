use crate::error::InstallError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where releases live and which environment variables steer the installer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReleaseConfig {
    pub binary: String,
    pub owner: String,
    pub repo: String,
    pub api_base: String,
    pub download_base: String,
    pub user_agent: String,
    pub index_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub env: EnvNames,
    #[serde(skip)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnvNames {
    pub install_dir: String,
    pub repo: String,
    pub convention_home: String,
    pub debug: String,
    #[serde(default)]
    pub tokens: Vec<String>,
}

impl ReleaseConfig {
    /// Bundled defaults only, without looking at the environment.
    pub fn bundled() -> Result<Self, InstallError> {
        let bundled = include_str!("../data/release.toml");
        toml::from_str(bundled).map_err(|e| InstallError::Config(e.to_string()))
    }

    /// Bundled defaults with environment overrides applied.
    pub fn load() -> Result<Self, InstallError> {
        let mut config = Self::bundled()?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), InstallError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(slug) = lookup(&self.env.repo).filter(|s| !s.trim().is_empty()) {
            let (owner, repo) = slug
                .trim()
                .split_once('/')
                .filter(|(o, r)| !o.is_empty() && !r.is_empty() && !r.contains('/'))
                .ok_or_else(|| {
                    InstallError::Config(format!(
                        "{} must look like owner/repo, got '{}'",
                        self.env.repo, slug
                    ))
                })?;
            self.owner = owner.to_string();
            self.repo = repo.to_string();
        }

        self.token = self
            .env
            .tokens
            .iter()
            .find_map(|name| lookup(name))
            .filter(|t| !t.trim().is_empty());

        Ok(())
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}
