use crate::command::{CommandRunner, SystemCommandRunner};
use crate::config::ReleaseConfig;
use crate::error::InstallError;
use anyhow::Result;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Why a directory was picked as the install target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    Explicit,
    Convention,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    pub dir: PathBuf,
    pub source: TargetSource,
}

/// Candidate directories, gathered before precedence is applied.
#[derive(Debug, Clone, Default)]
pub struct TargetInputs {
    pub explicit: Option<PathBuf>,
    pub convention: Option<PathBuf>,
    pub default: Option<PathBuf>,
}

impl TargetInputs {
    /// Collect candidates from the CLI argument, the environment and the home directory.
    pub fn resolve<F>(
        cli_dir: Option<&Path>,
        config: &ReleaseConfig,
        windows: bool,
        home: Option<PathBuf>,
        lookup: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = cli_dir
            .map(Path::to_path_buf)
            .or_else(|| {
                lookup(&config.env.install_dir)
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from)
            })
            .map(|dir| expand_tilde(&dir, home.as_deref()))
            .map(|dir| std::path::absolute(&dir).unwrap_or(dir));

        let convention = lookup(&config.env.convention_home)
            .filter(|v| !v.trim().is_empty())
            .map(|cargo_home| PathBuf::from(cargo_home).join("bin"))
            .or_else(|| home.as_ref().map(|h| h.join(".cargo").join("bin")));

        let default = if windows {
            dirs::data_local_dir()
                .or_else(|| home.as_ref().map(|h| h.join("AppData").join("Local")))
                .map(|d| d.join("Programs").join(&config.binary).join("bin"))
        } else {
            home.as_ref().map(|h| h.join(".local").join("bin"))
        };

        Self {
            explicit,
            convention,
            default,
        }
    }

    /// Explicit override, then an existing convention directory, then the platform default.
    pub fn choose(&self) -> Result<InstallTarget, InstallError> {
        if let Some(dir) = &self.explicit {
            return Ok(InstallTarget {
                dir: dir.clone(),
                source: TargetSource::Explicit,
            });
        }

        if let Some(dir) = self.convention.as_ref().filter(|d| d.is_dir()) {
            return Ok(InstallTarget {
                dir: dir.clone(),
                source: TargetSource::Convention,
            });
        }

        self.default
            .as_ref()
            .map(|dir| InstallTarget {
                dir: dir.clone(),
                source: TargetSource::Default,
            })
            .ok_or_else(|| InstallError::InstallFailed {
                path: PathBuf::new(),
                reason: "no home directory to derive a default install location from".to_string(),
            })
    }
}

fn expand_tilde(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Performs filesystem changes the current user is not allowed to make.
pub trait PrivilegedMover: Send + Sync {
    fn create_dir(&self, dir: &Path) -> Result<()>;
    fn move_file(&self, from: &Path, to: &Path) -> Result<()>;
}

/// Elevation through `sudo`.
pub struct SudoMover {
    runner: Box<dyn CommandRunner>,
}

impl SudoMover {
    pub fn new(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn sudo(&self, args: &[String]) -> Result<()> {
        let output = self.runner.run("sudo", args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("sudo {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(())
    }
}

impl PrivilegedMover for SudoMover {
    fn create_dir(&self, dir: &Path) -> Result<()> {
        self.sudo(&["mkdir".to_string(), "-p".to_string(), dir.display().to_string()])
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        self.sudo(&[
            "mv".to_string(),
            "-f".to_string(),
            from.display().to_string(),
            to.display().to_string(),
        ])
    }
}

/// Used where no elevation mechanism exists.
pub struct NoElevation;

impl PrivilegedMover for NoElevation {
    fn create_dir(&self, _dir: &Path) -> Result<()> {
        anyhow::bail!("elevated privileges are not available")
    }

    fn move_file(&self, _from: &Path, _to: &Path) -> Result<()> {
        anyhow::bail!("elevated privileges are not available")
    }
}

/// `sudo` when it is on PATH, otherwise nothing.
pub fn system_mover() -> Box<dyn PrivilegedMover> {
    if cfg!(unix) && which::which("sudo").is_ok() {
        Box::new(SudoMover::new(Box::new(SystemCommandRunner)))
    } else {
        Box::new(NoElevation)
    }
}

/// Another executable that `which` resolves before the installed one.
pub fn shadowed_by(file_name: &str, installed: &Path) -> Option<PathBuf> {
    let resolved = which::which(file_name).ok()?;
    let same = match (resolved.canonicalize(), installed.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => resolved == installed,
    };
    (!same).then_some(resolved)
}

#[derive(Debug, Clone)]
pub struct InstalledBinary {
    pub path: PathBuf,
    pub elevated: bool,
}

/// Move `executable` into `dir` as `file_name`, replacing any previous copy.
pub fn install(
    executable: &Path,
    dir: &Path,
    file_name: &str,
    mover: &dyn PrivilegedMover,
) -> Result<InstalledBinary, InstallError> {
    let mut elevated = false;

    if let Err(e) = std::fs::create_dir_all(dir) {
        if e.kind() != ErrorKind::PermissionDenied {
            return Err(InstallError::InstallFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            });
        }
        log::debug!("Creating {} needs elevation", dir.display());
        mover
            .create_dir(dir)
            .map_err(|e| InstallError::PermissionDenied {
                path: dir.to_path_buf(),
                reason: format!("{:#}", e),
            })?;
        elevated = true;
    }

    let dest = dir.join(file_name);

    match place(executable, &dest) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            log::debug!("Moving into {} needs elevation", dir.display());
            mover
                .move_file(executable, &dest)
                .map_err(|e| InstallError::PermissionDenied {
                    path: dest.clone(),
                    reason: format!("{:#}", e),
                })?;
            elevated = true;
        }
        Err(e) => {
            return Err(InstallError::InstallFailed {
                path: dest,
                reason: e.to_string(),
            });
        }
    }

    verify(&dest)?;

    Ok(InstalledBinary {
        path: dest,
        elevated,
    })
}

/// Whole-file replacement: rename, or copy beside the destination and rename over it.
fn place(src: &Path, dest: &Path) -> io::Result<()> {
    match std::fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(e),
        Err(e) => {
            log::debug!("rename failed ({}), copying into place instead", e);
            copy_then_swap(src, dest)
        }
    }
}

fn copy_then_swap(src: &Path, dest: &Path) -> io::Result<()> {
    let dir = dest
        .parent()
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "destination has no parent"))?;

    let mut staged = tempfile::Builder::new()
        .prefix(".enuma-install-")
        .tempfile_in(dir)?;
    let mut source = std::fs::File::open(src)?;
    io::copy(&mut source, staged.as_file_mut())?;
    crate::extract::make_executable(staged.path())?;

    staged.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

fn verify(dest: &Path) -> Result<(), InstallError> {
    let failed = |reason: String| InstallError::InstallFailed {
        path: dest.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(dest).map_err(|e| failed(format!("not found after install: {}", e)))?;
    if !metadata.is_file() {
        return Err(failed("installed path is not a regular file".to_string()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(failed("installed file is not executable".to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_expands_against_home() {
        let home = Path::new("/home/someone");
        assert_eq!(
            expand_tilde(Path::new("~/bin"), Some(home)),
            PathBuf::from("/home/someone/bin")
        );
        assert_eq!(expand_tilde(Path::new("/opt/bin"), Some(home)), PathBuf::from("/opt/bin"));
        assert_eq!(expand_tilde(Path::new("~/bin"), None), PathBuf::from("~/bin"));
    }

    #[test]
    fn missing_default_is_an_install_failure() {
        let err = TargetInputs::default().choose().unwrap_err();
        assert!(matches!(err, InstallError::InstallFailed { .. }));
    }
}
