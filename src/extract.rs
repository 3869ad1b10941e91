use crate::error::InstallError;
use crate::github::AssetForm;
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Archive;
use zip::ZipArchive;

/// Turn a fetched asset into a path to the executable it carries.
///
/// Archives are unpacked completely under `workspace/unpacked` and searched
/// for `executable_name`; a bare executable is used as-is.
pub async fn materialize(
    fetched: &Path,
    form: AssetForm,
    executable_name: &str,
    workspace: &Path,
) -> Result<PathBuf, InstallError> {
    let executable = match form {
        AssetForm::BareExecutable => fetched.to_path_buf(),
        AssetForm::Archive => {
            let archive = fetched.to_path_buf();
            let dest = workspace.join("unpacked");
            let name = executable_name.to_string();
            tokio::task::spawn_blocking(move || unpack_and_locate(&archive, &dest, &name))
                .await
                .map_err(|e| InstallError::ExtractFailed {
                    path: fetched.to_path_buf(),
                    reason: e.to_string(),
                })??
        }
    };

    make_executable(&executable).map_err(|e| InstallError::ExtractFailed {
        path: executable.clone(),
        reason: format!("could not mark executable: {}", e),
    })?;

    Ok(executable)
}

fn unpack_and_locate(archive: &Path, dest: &Path, executable_name: &str) -> Result<PathBuf, InstallError> {
    let failed = |reason: String| InstallError::ExtractFailed {
        path: archive.to_path_buf(),
        reason,
    };

    std::fs::create_dir_all(dest).map_err(|e| failed(e.to_string()))?;

    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_lowercase();

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let file = File::open(archive).map_err(|e| failed(e.to_string()))?;
        Archive::new(GzDecoder::new(file))
            .unpack(dest)
            .map_err(|e| failed(format!("corrupt tar.gz archive: {}", e)))?;
    } else if name.ends_with(".zip") {
        let file = File::open(archive).map_err(|e| failed(e.to_string()))?;
        let mut zip = ZipArchive::new(file).map_err(|e| failed(format!("corrupt zip archive: {}", e)))?;
        zip.extract(dest)
            .map_err(|e| failed(format!("corrupt zip archive: {}", e)))?;
    } else {
        return Err(failed(format!("unsupported archive format: {}", name)));
    }

    find_entry(dest, executable_name)
        .map_err(|e| failed(e.to_string()))?
        .ok_or_else(|| failed(format!("archive does not contain '{}'", executable_name)))
}

/// Shallowest regular file named `name` under `root`.
fn find_entry(root: &Path, name: &str) -> std::io::Result<Option<PathBuf>> {
    let mut level = vec![root.to_path_buf()];

    while !level.is_empty() {
        let mut next = Vec::new();
        for dir in level {
            let mut entries: Vec<_> = std::fs::read_dir(&dir)?.collect::<Result<_, _>>()?;
            entries.sort_by_key(|e| e.file_name());

            for entry in entries {
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    next.push(entry.path());
                } else if file_type.is_file() && entry.file_name() == name {
                    return Ok(Some(entry.path()));
                }
            }
        }
        level = next;
    }

    Ok(None)
}

#[cfg(unix)]
pub fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
