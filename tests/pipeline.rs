mod common;

use anyhow::Result;
use common::*;
use enuma_install::error::InstallError;
use enuma_install::github::AssetForm;
use enuma_install::http::mock::MockHttpClient;
use enuma_install::install::{NoElevation, TargetInputs, TargetSource};
use enuma_install::path::PathOutcome;
use enuma_install::path::mock::MemoryPathStore;
use enuma_install::pipeline::{Pipeline, Stage};
use std::path::Path;

fn explicit(dir: &Path) -> TargetInputs {
    TargetInputs {
        explicit: Some(dir.to_path_buf()),
        ..TargetInputs::default()
    }
}

fn linux_pipeline<'a>(
    http: &'a MockHttpClient,
    store: &'a MemoryPathStore,
    install_dir: &Path,
    scratch: &Path,
) -> Pipeline<'a> {
    Pipeline::new(config(), http, &NoElevation, store, explicit(install_dir))
        .with_host("linux", "x86_64")
        .with_workspace_root(scratch)
}

#[tokio::test]
async fn test_archive_install_completes() -> Result<()> {
    let install_dir = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let http = http_with_release("v1.2.3");
    http.respond(
        LINUX_ARCHIVE_URL,
        200,
        tar_gz(&[
            ("enuma-x86_64-unknown-linux-gnu/README.md", b"docs"),
            ("enuma-x86_64-unknown-linux-gnu/enuma", b"#!/bin/sh\necho enuma\n"),
        ]),
    );
    let store = MemoryPathStore::new(&["/usr/bin"]);

    let report = linux_pipeline(&http, &store, install_dir.path(), scratch.path())
        .run()
        .await?;

    assert_eq!(report.stage, Stage::Done);
    assert_eq!(report.version.as_str(), "v1.2.3");
    assert_eq!(report.asset.form, AssetForm::Archive);
    assert!(report.skipped.is_empty());
    assert_eq!(report.target.source, TargetSource::Explicit);

    let installed = install_dir.path().join("enuma");
    assert_eq!(report.installed.path, installed);
    assert_eq!(std::fs::read(&installed)?, b"#!/bin/sh\necho enuma\n");
    assert_eq!(report.sha256.len(), 64);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&installed)?.permissions().mode();
        assert_ne!(mode & 0o111, 0, "installed file should be executable");
    }

    assert!(!report.workspace.exists());
    assert!(leftovers(scratch.path()).is_empty());
    Ok(())
}

#[tokio::test]
async fn test_fallback_to_bare_executable_after_404() -> Result<()> {
    let install_dir = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let http = http_with_release("v1.2.3");
    http.respond(LINUX_ARCHIVE_URL, 404, "Not Found");
    http.respond(LINUX_BARE_URL, 200, b"bare-binary".to_vec());
    let store = MemoryPathStore::new(&["/usr/bin"]);

    let report = linux_pipeline(&http, &store, install_dir.path(), scratch.path())
        .run()
        .await?;

    assert_eq!(report.stage, Stage::Done);
    assert_eq!(report.asset.form, AssetForm::BareExecutable);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].url, LINUX_ARCHIVE_URL);
    assert_eq!(std::fs::read(install_dir.path().join("enuma"))?, b"bare-binary");
    assert_eq!(http.requests(), vec![LATEST_URL, LINUX_ARCHIVE_URL, LINUX_BARE_URL]);
    Ok(())
}

#[tokio::test]
async fn test_all_candidates_failing_lists_every_url() -> Result<()> {
    let install_dir = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let http = http_with_release("v1.2.3");
    http.respond(LINUX_ARCHIVE_URL, 404, "Not Found");
    http.fail(LINUX_BARE_URL, "connection reset");
    let store = MemoryPathStore::new(&[]);

    let failure = linux_pipeline(&http, &store, install_dir.path(), scratch.path())
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Downloaded);
    assert!(matches!(failure.error, InstallError::DownloadFailed { ref attempts } if attempts.len() == 2));

    let message = failure.to_string();
    assert!(message.starts_with("download failed: no release asset"));
    assert_eq!(message.matches("download failed").count(), 1);
    assert!(message.contains(LINUX_ARCHIVE_URL));
    assert!(message.contains(LINUX_BARE_URL));
    assert!(message.contains("HTTP 404"));
    assert!(message.contains("connection reset"));

    assert!(leftovers(install_dir.path()).is_empty());
    assert!(leftovers(scratch.path()).is_empty());
    assert_eq!(store.appends(), 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_tag_stops_before_download() -> Result<()> {
    let install_dir = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let http = MockHttpClient::new();
    http.respond(LATEST_URL, 200, r#"{"name": "no tag here"}"#);
    let store = MemoryPathStore::new(&[]);

    let failure = linux_pipeline(&http, &store, install_dir.path(), scratch.path())
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::VersionResolved);
    assert!(matches!(failure.error, InstallError::ResolutionFailed { .. }));
    assert_eq!(http.requests(), vec![LATEST_URL]);
    assert!(leftovers(scratch.path()).is_empty());
    Ok(())
}

#[tokio::test]
async fn test_index_transport_error_is_resolution_failure() -> Result<()> {
    let install_dir = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let http = MockHttpClient::new();
    http.fail(LATEST_URL, "dns lookup failed");
    let store = MemoryPathStore::new(&[]);

    let failure = linux_pipeline(&http, &store, install_dir.path(), scratch.path())
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::VersionResolved);
    assert!(failure.to_string().contains("dns lookup failed"));
    assert_eq!(http.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_unsupported_platform_makes_no_requests() -> Result<()> {
    let install_dir = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let http = http_with_release("v1.2.3");
    let store = MemoryPathStore::new(&[]);

    let failure = Pipeline::new(config(), &http, &NoElevation, &store, explicit(install_dir.path()))
        .with_host("freebsd", "x86_64")
        .with_workspace_root(scratch.path())
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::PlatformDetected);
    assert!(failure.to_string().contains("unsupported platform: freebsd-x86_64"));
    assert!(http.requests().is_empty());
    assert!(leftovers(scratch.path()).is_empty());
    Ok(())
}

#[tokio::test]
async fn test_archive_without_binary_is_extract_failure() -> Result<()> {
    let install_dir = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let http = http_with_release("v1.2.3");
    http.respond(LINUX_ARCHIVE_URL, 200, tar_gz(&[("LICENSE", b"MIT")]));
    let store = MemoryPathStore::new(&[]);

    let failure = linux_pipeline(&http, &store, install_dir.path(), scratch.path())
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Extracted);
    assert!(matches!(failure.error, InstallError::ExtractFailed { .. }));
    assert!(failure.to_string().contains("does not contain 'enuma'"));
    assert!(leftovers(install_dir.path()).is_empty());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_archive_is_extract_failure() -> Result<()> {
    let install_dir = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let http = http_with_release("v1.2.3");
    http.respond(LINUX_ARCHIVE_URL, 200, b"definitely not gzip".to_vec());
    let store = MemoryPathStore::new(&[]);

    let failure = linux_pipeline(&http, &store, install_dir.path(), scratch.path())
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Extracted);
    assert!(leftovers(scratch.path()).is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rerun_overwrites_and_adds_path_once() -> Result<()> {
    let install_dir = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let store = MemoryPathStore::new(&["/usr/bin"]);

    let first = http_with_release("v1.2.3");
    first.respond(LINUX_ARCHIVE_URL, 200, tar_gz(&[("enuma", b"first build")]));
    let report = linux_pipeline(&first, &store, install_dir.path(), scratch.path())
        .run()
        .await?;
    assert!(matches!(report.path, PathOutcome::Added { .. }));

    let second = http_with_release("v1.2.3");
    second.respond(LINUX_ARCHIVE_URL, 200, tar_gz(&[("enuma", b"second build")]));
    let report = linux_pipeline(&second, &store, install_dir.path(), scratch.path())
        .run()
        .await?;

    assert_eq!(report.stage, Stage::Done);
    assert!(matches!(report.path, PathOutcome::AlreadyPresent));
    assert_eq!(std::fs::read(install_dir.path().join("enuma"))?, b"second build");
    assert_eq!(leftovers(install_dir.path()), vec!["enuma".to_string()]);
    assert_eq!(store.appends(), 1);

    let dir = install_dir.path().display().to_string();
    assert_eq!(store.snapshot().iter().filter(|e| **e == dir).count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_path_failure_does_not_fail_the_run() -> Result<()> {
    let install_dir = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let http = http_with_release("v1.2.3");
    http.respond(LINUX_ARCHIVE_URL, 200, tar_gz(&[("enuma", b"bin")]));
    let store = MemoryPathStore::read_only(&["/usr/bin"]);

    let report = linux_pipeline(&http, &store, install_dir.path(), scratch.path())
        .run()
        .await?;

    assert_eq!(report.stage, Stage::Done);
    assert!(matches!(
        report.path,
        PathOutcome::Failed(InstallError::PathUpdateFailed { .. })
    ));
    assert!(install_dir.path().join("enuma").exists());
    Ok(())
}

#[tokio::test]
async fn test_windows_zip_install() -> Result<()> {
    let install_dir = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let http = http_with_release("v2.0.0");
    let zip_url =
        "https://github.com/meet447/Enuma/releases/download/v2.0.0/enuma-x86_64-pc-windows-msvc.zip";
    http.respond(zip_url, 200, zip_bytes(&[("enuma.exe", b"MZ fake")]));
    let store = MemoryPathStore::new(&[]);

    let report = Pipeline::new(config(), &http, &NoElevation, &store, explicit(install_dir.path()))
        .with_host("windows", "x86_64")
        .with_workspace_root(scratch.path())
        .run()
        .await?;

    assert_eq!(report.stage, Stage::Done);
    assert_eq!(report.asset.url, zip_url);
    assert_eq!(report.installed.path, install_dir.path().join("enuma.exe"));
    assert_eq!(std::fs::read(&report.installed.path)?, b"MZ fake");
    Ok(())
}

#[tokio::test]
async fn test_target_directory_is_created() -> Result<()> {
    let root = tempfile::tempdir()?;
    let scratch = tempfile::tempdir()?;
    let install_dir = root.path().join("nested").join("bin");
    let http = http_with_release("v1.2.3");
    http.respond(LINUX_ARCHIVE_URL, 200, tar_gz(&[("enuma", b"bin")]));
    let store = MemoryPathStore::new(&[]);

    let report = linux_pipeline(&http, &store, &install_dir, scratch.path())
        .run()
        .await?;

    assert!(install_dir.is_dir());
    assert_eq!(report.installed.path, install_dir.join("enuma"));
    Ok(())
}
