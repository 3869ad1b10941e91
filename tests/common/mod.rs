#![allow(dead_code)]

use enuma_install::config::ReleaseConfig;
use enuma_install::http::mock::MockHttpClient;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;

pub const LATEST_URL: &str = "https://api.github.com/repos/meet447/Enuma/releases/latest";
pub const LINUX_ARCHIVE_URL: &str = "https://github.com/meet447/Enuma/releases/download/v1.2.3/enuma-x86_64-unknown-linux-gnu.tar.gz";
pub const LINUX_BARE_URL: &str =
    "https://github.com/meet447/Enuma/releases/download/v1.2.3/enuma-x86_64-unknown-linux-gnu";

pub fn config() -> ReleaseConfig {
    ReleaseConfig::bundled().expect("bundled config should parse")
}

pub fn release_json(tag: &str) -> String {
    format!(r#"{{"tag_name": "{}", "name": "Release {}", "assets": []}}"#, tag, tag)
}

/// A mock that answers the release index with `tag`.
pub fn http_with_release(tag: &str) -> MockHttpClient {
    let http = MockHttpClient::new();
    http.respond(LATEST_URL, 200, release_json(tag));
    http
}

pub fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        builder.append_data(&mut header, path, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Entries left in a directory, for checking workspace cleanup.
pub fn leftovers(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect()
}
