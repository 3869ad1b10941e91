use crate::error::InstallError;
use std::env;
use std::fmt;

/// Canonical target string used in release asset names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformTriple(&'static str);

impl PlatformTriple {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for PlatformTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identified {
    Supported(PlatformTriple),
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

#[derive(Debug, Clone)]
pub struct Platform {
    pub os: Os,
    pub triple: PlatformTriple,
}

const TRIPLES: &[(&str, &str, &str)] = &[
    ("linux", "x86_64", "x86_64-unknown-linux-gnu"),
    ("linux", "aarch64", "aarch64-unknown-linux-gnu"),
    ("linux", "armv7", "armv7-unknown-linux-gnueabihf"),
    ("macos", "x86_64", "x86_64-apple-darwin"),
    ("macos", "aarch64", "aarch64-apple-darwin"),
    ("windows", "x86_64", "x86_64-pc-windows-msvc"),
    ("windows", "aarch64", "aarch64-pc-windows-msvc"),
];

fn canonical_os(os: &str) -> &str {
    match os {
        "darwin" => "macos",
        other => other,
    }
}

fn canonical_arch(arch: &str) -> &str {
    match arch {
        "amd64" | "x64" => "x86_64",
        "arm64" => "aarch64",
        "arm" | "armv7l" => "armv7",
        other => other,
    }
}

/// Map an (OS, architecture) pair to its release triple.
pub fn identify(os: &str, arch: &str) -> Identified {
    let os = canonical_os(os);
    let arch = canonical_arch(arch);

    TRIPLES
        .iter()
        .find(|(o, a, _)| *o == os && *a == arch)
        .map(|(_, _, triple)| Identified::Supported(PlatformTriple(triple)))
        .unwrap_or(Identified::Unsupported)
}

impl Platform {
    pub fn detect() -> Result<Self, InstallError> {
        Self::from_parts(env::consts::OS, env::consts::ARCH)
    }

    pub fn from_parts(os: &str, arch: &str) -> Result<Self, InstallError> {
        let triple = match identify(os, arch) {
            Identified::Supported(triple) => triple,
            Identified::Unsupported => {
                return Err(InstallError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                });
            }
        };

        let os = match canonical_os(os) {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            _ => Os::Windows,
        };

        Ok(Platform { os, triple })
    }

    pub fn archive_ext(&self) -> &'static str {
        match self.os {
            Os::Windows => "zip",
            _ => "tar.gz",
        }
    }

    pub fn exe_suffix(&self) -> &'static str {
        match self.os {
            Os::Windows => ".exe",
            _ => "",
        }
    }

    /// File name the executable carries once installed.
    pub fn executable_name(&self, binary: &str) -> String {
        format!("{}{}", binary, self.exe_suffix())
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }
}
