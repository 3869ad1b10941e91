use crate::command::{CommandRunner, SystemCommandRunner};
use crate::error::InstallError;
use anyhow::{Context, Result};
use regex::Regex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The user's persistent PATH, wherever the platform keeps it.
pub trait PathStore: Send + Sync {
    /// Human-readable name of the backing store, e.g. a profile file.
    fn location(&self) -> String;
    fn entries(&self) -> Result<Vec<String>>;
    fn append(&self, dir: &str) -> Result<()>;
}

#[derive(Debug)]
pub enum PathOutcome {
    AlreadyPresent,
    Added { location: String },
    Failed(InstallError),
}

/// Append `dir` to the persistent PATH unless an entry already covers it.
pub fn ensure_on_path(store: &dyn PathStore, dir: &Path, case_insensitive: bool) -> PathOutcome {
    let dir = dir.display().to_string();
    let failed = |e: anyhow::Error| {
        PathOutcome::Failed(InstallError::PathUpdateFailed {
            location: store.location(),
            reason: format!("{:#}", e),
        })
    };

    let entries = match store.entries() {
        Ok(entries) => entries,
        Err(e) => return failed(e),
    };

    if entries.iter().any(|entry| covers(entry, &dir, case_insensitive)) {
        log::debug!("{} already on PATH", dir);
        return PathOutcome::AlreadyPresent;
    }

    match store.append(&dir) {
        Ok(()) => PathOutcome::Added {
            location: store.location(),
        },
        Err(e) => failed(e),
    }
}

fn covers(entry: &str, dir: &str, case_insensitive: bool) -> bool {
    let trim = |s: &str| s.trim().trim_end_matches(['/', '\\']).to_string();
    let (entry, dir) = if case_insensitive {
        (trim(entry).to_lowercase(), trim(dir).to_lowercase())
    } else {
        (trim(entry), trim(dir))
    };

    !entry.is_empty() && !dir.is_empty() && entry.contains(&dir)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlavor {
    Posix,
    Fish,
}

/// PATH kept as `export` lines in a shell startup file.
pub struct ProfilePathStore {
    profile: PathBuf,
    flavor: ShellFlavor,
    process_path: Option<String>,
}

impl ProfilePathStore {
    pub fn new(profile: PathBuf, flavor: ShellFlavor, process_path: Option<String>) -> Self {
        Self {
            profile,
            flavor,
            process_path,
        }
    }

    /// Pick the startup file the user's login shell reads.
    pub fn for_shell(shell: Option<&str>, home: &Path, process_path: Option<String>) -> Self {
        let shell_name = shell
            .and_then(|s| Path::new(s).file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("");

        let (profile, flavor) = match shell_name {
            "zsh" => (home.join(".zshrc"), ShellFlavor::Posix),
            "bash" => (home.join(".bashrc"), ShellFlavor::Posix),
            "fish" => (
                home.join(".config").join("fish").join("config.fish"),
                ShellFlavor::Fish,
            ),
            _ => (home.join(".profile"), ShellFlavor::Posix),
        };

        Self::new(profile, flavor, process_path)
    }

    pub fn profile(&self) -> &Path {
        &self.profile
    }

    fn exported_dirs(&self, content: &str) -> Result<Vec<String>> {
        let mut dirs = Vec::new();

        match self.flavor {
            ShellFlavor::Posix => {
                let re = Regex::new(r"^\s*export\s+PATH=(.*)$")?;
                for line in content.lines() {
                    let Some(rest) = re.captures(line).and_then(|c| c.get(1)) else {
                        continue;
                    };
                    if let Some(value) = split_words(rest.as_str(), self.flavor).first() {
                        dirs.extend(
                            value
                                .split(':')
                                .filter(|part| !part.is_empty() && !part.starts_with('$'))
                                .map(str::to_string),
                        );
                    }
                }
            }
            ShellFlavor::Fish => {
                let re = Regex::new(r"^\s*fish_add_path\s+(.*)$")?;
                for line in content.lines() {
                    if let Some(args) = re.captures(line).and_then(|c| c.get(1)) {
                        dirs.extend(
                            split_words(args.as_str(), self.flavor)
                                .into_iter()
                                .filter(|arg| !arg.starts_with('-')),
                        );
                    }
                }
            }
        }

        Ok(dirs)
    }
}

/// `dir` as it appears in the line appended to the profile.
fn quoted(dir: &str, flavor: ShellFlavor) -> String {
    match flavor {
        ShellFlavor::Posix => {
            let mut out = String::with_capacity(dir.len());
            for c in dir.chars() {
                if matches!(c, '\\' | '"' | '$' | '`') {
                    out.push('\\');
                }
                out.push(c);
            }
            out
        }
        ShellFlavor::Fish => format!("'{}'", dir.replace('\\', "\\\\").replace('\'', "\\'")),
    }
}

/// Shell words of `input` with quotes and escapes removed. Stops at a comment.
fn split_words(input: &str, flavor: ShellFlavor) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                while let Some(c) = chars.next() {
                    match c {
                        '\'' => break,
                        // Fish keeps \\ and \' escapes inside single quotes; POSIX keeps none.
                        '\\' if flavor == ShellFlavor::Fish => match chars.next() {
                            Some(next @ ('\'' | '\\')) => word.push(next),
                            Some(next) => {
                                word.push('\\');
                                word.push(next);
                            }
                            None => word.push('\\'),
                        },
                        c => word.push(c),
                    }
                }
            }
            '"' => {
                in_word = true;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => match chars.next() {
                            Some(next @ ('"' | '\\' | '$' | '`')) => word.push(next),
                            Some(next) => {
                                word.push('\\');
                                word.push(next);
                            }
                            None => word.push('\\'),
                        },
                        c => word.push(c),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(next) = chars.next() {
                    word.push(next);
                }
            }
            '#' if !in_word => break,
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }

    if in_word {
        words.push(word);
    }
    words
}

impl PathStore for ProfilePathStore {
    fn location(&self) -> String {
        self.profile.display().to_string()
    }

    fn entries(&self) -> Result<Vec<String>> {
        let mut entries: Vec<String> = self
            .process_path
            .as_deref()
            .map(|path| {
                std::env::split_paths(path)
                    .map(|p| p.display().to_string())
                    .collect()
            })
            .unwrap_or_default();

        if self.profile.exists() {
            let content = std::fs::read_to_string(&self.profile)
                .with_context(|| format!("Failed to read {}", self.profile.display()))?;
            entries.extend(self.exported_dirs(&content)?);
        }

        Ok(entries)
    }

    fn append(&self, dir: &str) -> Result<()> {
        if let Some(parent) = self.profile.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = match self.flavor {
            ShellFlavor::Posix => format!("export PATH=\"$PATH:{}\"", quoted(dir, self.flavor)),
            ShellFlavor::Fish => format!("fish_add_path {}", quoted(dir, self.flavor)),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.profile)
            .with_context(|| format!("Failed to open {}", self.profile.display()))?;
        writeln!(file, "\n# Added by enuma-install\n{}", line)?;

        Ok(())
    }
}

/// User-scoped `Path` in the Windows environment store, through PowerShell.
pub struct WindowsPathStore {
    runner: Box<dyn CommandRunner>,
}

impl WindowsPathStore {
    pub fn new(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn powershell(&self, script: &str) -> Result<String> {
        let args = [
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
            script.to_string(),
        ];
        let output = self.runner.run("powershell", &args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("powershell failed: {}", stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn read_raw(&self) -> Result<String> {
        self.powershell(GET_USER_PATH)
    }
}

pub const GET_USER_PATH: &str = "[Environment]::GetEnvironmentVariable('Path', 'User')";

pub fn set_user_path_script(value: &str) -> String {
    format!(
        "[Environment]::SetEnvironmentVariable('Path', '{}', 'User')",
        value.replace('\'', "''")
    )
}

impl PathStore for WindowsPathStore {
    fn location(&self) -> String {
        "the user environment (HKCU\\Environment)".to_string()
    }

    fn entries(&self) -> Result<Vec<String>> {
        Ok(self
            .read_raw()?
            .split(';')
            .filter(|e| !e.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    fn append(&self, dir: &str) -> Result<()> {
        let current = self.read_raw()?;
        let current = current.trim_end_matches(';');
        let updated = if current.is_empty() {
            dir.to_string()
        } else {
            format!("{};{}", current, dir)
        };
        self.powershell(&set_user_path_script(&updated))?;
        Ok(())
    }
}

/// Stand-in when no persistent PATH can be located.
pub struct UnavailablePathStore(pub String);

impl PathStore for UnavailablePathStore {
    fn location(&self) -> String {
        "PATH".to_string()
    }

    fn entries(&self) -> Result<Vec<String>> {
        anyhow::bail!("{}", self.0)
    }

    fn append(&self, _dir: &str) -> Result<()> {
        anyhow::bail!("{}", self.0)
    }
}

/// The store matching the running OS.
pub fn system_path_store(windows: bool, home: Option<&Path>) -> Box<dyn PathStore> {
    if windows {
        return Box::new(WindowsPathStore::new(Box::new(SystemCommandRunner)));
    }

    let Some(home) = home else {
        return Box::new(UnavailablePathStore("no home directory".to_string()));
    };
    let shell = std::env::var("SHELL").ok();
    let process_path = std::env::var("PATH").ok();
    Box::new(ProfilePathStore::for_shell(
        shell.as_deref(),
        home,
        process_path,
    ))
}

/// In-memory PATH store for testing
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    pub struct MemoryPathStore {
        entries: Mutex<Vec<String>>,
        appends: Mutex<usize>,
        fail_append: bool,
    }

    impl MemoryPathStore {
        pub fn new(entries: &[&str]) -> Self {
            Self {
                entries: Mutex::new(entries.iter().map(|e| e.to_string()).collect()),
                appends: Mutex::new(0),
                fail_append: false,
            }
        }

        /// A store whose writes are always refused.
        pub fn read_only(entries: &[&str]) -> Self {
            Self {
                fail_append: true,
                ..Self::new(entries)
            }
        }

        pub fn snapshot(&self) -> Vec<String> {
            self.entries.lock().unwrap().clone()
        }

        pub fn appends(&self) -> usize {
            *self.appends.lock().unwrap()
        }
    }

    impl PathStore for MemoryPathStore {
        fn location(&self) -> String {
            "memory".to_string()
        }

        fn entries(&self) -> Result<Vec<String>> {
            Ok(self.snapshot())
        }

        fn append(&self, dir: &str) -> Result<()> {
            if self.fail_append {
                anyhow::bail!("store is read-only");
            }
            self.entries.lock().unwrap().push(dir.to_string());
            *self.appends.lock().unwrap() += 1;
            Ok(())
        }
    }
}
