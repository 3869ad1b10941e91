use colored::*;

/// Colours for the things the installer talks about.
pub struct Colors;

impl Colors {
    pub fn success(s: &str) -> ColoredString {
        s.green()
    }

    pub fn warning(s: &str) -> ColoredString {
        s.yellow()
    }

    pub fn error(s: &str) -> ColoredString {
        s.red().bold()
    }

    pub fn info(s: &str) -> ColoredString {
        s.cyan()
    }

    pub fn muted(s: &str) -> ColoredString {
        s.dimmed()
    }

    pub fn version(s: &str) -> ColoredString {
        s.yellow().bold()
    }

    pub fn path(p: &std::path::Path) -> ColoredString {
        p.display().to_string().green()
    }
}

// Semantic emoji
pub const SUCCESS: &str = "✅";
pub const INFO: &str = "ℹ️";
pub const WARNING: &str = "⚠️";
pub const ERROR: &str = "❌";
pub const TIP: &str = "💡";
pub const SEARCH: &str = "🔍";
pub const PACKAGE: &str = "📦";
pub const DOWNLOAD: &str = "⬇️ ";
