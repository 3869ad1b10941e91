use std::path::PathBuf;

/// What the installer was asked to do, split out of the raw arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub install_dir: Option<PathBuf>,
    /// Handed to the installed binary once it is in place.
    pub forward: Vec<String>,
}

impl Invocation {
    /// The first argument is the install directory unless it looks like a flag.
    /// Everything else, `--help` included, belongs to the installed program.
    pub fn from_args(args: Vec<String>) -> Self {
        let mut args = args.into_iter().peekable();

        if args.peek().is_some_and(|a| a == "--") {
            args.next();
            return Self {
                install_dir: None,
                forward: args.collect(),
            };
        }

        let install_dir = args
            .next_if(|a| !a.starts_with('-') && !a.is_empty())
            .map(PathBuf::from);

        let mut forward: Vec<String> = args.collect();
        if forward.first().is_some_and(|a| a == "--") {
            forward.remove(0);
        }

        Self {
            install_dir,
            forward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn no_arguments() {
        assert_eq!(Invocation::from_args(vec![]), Invocation::default());
    }

    #[test]
    fn directory_only() {
        let inv = Invocation::from_args(args(&["/opt/bin"]));
        assert_eq!(inv.install_dir, Some(PathBuf::from("/opt/bin")));
        assert!(inv.forward.is_empty());
    }

    #[test]
    fn help_is_forwarded_not_treated_as_directory() {
        let inv = Invocation::from_args(args(&["--help"]));
        assert_eq!(inv.install_dir, None);
        assert_eq!(inv.forward, args(&["--help"]));
    }

    #[test]
    fn directory_then_forwarded_arguments() {
        let inv = Invocation::from_args(args(&["~/bin", "--", "--version"]));
        assert_eq!(inv.install_dir, Some(PathBuf::from("~/bin")));
        assert_eq!(inv.forward, args(&["--version"]));
    }

    #[test]
    fn leading_separator_forwards_everything() {
        let inv = Invocation::from_args(args(&["--", "search", "x"]));
        assert_eq!(inv.install_dir, None);
        assert_eq!(inv.forward, args(&["search", "x"]));
    }
}
