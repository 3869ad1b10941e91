use anyhow::Result;
use std::process::{Command, Output};

/// Trait for running system commands - allows mocking in tests
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<Output>;
}

/// Real command runner that executes actual system commands
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<Output> {
        log::debug!("Running: {} {}", program, args.join(" "));
        Ok(Command::new(program).args(args).output()?)
    }
}

/// Mock command runner for testing
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::process::ExitStatus;
    use std::sync::Mutex;

    pub struct MockCommandRunner {
        expectations: Mutex<HashMap<String, MockExpectation>>,
        calls: Mutex<Vec<String>>,
    }

    pub struct MockExpectation {
        pub stdout: String,
        pub stderr: String,
        pub success: bool,
    }

    #[cfg(unix)]
    fn exit_status(success: bool) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status; exit code 1 lives in the high byte.
        ExitStatus::from_raw(if success { 0 } else { 1 << 8 })
    }

    #[cfg(windows)]
    fn exit_status(success: bool) -> ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(if success { 0 } else { 1 })
    }

    impl MockCommandRunner {
        pub fn new() -> Self {
            Self {
                expectations: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn expect(&self, program: &str, args: &[&str], stdout: &str, success: bool) {
            let mut expectations = self.expectations.lock().unwrap();
            let key = format!("{} {}", program, args.join(" "));
            expectations.insert(
                key,
                MockExpectation {
                    stdout: stdout.to_string(),
                    stderr: if success { String::new() } else { "mock failure".to_string() },
                    success,
                },
            );
        }

        /// Every command line run so far, in order.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Default for MockCommandRunner {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CommandRunner for MockCommandRunner {
        fn run(&self, program: &str, args: &[String]) -> Result<Output> {
            let key = format!("{} {}", program, args.join(" "));
            self.calls.lock().unwrap().push(key.clone());

            let expectations = self.expectations.lock().unwrap();
            let expectation = expectations
                .get(&key)
                .ok_or_else(|| anyhow::anyhow!("Unexpected command: {}", key))?;

            Ok(Output {
                status: exit_status(expectation.success),
                stdout: expectation.stdout.as_bytes().to_vec(),
                stderr: expectation.stderr.as_bytes().to_vec(),
            })
        }
    }
}
