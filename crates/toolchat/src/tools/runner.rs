use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

/// How long a command started by a tool may run by default.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// What a finished command left behind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited successfully.
    pub success: bool,
    /// Everything the command printed to stdout.
    pub stdout: String,
}

/// Starts processes on behalf of the command tools.
///
/// The argument vector is executed as is, never through a shell.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `argv[0]` with the remaining arguments and waits for it.
    async fn run(&self, argv: &[String]) -> io::Result<CommandOutput>;
}

/// Runs commands as child processes of this program.
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    /// Creates a runner with the default timeout.
    #[inline]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Sets how long a command may run before it is killed.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ProcessRunner {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, argv: &[String]) -> io::Result<CommandOutput> {
        let Some((program, args)) = argv.split_first() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "No command provided.",
            ));
        };
        debug!("running {argv:?}");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        // Dropping the pending child on timeout kills it.
        let output = timeout(self.timeout, child).await.map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!(
                    "Command '{program}' timed out after {}s",
                    self.timeout.as_secs_f32()
                ),
            )
        })??;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records every command instead of running it.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingRunner {
        pub(crate) calls: Arc<Mutex<Vec<Vec<String>>>>,
        pub(crate) output: CommandOutput,
    }

    impl RecordingRunner {
        pub(crate) fn replying(success: bool, stdout: &str) -> Self {
            Self {
                calls: Default::default(),
                output: CommandOutput {
                    success,
                    stdout: stdout.to_owned(),
                },
            }
        }

        pub(crate) fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, argv: &[String]) -> io::Result<CommandOutput> {
            self.calls.lock().unwrap().push(argv.to_vec());
            Ok(self.output.clone())
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| (*arg).to_owned()).collect()
    }

    #[tokio::test]
    async fn test_run_echo() {
        let output = ProcessRunner::new()
            .run(&argv(&["echo", "Hello, World!"]))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "Hello, World!\n");
    }

    #[tokio::test]
    async fn test_arguments_are_not_interpreted_by_a_shell() {
        let output = ProcessRunner::new()
            .run(&argv(&["echo", "$HOME; ls"]))
            .await
            .unwrap();
        assert_eq!(output.stdout, "$HOME; ls\n");
    }

    #[tokio::test]
    async fn test_timeout() {
        let err = ProcessRunner::new()
            .with_timeout(Duration::from_millis(100))
            .run(&argv(&["sleep", "10"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = ProcessRunner::new()
            .run(&argv(&["definitely-not-a-real-program-4242"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
