use std::path::Path;
use std::sync::Arc;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use toolchat_core::tool::{Error as ToolError, Tool, ToolOutput};

use crate::tools::CommandRunner;

/// Programs the model may never start, not even as arguments of `echo`.
///
/// This guards against accidents. It is not a sandbox.
const DENYLIST: &[&str] = &[
    "rm", "mv", "cp", "chmod", "chown", "dd", "kill", "reboot", "shutdown",
    "systemctl", "service", "mkfs", "mount", "umount", "passwd", "iptables",
    "ufw", "adduser", "deluser", "wget", "curl",
];

#[derive(Deserialize, JsonSchema)]
pub struct RunCommandToolParameters {
    #[schemars(
        description = "Complete command to run, as it would be entered in the terminal."
    )]
    command: String,
}

/// A tool for running a single command and reading what it prints.
pub struct RunCommandTool {
    parameter_schema: Value,
    runner: Arc<dyn CommandRunner>,
}

impl RunCommandTool {
    /// Creates a new command tool that starts processes with `runner`.
    #[inline]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        RunCommandTool {
            parameter_schema: schema_for!(RunCommandToolParameters).to_value(),
            runner,
        }
    }
}

impl Tool for RunCommandTool {
    type Input = RunCommandToolParameters;

    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        r#"
Runs a command and returns the text it prints to stdout.
Do not run commands that change the system state: commands such as `rm`, `mv` and `chmod` are blocked."#
    }

    fn parameter_schema(&self) -> Option<&Value> {
        Some(&self.parameter_schema)
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: RunCommandToolParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let runner = Arc::clone(&self.runner);
        async move {
            // Quotes are honoured but nothing is expanded.
            let argv = shlex::split(&input.command).ok_or_else(|| {
                ToolError::invalid_input().with_reason("No closing quotation")
            })?;
            check_allowed(&argv)?;

            let output = runner.run(&argv).await.map_err(|err| {
                ToolError::execution_error().with_reason(format!("{err}"))
            })?;
            Ok(Value::String(output.stdout))
        }
    }
}

fn is_denied(arg: &str) -> bool {
    // `/bin/rm` is as dangerous as `rm`.
    let program = Path::new(arg)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(arg);
    DENYLIST.contains(&arg) || DENYLIST.contains(&program)
}

fn check_allowed(argv: &[String]) -> Result<(), ToolError> {
    let Some((first, rest)) = argv.split_first() else {
        return Err(
            ToolError::invalid_input().with_reason("No command provided.")
        );
    };

    let denied = is_denied(first)
        || (first.eq_ignore_ascii_case("echo")
            && rest.iter().any(|arg| is_denied(arg)));
    if denied {
        return Err(ToolError::permission_denied()
            .with_reason(format!("Command '{first}' is not allowed.")));
    }
    Ok(())
}
