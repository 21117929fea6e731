use std::future::ready;
use std::sync::Arc;

use chrono::Local;
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use toolchat_core::tool::{
    Error as ToolError, NoParameters, Tool, ToolOutput,
};

use crate::tools::CommandRunner;

/// A tool for reading the local date and time.
#[derive(Default)]
pub struct DateTimeTool;

impl DateTimeTool {
    /// Creates a new date and time tool.
    #[inline]
    pub fn new() -> Self {
        DateTimeTool
    }
}

impl Tool for DateTimeTool {
    type Input = NoParameters;

    fn name(&self) -> &str {
        "get_current_date_time"
    }

    fn description(&self) -> &str {
        "Get the current local date and time."
    }

    fn parameter_schema(&self) -> Option<&Value> {
        None
    }

    fn execute(
        &self,
        _input: NoParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let timestamp = Local::now().format("%I:%M:%S %p %Z on %A %B %d, %Y");
        ready(Ok(Value::String(format!("It is currently {timestamp}"))))
    }
}

/// A tool for describing the machine the program runs on.
pub struct SystemInfoTool {
    runner: Arc<dyn CommandRunner>,
}

impl SystemInfoTool {
    /// Creates a new system info tool that starts processes with `runner`.
    #[inline]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        SystemInfoTool { runner }
    }
}

impl Tool for SystemInfoTool {
    type Input = NoParameters;

    fn name(&self) -> &str {
        "get_system_info"
    }

    fn description(&self) -> &str {
        "Get machine details such as the kernel name, release and architecture."
    }

    fn parameter_schema(&self) -> Option<&Value> {
        None
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        _input: NoParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let runner = Arc::clone(&self.runner);
        async move {
            let argv = ["uname".to_owned(), "-a".to_owned()];
            let output = runner.run(&argv).await.map_err(|err| {
                ToolError::execution_error().with_reason(format!("{err}"))
            })?;
            Ok(Value::String(output.stdout))
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct ReverseStringToolParameters {
    #[schemars(description = "The string to reverse.")]
    string: String,
}

/// A tool for reversing a string.
pub struct ReverseStringTool {
    parameter_schema: Value,
}

impl ReverseStringTool {
    /// Creates a new string reversing tool.
    #[inline]
    pub fn new() -> Self {
        ReverseStringTool {
            parameter_schema: schema_for!(ReverseStringToolParameters)
                .to_value(),
        }
    }
}

impl Default for ReverseStringTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ReverseStringTool {
    type Input = ReverseStringToolParameters;

    fn name(&self) -> &str {
        "reverse_string"
    }

    fn description(&self) -> &str {
        "Reverse the input string."
    }

    fn parameter_schema(&self) -> Option<&Value> {
        Some(&self.parameter_schema)
    }

    fn execute(
        &self,
        input: ReverseStringToolParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let reversed: String = input.string.chars().rev().collect();
        ready(Ok(Value::String(reversed)))
    }
}
