//! Tool call supports.
//!
//! Tools are registered once when the session is built and then looked up
//! by name for every tool call the model requests. Failures never leave
//! the dispatcher as errors: they become [`ToolResult`]s carrying an
//! error text, so the model can see what went wrong and react.

mod dispatcher;
mod error;
mod registry;

use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use toolchat_model::ModelTool;

pub use dispatcher::{DEFAULT_TOOL_TIMEOUT, Dispatcher};
pub use error::{Error, ErrorKind};
pub use registry::Registry;

/// The output of a tool invocation.
pub type ToolOutput = Result<Value, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless. Context such as a
/// working directory can be made an immutable part of the tool, set during
/// initialization and copied into the future when executing.
pub trait Tool: Send + Sync + 'static {
    /// The typed parameters of the tool.
    ///
    /// The arguments of a tool call are bound to this type with
    /// `serde_json`. Tools without parameters use [`NoParameters`].
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool, `None` if it takes none.
    fn parameter_schema(&self) -> Option<&Value>;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolOutput> + Send + 'static;
}

/// Input type of tools that take no parameters.
///
/// Any argument the model passes anyway is ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct NoParameters {}

/// An object-safe form of [`Tool`] that binds raw call arguments.
pub trait ToolObject: Send + Sync + 'static {
    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the definition that is sent to the model.
    fn definition(&self) -> ModelTool;

    /// Binds the arguments and starts executing the tool.
    fn execute(
        &self,
        arguments: Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = ToolOutput> + Send>>;
}

pub(crate) struct AnyTool<T: Tool>(pub T);

impl<T: Tool> ToolObject for AnyTool<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    fn definition(&self) -> ModelTool {
        ModelTool {
            name: self.0.name().to_owned(),
            description: self.0.description().trim().to_owned(),
            parameters: self.0.parameter_schema().cloned(),
        }
    }

    #[inline]
    fn execute(
        &self,
        arguments: Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = ToolOutput> + Send>> {
        let input: T::Input =
            match serde_json::from_value(Value::Object(arguments)) {
                Ok(input) => input,
                Err(err) => {
                    let reason = format!("{err}");
                    return Box::pin(std::future::ready(ToolOutput::Err(
                        Error::invalid_input().with_reason(reason),
                    )));
                }
            };
        Box::pin(self.0.execute(input))
    }
}

/// The record of one dispatched tool call, sent back to the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolResult {
    /// The name the model asked for.
    pub name: String,
    /// The arguments the model supplied.
    pub arguments: Map<String, Value>,
    /// The tool's output, or an `"Error: ..."` string if it failed.
    pub result: Value,
}

impl ToolResult {
    /// Packages the output of a call, turning a failure into error text.
    pub fn new(
        name: String,
        arguments: Map<String, Value>,
        output: ToolOutput,
    ) -> Self {
        let result = match output {
            Ok(value) => value,
            Err(err) => Value::String(err.to_string()),
        };
        Self {
            name,
            arguments,
            result,
        }
    }

    /// Serializes the result into the content of a tool message.
    pub fn to_message_content(&self) -> String {
        json!({
            "name": self.name,
            "arguments": self.arguments,
            "result": self.result,
        })
        .to_string()
    }
}
