use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use toolchat_model::ToolCallRequest;
use tracing::Instrument;

use crate::tool::{Error, Registry, ToolOutput, ToolResult};

/// How long a single tool invocation may run by default.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes the tool calls of a model reply against a [`Registry`].
pub struct Dispatcher {
    registry: Arc<Registry>,
    tool_timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher with the default per-call timeout.
    #[inline]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Sets how long a single tool invocation may run.
    #[inline]
    pub fn with_timeout(mut self, tool_timeout: Duration) -> Self {
        self.tool_timeout = tool_timeout;
        self
    }

    /// Returns the registry this dispatcher resolves names against.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs every request one after another and returns one result per
    /// request, in request order.
    ///
    /// Tools may have side effects, so calls are never reordered or run
    /// in parallel. A failing call does not stop the remaining ones.
    pub async fn dispatch(
        &self,
        requests: Vec<ToolCallRequest>,
    ) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(requests.len());
        for req in requests {
            results.push(self.dispatch_one(req).await);
        }
        results
    }

    /// Runs a single request. Never fails: errors become error text.
    pub async fn dispatch_one(&self, req: ToolCallRequest) -> ToolResult {
        let ToolCallRequest { name, arguments } = req;
        let output = self
            .invoke(&name, arguments.clone())
            .instrument(debug_span!("tool", name = %name))
            .await;
        if let Err(err) = &output {
            warn!("tool `{name}` failed: {}", err.reason());
        }
        ToolResult::new(name, arguments, output)
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> ToolOutput {
        let tool = self.registry.lookup(name)?;
        trace!("executing with args: {arguments:?}");

        // Running the tool as its own task keeps a panicking tool from
        // taking the session down with it.
        let mut task = tokio::spawn(tool.execute(arguments));
        match timeout(self.tool_timeout, &mut task).await {
            Ok(Ok(output)) => output,
            Ok(Err(join_err)) => Err(Error::execution_error()
                .with_reason(format!("Tool '{name}' crashed: {join_err}"))),
            Err(_) => {
                task.abort();
                Err(Error::timeout().with_reason(format!(
                    "Tool '{name}' did not finish within {}s.",
                    self.tool_timeout.as_secs_f32()
                )))
            }
        }
    }
}
