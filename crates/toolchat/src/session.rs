use std::sync::Arc;
use std::time::Duration;

use toolchat_core::{
    Session, SessionBuilder as CoreSessionBuilder, TranscriptSource,
};
use toolchat_model::ModelProvider;

use crate::tools::*;

/// A session builder preloaded with the built-in tools.
///
/// See [`Session`].
pub struct SessionBuilder {
    core_builder: CoreSessionBuilder,
    runner: Arc<dyn CommandRunner>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let core_builder = CoreSessionBuilder::with_model_provider(provider);
        Self {
            core_builder,
            runner: Arc::new(ProcessRunner::new()),
        }
    }

    /// Sets the system prompt for the model.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.core_builder = self.core_builder.with_system_prompt(prompt);
        self
    }

    /// Sets the greeting recorded as the first assistant message.
    #[inline]
    pub fn with_introduction<S: Into<String>>(mut self, text: S) -> Self {
        self.core_builder = self.core_builder.with_introduction(text);
        self
    }

    /// Sets how many consecutive empty replies are corrected per turn.
    #[inline]
    pub fn with_max_empty_retries(mut self, retries: usize) -> Self {
        self.core_builder = self.core_builder.with_max_empty_retries(retries);
        self
    }

    /// Sets how many rounds of tool calls a single turn may run.
    #[inline]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.core_builder = self.core_builder.with_max_tool_rounds(rounds);
        self
    }

    /// Sets how long a single tool invocation may run.
    #[inline]
    pub fn with_tool_timeout(mut self, tool_timeout: Duration) -> Self {
        self.core_builder = self.core_builder.with_tool_timeout(tool_timeout);
        self
    }

    /// Replaces how the command tools start processes.
    #[inline]
    pub fn with_command_runner(
        mut self,
        runner: impl CommandRunner + 'static,
    ) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    /// Attaches a callback to be invoked when a transcript is generated.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.core_builder = self.core_builder.on_transcript(on_transcript);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let runner = self.runner;
        self.core_builder
            .with_tool(RunCommandTool::new(Arc::clone(&runner)))
            .with_tool(DateTimeTool::new())
            .with_tool(SystemInfoTool::new(Arc::clone(&runner)))
            .with_tool(ReverseStringTool::new())
            .with_tool(LocalIpTool::new())
            .with_tool(NetworkInterfacesTool::new())
            .with_tool(PingTool::new(runner))
            .with_tool(PublicIpTool::new())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use toolchat_test_model::TestModelProvider;

    use super::*;

    #[test]
    fn test_builtin_tools_are_registered() {
        let session =
            SessionBuilder::with_model_provider(TestModelProvider::default())
                .with_introduction("How can I help you?")
                .build();

        let names: Vec<String> = session
            .registry()
            .definitions()
            .into_iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(
            names,
            [
                "run_command",
                "get_current_date_time",
                "get_system_info",
                "reverse_string",
                "get_local_ip",
                "get_network_interfaces",
                "ping_device",
                "get_public_ip",
            ]
        );
        assert_eq!(session.introduction(), Some("How can I help you?"));
    }
}
