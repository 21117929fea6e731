use std::sync::Arc;
use std::time::Duration;

use toolchat_model::{ModelMessage, ModelProvider};

use super::{Session, TranscriptFn, TranscriptSource};
use crate::conversation::Conversation;
use crate::model_client::ModelClient;
use crate::tool::{DEFAULT_TOOL_TIMEOUT, Dispatcher, Registry, Tool};

/// Consecutive empty replies corrected before giving up on a turn.
pub const DEFAULT_MAX_EMPTY_RETRIES: usize = 2;

/// Tool-dispatch rounds allowed within a single turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// [`Session`] builder.
pub struct SessionBuilder {
    model_client: ModelClient,
    registry: Registry,
    system_prompt: Option<String>,
    introduction: Option<String>,
    max_empty_retries: usize,
    max_tool_rounds: usize,
    tool_timeout: Duration,
    on_transcript: Option<TranscriptFn>,
}

impl SessionBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            registry: Registry::new(),
            system_prompt: None,
            introduction: None,
            max_empty_retries: DEFAULT_MAX_EMPTY_RETRIES,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            on_transcript: None,
        }
    }

    /// Sets the instructions placed at the start of the transcript.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets a greeting recorded as the first assistant message.
    #[inline]
    pub fn with_introduction<S: Into<String>>(mut self, text: S) -> Self {
        self.introduction = Some(text.into());
        self
    }

    /// Registers a tool. A later tool with the same name replaces it.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.registry.register(tool);
        self
    }

    /// Sets how many consecutive empty replies are corrected before the
    /// turn ends with the fallback message.
    #[inline]
    pub fn with_max_empty_retries(mut self, retries: usize) -> Self {
        self.max_empty_retries = retries;
        self
    }

    /// Sets how many rounds of tool calls a single turn may run.
    #[inline]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Sets how long a single tool invocation may run.
    #[inline]
    pub fn with_tool_timeout(mut self, tool_timeout: Duration) -> Self {
        self.tool_timeout = tool_timeout;
        self
    }

    /// Attaches a callback invoked whenever something is surfaced to the
    /// user.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Box::new(on_transcript));
        self
    }

    /// Builds the session.
    pub fn build(self) -> Session {
        let SessionBuilder {
            model_client,
            registry,
            system_prompt,
            introduction,
            max_empty_retries,
            max_tool_rounds,
            tool_timeout,
            on_transcript,
        } = self;

        let mut conversation = Conversation::new();
        if let Some(prompt) = system_prompt {
            conversation.push(ModelMessage::system(prompt));
        }
        if let Some(text) = &introduction {
            conversation.push(ModelMessage::assistant(text.clone(), vec![]));
        }

        let dispatcher =
            Dispatcher::new(Arc::new(registry)).with_timeout(tool_timeout);
        Session {
            model_client,
            dispatcher,
            conversation,
            introduction,
            max_empty_retries,
            max_tool_rounds,
            on_transcript,
        }
    }
}
