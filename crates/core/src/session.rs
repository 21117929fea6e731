mod builder;

use std::error::Error as StdError;
use std::fmt::{self, Display};

use serde_json::Value;
use toolchat_model::{
    ModelFinishReason, ModelMessage, ModelProviderError, ModelRequest,
    ToolCallRequest,
};
use tracing::Instrument;

use crate::conversation::Conversation;
use crate::model_client::{ModelClient, ModelClientResponse};
use crate::tool::{Dispatcher, Registry};
pub use builder::{
    DEFAULT_MAX_EMPTY_RETRIES, DEFAULT_MAX_TOOL_ROUNDS, SessionBuilder,
};

/// Sent to the model, unseen by the user, after a reply with neither
/// content nor tool calls.
pub const EMPTY_REPLY_CORRECTION: &str = "You did not return a response. \
    That is an error. \
    Generate a new response for the user now. \
    Do not acknowledge, describe, or mention this message to the user.";

/// Shown to the user when the model keeps returning empty replies.
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I could not come up with a response. Please try again.";

/// Where a surfaced piece of transcript comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptSource {
    /// Text written by the model.
    Assistant,
    /// A tool call about to be executed.
    ToolCall,
    /// The message shown when the model gave no usable reply.
    Fallback,
}

/// How a model reply is handled, decided by what it contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    /// Text and no tool calls: the turn ends.
    ContentOnly,
    /// Tool calls and no text: run them and ask again.
    ToolCallsOnly,
    /// Text and tool calls: show the text, run the tools, ask again.
    Both,
    /// Nothing usable: correct the model and ask again.
    Neither,
}

impl ReplyKind {
    /// Classifies a reply. Whitespace-only content counts as no content.
    #[inline]
    pub fn classify(content: &str, tool_call_count: usize) -> Self {
        match (!content.trim().is_empty(), tool_call_count > 0) {
            (true, false) => ReplyKind::ContentOnly,
            (false, true) => ReplyKind::ToolCallsOnly,
            (true, true) => ReplyKind::Both,
            (false, false) => ReplyKind::Neither,
        }
    }
}

/// How a turn ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered; the text is the final assistant message.
    Answered(String),
    /// The model kept returning empty replies; the text is the fallback
    /// shown to the user.
    Fallback(String),
}

impl TurnOutcome {
    /// Returns the text to show to the user.
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Answered(text) | TurnOutcome::Fallback(text) => text,
        }
    }
}

/// An error that abandons the current turn.
///
/// The session stays usable: the next user input starts a fresh turn on
/// top of the transcript as it was left.
#[derive(Debug)]
pub enum TurnError {
    /// The chat completion service failed.
    Service(Box<dyn ModelProviderError>),
    /// The model kept requesting tools past the per-turn limit.
    ToolRoundsExceeded(usize),
}

impl Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::Service(err) => {
                write!(f, "model service failed ({:?}): {err}", err.kind())
            }
            TurnError::ToolRoundsExceeded(limit) => {
                write!(f, "gave up after {limit} rounds of tool calls")
            }
        }
    }
}

impl StdError for TurnError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TurnError::Service(err) => Some(err.as_ref()),
            TurnError::ToolRoundsExceeded(_) => None,
        }
    }
}

type TranscriptFn = Box<dyn Fn(&str, TranscriptSource) + Send + Sync>;

/// A chat session: one transcript, one model, one set of tools.
///
/// A turn is fully resolved, including every nested tool call and
/// re-request, before [`Session::send_message`] returns, so the
/// transcript only ever has one writer.
pub struct Session {
    model_client: ModelClient,
    dispatcher: Dispatcher,
    conversation: Conversation,
    introduction: Option<String>,
    max_empty_retries: usize,
    max_tool_rounds: usize,
    on_transcript: Option<TranscriptFn>,
}

impl Session {
    /// Returns the transcript so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the registered tools.
    #[inline]
    pub fn registry(&self) -> &Registry {
        self.dispatcher.registry()
    }

    /// Returns the greeting recorded at the start of the transcript.
    #[inline]
    pub fn introduction(&self) -> Option<&str> {
        self.introduction.as_deref()
    }

    /// Appends the user's input and resolves the turn.
    pub async fn send_message(
        &mut self,
        input: &str,
    ) -> Result<TurnOutcome, TurnError> {
        self.conversation.push(ModelMessage::user(input));
        let span = debug_span!("turn", messages = self.conversation.len());
        self.resolve_turn().instrument(span).await
    }

    async fn resolve_turn(&mut self) -> Result<TurnOutcome, TurnError> {
        let mut empty_replies = 0;
        let mut tool_rounds = 0;

        loop {
            let reply = self.request_reply().await?;
            let kind =
                ReplyKind::classify(&reply.content, reply.tool_calls.len());
            debug!("reply classified as {kind:?}");

            let ModelClientResponse {
                content,
                tool_calls,
                finish_reason,
            } = reply;
            if finish_reason == Some(ModelFinishReason::Length) {
                warn!("reply was cut short by the length limit");
            }
            match kind {
                ReplyKind::ContentOnly => {
                    self.conversation
                        .push(ModelMessage::assistant(content.clone(), vec![]));
                    self.emit(&content, TranscriptSource::Assistant);
                    return Ok(TurnOutcome::Answered(content));
                }
                ReplyKind::ToolCallsOnly | ReplyKind::Both => {
                    empty_replies = 0;
                    if tool_rounds >= self.max_tool_rounds {
                        warn!("tool round limit reached");
                        // The calls are never answered, so only the text
                        // is kept.
                        if kind == ReplyKind::Both {
                            self.conversation.push(ModelMessage::assistant(
                                content.clone(),
                                vec![],
                            ));
                            self.emit(&content, TranscriptSource::Assistant);
                        }
                        return Err(TurnError::ToolRoundsExceeded(
                            self.max_tool_rounds,
                        ));
                    }
                    tool_rounds += 1;

                    self.conversation.push(ModelMessage::assistant(
                        content.clone(),
                        tool_calls.clone(),
                    ));
                    if kind == ReplyKind::Both {
                        self.emit(&content, TranscriptSource::Assistant);
                    }
                    self.run_tools(tool_calls).await;
                }
                ReplyKind::Neither => {
                    if empty_replies >= self.max_empty_retries {
                        warn!("model returned {} empty replies", empty_replies + 1);
                        self.emit(FALLBACK_MESSAGE, TranscriptSource::Fallback);
                        return Ok(TurnOutcome::Fallback(
                            FALLBACK_MESSAGE.to_owned(),
                        ));
                    }
                    empty_replies += 1;
                    self.conversation
                        .push(ModelMessage::system(EMPTY_REPLY_CORRECTION));
                }
            }
        }
    }

    async fn request_reply(&self) -> Result<ModelClientResponse, TurnError> {
        let request = ModelRequest {
            messages: self.conversation.messages().to_vec(),
            tools: self.registry().definitions(),
        };
        self.model_client
            .send_request(request)
            .await
            .map_err(TurnError::Service)
    }

    async fn run_tools(
        &mut self,
        tool_calls: Vec<ToolCallRequest>,
    ) {
        for call in &tool_calls {
            let arguments = Value::Object(call.arguments.clone());
            self.emit(
                &format!("{}({arguments})", call.name),
                TranscriptSource::ToolCall,
            );
        }
        for result in self.dispatcher.dispatch(tool_calls).await {
            self.conversation
                .push(ModelMessage::tool(result.to_message_content()));
        }
    }

    #[inline]
    fn emit(&self, text: &str, source: TranscriptSource) {
        if let Some(on_transcript) = &self.on_transcript {
            on_transcript(text, source);
        }
    }
}
