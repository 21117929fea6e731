use serde::{Deserialize, Serialize};
use toolchat_model::ToolCallRequest;

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallRequest),
}

/// The preset response for an assistant step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request fails as if the service were unreachable.
    #[serde(default)]
    pub fail: bool,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            fail: false,
        }
    }

    /// A reply that carries the given text only.
    #[inline]
    pub fn content<S: Into<String>>(text: S) -> Self {
        Self::with_events([PresetEvent::MessageDelta(text.into())])
    }

    /// A reply that carries the given tool calls only.
    #[inline]
    pub fn tool_calls(calls: impl IntoIterator<Item = ToolCallRequest>) -> Self {
        Self::with_events(
            calls.into_iter().map(PresetEvent::ToolCall).collect::<Vec<_>>(),
        )
    }

    /// A reply with neither content nor tool calls.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A request that fails before any event is produced.
    #[inline]
    pub fn failure() -> Self {
        Self {
            events: vec![],
            fail: true,
        }
    }
}
