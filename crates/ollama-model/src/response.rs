use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use toolchat_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};

use crate::Error;
use crate::io::{NdJson, NdJsonError};
use crate::proto::ChatResponseChunk;

struct PartialState {
    lines: NdJson,
    // Events decoded from the last chunk but not yet handed out. One chunk
    // may carry content, several tool calls and the completion at once.
    pending: VecDeque<ModelResponseEvent>,
    saw_tool_call: bool,
    finished: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OllamaResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OllamaResponse {
    #[inline]
    pub(crate) fn from_lines(lines: NdJson) -> Self {
        let partial_state = PartialState {
            lines,
            pending: Default::default(),
            saw_tool_call: false,
            finished: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for OllamaResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.finished {
            return Ok((None, partial_state));
        }

        let line = match partial_state.lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                return Err(Error::new(
                    "response ended before completion",
                    ErrorKind::MalformedResponse,
                ));
            }
            Err(NdJsonError::ChunksError(_)) => {
                return Err(Error::new(
                    "connection broke while reading the response",
                    ErrorKind::Unavailable,
                ));
            }
            Err(NdJsonError::InvalidPayload) => {
                return Err(Error::new(
                    "response is not valid UTF-8",
                    ErrorKind::MalformedResponse,
                ));
            }
        };
        trace!("got chunk: {line}");

        let chunk = serde_json::from_str::<ChatResponseChunk>(&line).map_err(
            |err| Error::new(format!("{err}"), ErrorKind::MalformedResponse),
        )?;
        if let Some(message) = chunk.error {
            return Err(Error::new(message, ErrorKind::Other));
        }

        // The order of events are important. Always emit message delta
        // first, then tool calls, and finally the finish reason.
        if let Some(message) = chunk.message {
            if !message.content.is_empty() {
                partial_state
                    .pending
                    .push_back(ModelResponseEvent::MessageDelta(message.content));
            }
            for tool_call in message.tool_calls {
                partial_state.saw_tool_call = true;
                partial_state
                    .pending
                    .push_back(ModelResponseEvent::ToolCall(tool_call.into()));
            }
        }

        if chunk.done {
            let reason = if partial_state.saw_tool_call {
                ModelFinishReason::ToolCalls
            } else if chunk.done_reason.as_deref() == Some("length") {
                ModelFinishReason::Length
            } else {
                ModelFinishReason::Stop
            };
            partial_state
                .pending
                .push_back(ModelResponseEvent::Completed(reason));
            partial_state.finished = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use toolchat_model::ModelProviderError;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        body: &'static [&'static [u8]],
    ) -> Result<Vec<ModelResponseEvent>, Error> {
        let chunks = Chunks::from_vec_deque(
            body.iter().map(|b| Bytes::from_static(*b)).collect(),
        );
        let mut resp = pin!(OllamaResponse::from_lines(NdJson::new(chunks)));
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            events.push(event);
        }
        Ok(events)
    }

    #[tokio::test]
    async fn test_single_object() {
        let events = collect(&[br#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"run_command","arguments":{"command":"pwd"}}},{"function":{"name":"get_current_date_time","arguments":{}}}]},"done":true,"done_reason":"stop"}"#])
            .await
            .unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            ModelResponseEvent::ToolCall(req) if req.name == "run_command"
        ));
        assert!(matches!(
            &events[1],
            ModelResponseEvent::ToolCall(req) if req.name == "get_current_date_time"
        ));
        assert_eq!(
            events[2],
            ModelResponseEvent::Completed(ModelFinishReason::ToolCalls)
        );
    }

    #[tokio::test]
    async fn test_streamed_content() {
        let events = collect(&[
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"It is \"},\"done\":false}\n",
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"noon.\"},\"done\":false}\n",
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"done_reason\":\"length\"}\n",
        ])
        .await
        .unwrap();
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("It is ".to_owned()),
                ModelResponseEvent::MessageDelta("noon.".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Length),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let events = collect(&[
            br#"{"message":{"role":"assistant","content":""},"done":true}"#,
        ])
        .await
        .unwrap();
        assert_eq!(
            events,
            vec![ModelResponseEvent::Completed(ModelFinishReason::Stop)]
        );
    }

    #[tokio::test]
    async fn test_errors() {
        let err = collect(&[br#"{"error":"model 'nope' not found"}"#])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.message(), "model 'nope' not found");

        let err = collect(&[b"{\"message\":{\"content\":\"cut\"},\"done\":false}\n"])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);

        let err = collect(&[b"not json\n"]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }
}
