use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use toolchat_model::{
    ModelMessage, ModelRequest, ModelTool, Role, ToolCallRequest,
};

use crate::OllamaConfig;

// -------------------------------
// Types shared in both directions
// -------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatResponseChunk {
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub done: bool,
    pub done_reason: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct Tool {
    r#type: &'static str,
    function: FunctionTool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    role: Role,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    options: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<Value>,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &OllamaConfig,
) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        tools: req.tools.iter().map(create_tool).collect(),
        options: config.options.clone(),
        format: config.format.clone(),
        keep_alive: config.keep_alive.clone(),
        stream: config.stream,
    }
}

#[inline]
fn create_message(msg: &ModelMessage) -> Message {
    Message {
        role: msg.role,
        content: msg.content.clone(),
        tool_calls: msg
            .tool_calls
            .iter()
            .map(|call| ToolCall {
                function: FunctionCall {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                },
            })
            .collect(),
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool {
    // The service insists on an object schema, even for tools that take
    // no parameters.
    let parameters = tool
        .parameters
        .clone()
        .unwrap_or_else(|| json!({ "type": "object", "properties": {} }));
    Tool {
        r#type: "function",
        function: FunctionTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters,
        },
    }
}

impl From<ToolCall> for ToolCallRequest {
    #[inline]
    fn from(call: ToolCall) -> Self {
        ToolCallRequest {
            name: call.function.name,
            arguments: call.function.arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OllamaConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::system("You are a concise assistant."),
                ModelMessage::user("What time is it?"),
                ModelMessage::assistant(
                    "",
                    vec![ToolCallRequest::new("get_current_date_time")],
                ),
                ModelMessage::tool(r#"{"name":"get_current_date_time"}"#),
            ],
            tools: vec![
                ModelTool {
                    name: "run_command".to_owned(),
                    description: "Runs a command.".to_owned(),
                    parameters: Some(json!({
                        "type": "object",
                        "properties": { "command": { "type": "string" } },
                        "required": ["command"]
                    })),
                },
                ModelTool {
                    name: "get_current_date_time".to_owned(),
                    description: "Gets the local time.".to_owned(),
                    parameters: None,
                },
            ],
        };
        let config = OllamaConfigBuilder::new()
            .with_model("custom")
            .with_option("seed", 256)
            .build();

        let value =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "custom",
                "messages": [
                    { "role": "system", "content": "You are a concise assistant." },
                    { "role": "user", "content": "What time is it?" },
                    {
                        "role": "assistant",
                        "content": "",
                        "tool_calls": [{
                            "function": {
                                "name": "get_current_date_time",
                                "arguments": {}
                            }
                        }]
                    },
                    { "role": "tool", "content": "{\"name\":\"get_current_date_time\"}" }
                ],
                "tools": [
                    {
                        "type": "function",
                        "function": {
                            "name": "run_command",
                            "description": "Runs a command.",
                            "parameters": {
                                "type": "object",
                                "properties": { "command": { "type": "string" } },
                                "required": ["command"]
                            }
                        }
                    },
                    {
                        "type": "function",
                        "function": {
                            "name": "get_current_date_time",
                            "description": "Gets the local time.",
                            "parameters": { "type": "object", "properties": {} }
                        }
                    }
                ],
                "options": { "seed": 256 },
                "stream": false
            })
        );
    }

    #[test]
    fn test_decode_chunk() {
        let chunk: ChatResponseChunk = serde_json::from_str(
            r#"{
                "model": "llama3.2:latest",
                "created_at": "2025-03-16T10:30:45Z",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [
                        { "function": { "name": "run_command", "arguments": { "command": "pwd" } } },
                        { "function": { "name": "get_current_date_time" } }
                    ]
                },
                "done": true,
                "done_reason": "stop"
            }"#,
        )
        .unwrap();
        assert!(chunk.done);
        let message = chunk.message.unwrap();
        let calls: Vec<ToolCallRequest> =
            message.tool_calls.into_iter().map(Into::into).collect();
        assert_eq!(calls[0].arguments["command"], json!("pwd"));
        assert!(calls[1].arguments.is_empty());
    }
}
