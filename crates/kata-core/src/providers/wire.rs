//! OpenAI chat-completions wire format, shared by both providers
//!
//! The hosted OpenAI API and a local Ollama server expose the same
//! `/v1/chat/completions` surface; only transport details (auth, base URL)
//! differ per client.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{
    ChatBlock, ChatReply, ChatRequest, ChatRole, MessageContent, ReplyBlock, StopReason,
    TokenUsage, ToolDefinition,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireToolCall {
    pub id: String,
    pub r#type: String,
    pub function: WireFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireFunction {
    pub name: String,
    /// JSON-encoded arguments string, as the wire format specifies
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireToolDef {
    pub r#type: String,
    pub function: WireToolFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub choices: Vec<WireChoice>,
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireChoice {
    pub message: WireChoiceMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireChoiceMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Convert provider-agnostic messages to the wire format. The system prompt
/// becomes the leading `system` message.
pub(crate) fn to_wire_messages(request: &ChatRequest) -> Vec<WireMessage> {
    let mut result = Vec::new();

    if !request.system.is_empty() {
        result.push(WireMessage {
            role: "system".to_string(),
            content: Some(request.system.clone()),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    for msg in &request.messages {
        match (&msg.role, &msg.content) {
            (ChatRole::System, content) => {
                result.push(WireMessage {
                    role: "system".to_string(),
                    content: Some(match content {
                        MessageContent::Text(text) => text.clone(),
                        MessageContent::Blocks(_) => msg.text(),
                    }),
                    tool_calls: None,
                    tool_call_id: None,
                });
            }
            (role, MessageContent::Text(text)) => {
                result.push(WireMessage {
                    role: role.to_string(),
                    content: Some(text.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                });
            }
            (ChatRole::Assistant, MessageContent::Blocks(blocks)) => {
                let mut text_parts = Vec::new();
                let mut tool_calls = Vec::new();

                for block in blocks {
                    match block {
                        ChatBlock::Text { text } => text_parts.push(text.clone()),
                        ChatBlock::ToolCall { id, name, input } => {
                            tool_calls.push(WireToolCall {
                                id: id.clone(),
                                r#type: "function".to_string(),
                                function: WireFunction {
                                    name: name.clone(),
                                    arguments: serde_json::to_string(input).unwrap_or_default(),
                                },
                            });
                        }
                        ChatBlock::ToolResult { .. } => {}
                    }
                }

                let content = if text_parts.is_empty() {
                    None
                } else {
                    Some(text_parts.join("\n"))
                };

                result.push(WireMessage {
                    role: "assistant".to_string(),
                    content,
                    tool_calls: if tool_calls.is_empty() {
                        None
                    } else {
                        Some(tool_calls)
                    },
                    tool_call_id: None,
                });
            }
            (ChatRole::User, MessageContent::Blocks(blocks)) => {
                // Tool results become separate "tool" role messages on the wire
                let mut text_parts = Vec::new();

                for block in blocks {
                    match block {
                        ChatBlock::Text { text } => text_parts.push(text.clone()),
                        ChatBlock::ToolResult {
                            tool_call_id,
                            content,
                        } => {
                            result.push(WireMessage {
                                role: "tool".to_string(),
                                content: Some(content.clone()),
                                tool_calls: None,
                                tool_call_id: Some(tool_call_id.clone()),
                            });
                        }
                        ChatBlock::ToolCall { .. } => {}
                    }
                }

                if !text_parts.is_empty() {
                    result.push(WireMessage {
                        role: "user".to_string(),
                        content: Some(text_parts.join("\n")),
                        tool_calls: None,
                        tool_call_id: None,
                    });
                }
            }
        }
    }

    result
}

/// Convert tool definitions to the wire's function format
pub(crate) fn to_wire_tools(tools: &[ToolDefinition]) -> Vec<WireToolDef> {
    tools
        .iter()
        .map(|t| WireToolDef {
            r#type: "function".to_string(),
            function: WireToolFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            },
        })
        .collect()
}

/// Build the POST body for one request
pub(crate) fn request_body(model: &str, request: &ChatRequest, stream: bool) -> Result<Value> {
    let messages = to_wire_messages(request);

    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
    });

    if !request.tools.is_empty() {
        body["tools"] = serde_json::to_value(to_wire_tools(&request.tools))?;
    }
    if let Some(temperature) = request.options.temperature {
        body["temperature"] = serde_json::json!(temperature);
    }
    if let Some(max_tokens) = request.options.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    if stream {
        body["stream"] = serde_json::json!(true);
    }

    Ok(body)
}

/// Convert a wire response to the provider-agnostic reply
pub(crate) fn from_wire_response(resp: WireResponse) -> Result<ChatReply> {
    let id = resp.id;
    let usage = resp.usage.map(|u| TokenUsage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("response had no choices"))?;

    let mut blocks = Vec::new();

    if let Some(content) = choice.message.content
        && !content.is_empty()
    {
        blocks.push(ReplyBlock::Text { text: content });
    }

    if let Some(tool_calls) = choice.message.tool_calls {
        for tc in tool_calls {
            let input: Value = serde_json::from_str(&tc.function.arguments)
                .unwrap_or(Value::Object(serde_json::Map::new()));
            blocks.push(ReplyBlock::ToolCall {
                id: tc.id,
                name: tc.function.name,
                input,
            });
        }
    }

    let stop_reason = match choice.finish_reason.as_deref() {
        Some("tool_calls") => StopReason::ToolUse,
        Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::Unknown,
    };

    Ok(ChatReply {
        id,
        blocks,
        stop_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::{ChatMessage, ChatOptions};

    #[test]
    fn test_to_wire_messages_simple() {
        let request = ChatRequest::new("You are helpful.", vec![ChatMessage::user("hello")]);
        let result = to_wire_messages(&request);
        // system + user = 2
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].role, "system");
        assert_eq!(result[0].content.as_deref(), Some("You are helpful."));
        assert_eq!(result[1].role, "user");
        assert_eq!(result[1].content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_to_wire_messages_empty_system_omitted() {
        let request = ChatRequest::new("", vec![ChatMessage::user("hi")]);
        let result = to_wire_messages(&request);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].role, "user");
    }

    #[test]
    fn test_to_wire_messages_with_tool_calls() {
        let request = ChatRequest::new(
            "sys",
            vec![
                ChatMessage::user("what time is it"),
                ChatMessage {
                    role: ChatRole::Assistant,
                    content: MessageContent::Blocks(vec![ChatBlock::ToolCall {
                        id: "tc_1".to_string(),
                        name: "current_time".to_string(),
                        input: serde_json::json!({"timezone": "utc"}),
                    }]),
                },
                ChatMessage {
                    role: ChatRole::User,
                    content: MessageContent::Blocks(vec![ChatBlock::ToolResult {
                        tool_call_id: "tc_1".to_string(),
                        content: "2026-08-08T12:00:00Z".to_string(),
                    }]),
                },
            ],
        );
        let result = to_wire_messages(&request);
        // system + user + assistant(tool_call) + tool(result) = 4
        assert_eq!(result.len(), 4);
        assert_eq!(result[2].role, "assistant");
        assert!(result[2].tool_calls.is_some());
        assert_eq!(result[3].role, "tool");
        assert_eq!(result[3].tool_call_id.as_deref(), Some("tc_1"));
    }

    #[test]
    fn test_to_wire_tools() {
        let tools = vec![ToolDefinition {
            name: "calculator".to_string(),
            description: "Basic arithmetic".to_string(),
            input_schema: serde_json::json!({"type": "object", "properties": {"a": {"type": "number"}}}),
        }];
        let result = to_wire_tools(&tools);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].r#type, "function");
        assert_eq!(result[0].function.name, "calculator");
    }

    #[test]
    fn test_request_body_optional_fields() {
        let request = ChatRequest::new("sys", vec![ChatMessage::user("hi")]);
        let body = request_body("gpt-4o-mini", &request, false).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert!(body.get("tools").is_none());
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("stream").is_none());

        let request = request.with_options(ChatOptions {
            temperature: Some(0.7),
            max_tokens: Some(256),
        });
        let body = request_body("gpt-4o-mini", &request, true).unwrap();
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_from_wire_response_text() {
        let json = r#"{
            "id": "chatcmpl-123",
            "choices": [
                {
                    "message": {"content": "Hello!", "tool_calls": null},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }"#;
        let resp: WireResponse = serde_json::from_str(json).unwrap();
        let reply = from_wire_response(resp).unwrap();
        assert_eq!(reply.id.as_deref(), Some("chatcmpl-123"));
        assert_eq!(reply.stop_reason, StopReason::EndTurn);
        assert_eq!(reply.text(), "Hello!");
        let usage = reply.usage.unwrap();
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 5);
    }

    #[test]
    fn test_from_wire_response_tool_calls() {
        let json = r#"{
            "choices": [
                {
                    "message": {
                        "content": null,
                        "tool_calls": [
                            {
                                "id": "call_1",
                                "type": "function",
                                "function": {"name": "calculator", "arguments": "{\"a\": 2, \"b\": 3, \"op\": \"+\"}"}
                            }
                        ]
                    },
                    "finish_reason": "tool_calls"
                }
            ],
            "usage": null
        }"#;
        let resp: WireResponse = serde_json::from_str(json).unwrap();
        let reply = from_wire_response(resp).unwrap();
        assert!(reply.id.is_none());
        assert!(reply.usage.is_none());
        assert_eq!(reply.stop_reason, StopReason::ToolUse);
        let calls = reply.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "calculator");
        assert_eq!(calls[0].2["op"], "+");
    }

    #[test]
    fn test_from_wire_response_malformed_arguments() {
        let resp = WireResponse {
            id: None,
            choices: vec![WireChoice {
                message: WireChoiceMessage {
                    content: None,
                    tool_calls: Some(vec![WireToolCall {
                        id: "call_1".to_string(),
                        r#type: "function".to_string(),
                        function: WireFunction {
                            name: "calculator".to_string(),
                            arguments: "not json".to_string(),
                        },
                    }]),
                },
                finish_reason: Some("tool_calls".to_string()),
            }],
            usage: None,
        };
        let reply = from_wire_response(resp).unwrap();
        // malformed arguments degrade to an empty object rather than failing
        assert_eq!(reply.tool_calls()[0].2, &serde_json::json!({}));
    }

    #[test]
    fn test_from_wire_response_no_choices() {
        let resp = WireResponse {
            id: None,
            choices: vec![],
            usage: None,
        };
        assert!(from_wire_response(resp).is_err());
    }
}
