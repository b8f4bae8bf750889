//! Wire types for the agent-exposure protocol

use serde::{Deserialize, Serialize};

/// Describes the exposed agent; served at `/.well-known/agent.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub provider: String,
    pub model: String,
    pub version: String,
}

/// Request body for `POST /v1/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTask {
    pub message: String,
}

/// Response body for `POST /v1/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTaskReply {
    pub id: String,
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Error body for non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn json(message: impl Into<String>) -> String {
        serde_json::to_string(&ErrorBody {
            error: message.into(),
        })
        .unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string())
    }
}
