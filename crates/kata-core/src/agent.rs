//! Agent — a named, instruction-bound wrapper around a chat client
//!
//! The agent owns no conversation state; the caller holds the
//! [`ConversationThread`] and passes it in per turn. `send` runs the bounded
//! tool loop until the model produces a text-only reply; `send_stream` yields
//! fragments as they arrive and skips tools entirely.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::middleware::MiddlewareChain;
use crate::providers::stream::{TokenStream, cancellable};
use crate::providers::types::{
    ChatBlock, ChatClient, ChatMessage, ChatOptions, ChatReply, ChatRequest, ChatRole,
    MessageContent, ReplyBlock,
};
use crate::thread::ConversationThread;
use crate::tools::ToolExecutor;
use crate::usage::AccumulatedUsage;

const MAX_TOOL_ROUNDS: usize = 10;
const MAX_TOOL_OUTPUT: usize = 100_000;

pub struct Agent {
    name: String,
    instructions: String,
    client: Arc<dyn ChatClient>,
    tools: Option<Arc<dyn ToolExecutor>>,
    middleware: MiddlewareChain,
    options: ChatOptions,
}

/// Outcome of one agent interaction
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub text: String,
    pub usage: AccumulatedUsage,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        client: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            client,
            tools: None,
            middleware: MiddlewareChain::new(),
            options: ChatOptions::default(),
        }
    }

    /// Give the agent tools it may invoke
    pub fn with_tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set the middleware chain
    pub fn with_middleware(mut self, middleware: MiddlewareChain) -> Self {
        self.middleware = middleware;
        self
    }

    /// Set per-request generation options
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Arc<dyn ChatClient> {
        &self.client
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Append the user turn and run the tool loop until the model settles on
    /// a text reply. The assistant turns (including tool calls and results)
    /// are appended to the thread as the loop progresses.
    pub async fn send(&self, thread: &mut ConversationThread, text: &str) -> Result<AgentReply> {
        thread.push_user(text);

        let mut usage = AccumulatedUsage::new();
        let tool_definitions = self
            .tools
            .as_ref()
            .map(|t| t.list_tools())
            .unwrap_or_default();

        let mut rounds = 0;
        loop {
            rounds += 1;
            if rounds > MAX_TOOL_ROUNDS {
                warn!("{}: tool loop exceeded {} rounds", self.name, MAX_TOOL_ROUNDS);
                return Err(anyhow!(
                    "tool loop exceeded maximum rounds ({})",
                    MAX_TOOL_ROUNDS
                ));
            }

            let mut request =
                ChatRequest::new(self.instructions.clone(), thread.messages().to_vec())
                    .with_tools(tool_definitions.clone())
                    .with_options(self.options.clone());
            self.middleware.on_request(&mut request).await?;

            let mut reply = self.client.chat(&request).await.with_context(|| {
                format!(
                    "chat request via {} ({}) failed",
                    self.client.provider_name(),
                    self.client.model()
                )
            })?;
            self.middleware.on_reply(&mut reply).await?;

            if let Some(u) = reply.usage {
                usage.add(u.input_tokens, u.output_tokens);
            }

            thread.push(assistant_message(&reply));

            if reply.stop_reason.is_tool_use() {
                let executor = self
                    .tools
                    .as_ref()
                    .ok_or_else(|| anyhow!("model requested tools but none are registered"))?;

                let mut results = Vec::new();
                for (id, tool_name, input) in reply.tool_calls() {
                    info!("{}: executing tool {}", self.name, tool_name);
                    usage.record_tool_call(tool_name);

                    let mut output = match executor.execute(tool_name, input.clone()).await {
                        Ok(output) => output,
                        Err(e) => {
                            warn!("Tool {} failed: {}", tool_name, e);
                            format!("Error: {}", e)
                        }
                    };
                    if output.len() > MAX_TOOL_OUTPUT {
                        output.truncate(MAX_TOOL_OUTPUT);
                        output.push_str("\n[Output truncated]");
                    }

                    results.push(ChatBlock::ToolResult {
                        tool_call_id: id.to_string(),
                        content: output,
                    });
                }

                thread.push(ChatMessage {
                    role: ChatRole::User,
                    content: MessageContent::Blocks(results),
                });
                continue;
            }

            let text = reply.text();
            if text.is_empty() {
                return Err(anyhow!(
                    "empty text response from {}",
                    self.client.provider_name()
                ));
            }

            debug!(
                "{}: reply after {} round(s), {} tokens",
                self.name,
                rounds,
                usage.total_tokens()
            );
            return Ok(AgentReply { text, usage });
        }
    }

    /// Streaming variant: append the user turn and return a fragment stream
    /// that ends when `cancel` fires. Tools are not consulted; the caller
    /// appends the assembled text to the thread once consumption finishes.
    pub async fn send_stream(
        &self,
        thread: &mut ConversationThread,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<TokenStream> {
        thread.push_user(text);

        let mut request = ChatRequest::new(self.instructions.clone(), thread.messages().to_vec())
            .with_options(self.options.clone());
        self.middleware.on_request(&mut request).await?;

        let stream = self.client.chat_stream(&request).await.with_context(|| {
            format!(
                "streaming request via {} ({}) failed",
                self.client.provider_name(),
                self.client.model()
            )
        })?;

        Ok(cancellable(stream, cancel))
    }
}

/// Rebuild the assistant's thread message from a reply
fn assistant_message(reply: &ChatReply) -> ChatMessage {
    let blocks = reply
        .blocks
        .iter()
        .map(|block| match block {
            ReplyBlock::Text { text } => ChatBlock::Text { text: text.clone() },
            ReplyBlock::ToolCall { id, name, input } => ChatBlock::ToolCall {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
        })
        .collect();

    ChatMessage {
        role: ChatRole::Assistant,
        content: MessageContent::Blocks(blocks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::{StopReason, TokenUsage};
    use crate::tools::{ToolHandler, ToolRegistry, json_schema};
    use async_trait::async_trait;
    use futures::StreamExt;
    use serde_json::Value;
    use std::sync::Mutex;

    /// Scripted client: pops one canned reply per chat() call
    #[derive(Debug)]
    struct ScriptClient {
        replies: Mutex<Vec<ChatReply>>,
        fragments: Vec<String>,
    }

    impl ScriptClient {
        fn new(mut replies: Vec<ChatReply>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                fragments: vec!["hel".to_string(), "lo".to_string()],
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptClient {
        fn provider_name(&self) -> &str {
            "script"
        }

        fn model(&self) -> &str {
            "script-1"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatReply> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| anyhow!("script exhausted"))
        }

        async fn chat_stream(&self, _request: &ChatRequest) -> Result<TokenStream> {
            let fragments: Vec<Result<String>> =
                self.fragments.iter().cloned().map(Ok).collect();
            Ok(Box::pin(futures::stream::iter(fragments)))
        }
    }

    fn text_reply(text: &str) -> ChatReply {
        ChatReply {
            id: None,
            blocks: vec![ReplyBlock::Text {
                text: text.to_string(),
            }],
            stop_reason: StopReason::EndTurn,
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            }),
        }
    }

    fn tool_call_reply(tool: &str, input: Value) -> ChatReply {
        ChatReply {
            id: None,
            blocks: vec![ReplyBlock::ToolCall {
                id: "tc_1".to_string(),
                name: tool.to_string(),
                input,
            }],
            stop_reason: StopReason::ToolUse,
            usage: Some(TokenUsage {
                input_tokens: 20,
                output_tokens: 8,
            }),
        }
    }

    struct UppercaseTool;

    #[async_trait]
    impl ToolHandler for UppercaseTool {
        fn name(&self) -> &str {
            "uppercase"
        }

        fn description(&self) -> &str {
            "Uppercases a word"
        }

        fn input_schema(&self) -> Value {
            json_schema(serde_json::json!({"word": {"type": "string"}}), vec!["word"])
        }

        async fn execute(&self, input: Value) -> Result<String> {
            Ok(input["word"].as_str().unwrap_or("").to_uppercase())
        }
    }

    fn tool_registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UppercaseTool));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_send_plain_text() {
        let client = Arc::new(ScriptClient::new(vec![text_reply("hello there")]));
        let agent = Agent::new("tester", "be brief", client);

        let mut thread = ConversationThread::new();
        let reply = agent.send(&mut thread, "hi").await.unwrap();

        assert_eq!(reply.text, "hello there");
        assert_eq!(reply.usage.api_calls, 1);
        assert_eq!(reply.usage.total_tokens(), 15);
        // user turn + assistant turn
        assert_eq!(thread.len(), 2);
        assert_eq!(thread.messages()[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_send_runs_tool_loop() {
        let client = Arc::new(ScriptClient::new(vec![
            tool_call_reply("uppercase", serde_json::json!({"word": "quiet"})),
            text_reply("The word is QUIET."),
        ]));
        let agent = Agent::new("tester", "use tools", client).with_tools(tool_registry());

        let mut thread = ConversationThread::new();
        let reply = agent.send(&mut thread, "shout it").await.unwrap();

        assert_eq!(reply.text, "The word is QUIET.");
        assert_eq!(reply.usage.api_calls, 2);
        assert_eq!(reply.usage.tool_calls, vec!["uppercase"]);

        // user, assistant(tool call), user(tool result), assistant(text)
        assert_eq!(thread.len(), 4);
        match &thread.messages()[2].content {
            MessageContent::Blocks(blocks) => match &blocks[0] {
                ChatBlock::ToolResult {
                    tool_call_id,
                    content,
                } => {
                    assert_eq!(tool_call_id, "tc_1");
                    assert_eq!(content, "QUIET");
                }
                other => panic!("expected tool result, got {:?}", other),
            },
            other => panic!("expected blocks, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tool_failure_feeds_error_back() {
        let client = Arc::new(ScriptClient::new(vec![
            tool_call_reply("unknown_tool", serde_json::json!({})),
            text_reply("I could not do that."),
        ]));
        let agent = Agent::new("tester", "use tools", client).with_tools(tool_registry());

        let mut thread = ConversationThread::new();
        let reply = agent.send(&mut thread, "go").await.unwrap();

        assert_eq!(reply.text, "I could not do that.");
        // the failure is in the tool result, not a process error
        match &thread.messages()[2].content {
            MessageContent::Blocks(blocks) => match &blocks[0] {
                ChatBlock::ToolResult { content, .. } => {
                    assert!(content.starts_with("Error:"));
                }
                other => panic!("expected tool result, got {:?}", other),
            },
            other => panic!("expected blocks, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tool_call_without_registry_is_an_error() {
        let client = Arc::new(ScriptClient::new(vec![tool_call_reply(
            "uppercase",
            serde_json::json!({"word": "x"}),
        )]));
        let agent = Agent::new("tester", "sys", client);

        let mut thread = ConversationThread::new();
        let err = agent.send(&mut thread, "go").await.unwrap_err();
        assert!(err.to_string().contains("none are registered"));
    }

    #[tokio::test]
    async fn test_runaway_tool_loop_is_bounded() {
        let replies: Vec<ChatReply> = (0..=MAX_TOOL_ROUNDS)
            .map(|_| tool_call_reply("uppercase", serde_json::json!({"word": "again"})))
            .collect();
        let client = Arc::new(ScriptClient::new(replies));
        let agent = Agent::new("tester", "sys", client).with_tools(tool_registry());

        let mut thread = ConversationThread::new();
        let err = agent.send(&mut thread, "loop forever").await.unwrap_err();
        assert!(err.to_string().contains("maximum rounds"));
    }

    #[tokio::test]
    async fn test_send_stream_yields_fragments() {
        let client = Arc::new(ScriptClient::new(vec![]));
        let agent = Agent::new("tester", "sys", client);

        let mut thread = ConversationThread::new();
        let stream = agent
            .send_stream(&mut thread, "hi", CancellationToken::new())
            .await
            .unwrap();

        let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
        assert_eq!(fragments.join(""), "hello");
        // user turn is on the thread; assistant turn is the caller's job
        assert_eq!(thread.len(), 1);
    }
}
