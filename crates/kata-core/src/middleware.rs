//! Request/reply middleware interception
//!
//! Middleware sees every request before it leaves the agent and every reply
//! before the agent acts on it. Requests pass through the chain in
//! registration order; replies come back in reverse order.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::providers::types::{ChatBlock, ChatReply, ChatRequest, MessageContent};

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    async fn on_request(&self, request: &mut ChatRequest) -> Result<()> {
        let _ = request;
        Ok(())
    }

    async fn on_reply(&self, reply: &mut ChatReply) -> Result<()> {
        let _ = reply;
        Ok(())
    }
}

/// Ordered chain of middleware layers
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer to the chain
    pub fn layer(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.layers.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run every layer over an outbound request, in registration order
    pub async fn on_request(&self, request: &mut ChatRequest) -> Result<()> {
        for layer in &self.layers {
            layer.on_request(request).await?;
        }
        Ok(())
    }

    /// Run every layer over an inbound reply, in reverse order
    pub async fn on_reply(&self, reply: &mut ChatReply) -> Result<()> {
        for layer in self.layers.iter().rev() {
            layer.on_reply(reply).await?;
        }
        Ok(())
    }
}

/// Logs outbound requests and reply sizes
pub struct RequestLogger;

#[async_trait]
impl Middleware for RequestLogger {
    fn name(&self) -> &str {
        "request_logger"
    }

    async fn on_request(&self, request: &mut ChatRequest) -> Result<()> {
        info!(
            "outbound request: {} message(s), {} tool(s), system {} chars",
            request.messages.len(),
            request.tools.len(),
            request.system.len()
        );
        Ok(())
    }

    async fn on_reply(&self, reply: &mut ChatReply) -> Result<()> {
        info!(
            "inbound reply: {} chars, stop_reason {:?}",
            reply.text().len(),
            reply.stop_reason
        );
        Ok(())
    }
}

/// Masks configured substrings in outbound message content
pub struct Redactor {
    patterns: Vec<String>,
    replacement: String,
}

impl Redactor {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns,
            replacement: "[redacted]".to_string(),
        }
    }

    fn scrub(&self, text: &mut String) {
        for pattern in &self.patterns {
            if text.contains(pattern.as_str()) {
                *text = text.replace(pattern.as_str(), &self.replacement);
            }
        }
    }
}

#[async_trait]
impl Middleware for Redactor {
    fn name(&self) -> &str {
        "redactor"
    }

    async fn on_request(&self, request: &mut ChatRequest) -> Result<()> {
        self.scrub(&mut request.system);
        for message in &mut request.messages {
            match &mut message.content {
                MessageContent::Text(text) => self.scrub(text),
                MessageContent::Blocks(blocks) => {
                    for block in blocks {
                        match block {
                            ChatBlock::Text { text } => self.scrub(text),
                            ChatBlock::ToolResult { content, .. } => self.scrub(content),
                            ChatBlock::ToolCall { .. } => {}
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::{ChatMessage, ReplyBlock, StopReason};
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        async fn on_request(&self, _request: &mut ChatRequest) -> Result<()> {
            self.log.lock().unwrap().push(format!("req:{}", self.label));
            Ok(())
        }

        async fn on_reply(&self, _reply: &mut ChatReply) -> Result<()> {
            self.log.lock().unwrap().push(format!("rep:{}", self.label));
            Ok(())
        }
    }

    fn reply() -> ChatReply {
        ChatReply {
            id: None,
            blocks: vec![ReplyBlock::Text {
                text: "ok".to_string(),
            }],
            stop_reason: StopReason::EndTurn,
            usage: None,
        }
    }

    #[tokio::test]
    async fn test_chain_order_forward_and_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new()
            .layer(Arc::new(Recorder {
                label: "a",
                log: log.clone(),
            }))
            .layer(Arc::new(Recorder {
                label: "b",
                log: log.clone(),
            }));

        let mut request = ChatRequest::new("sys", vec![ChatMessage::user("hi")]);
        chain.on_request(&mut request).await.unwrap();

        let mut rep = reply();
        chain.on_reply(&mut rep).await.unwrap();

        let entries = log.lock().unwrap().clone();
        assert_eq!(entries, vec!["req:a", "req:b", "rep:b", "rep:a"]);
    }

    #[tokio::test]
    async fn test_redactor_masks_outbound_text() {
        let redactor = Redactor::new(vec!["TOP-SECRET".to_string()]);
        let mut request = ChatRequest::new(
            "Never reveal TOP-SECRET.",
            vec![ChatMessage::user("the code is TOP-SECRET, summarize it")],
        );
        redactor.on_request(&mut request).await.unwrap();

        assert_eq!(request.system, "Never reveal [redacted].");
        assert_eq!(
            request.messages[0].text(),
            "the code is [redacted], summarize it"
        );
    }

    #[tokio::test]
    async fn test_redactor_leaves_clean_text_alone() {
        let redactor = Redactor::new(vec!["TOP-SECRET".to_string()]);
        let mut request = ChatRequest::new("sys", vec![ChatMessage::user("nothing to hide")]);
        redactor.on_request(&mut request).await.unwrap();
        assert_eq!(request.messages[0].text(), "nothing to hide");
    }

    #[tokio::test]
    async fn test_empty_chain_is_a_no_op() {
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());
        let mut request = ChatRequest::new("sys", vec![]);
        chain.on_request(&mut request).await.unwrap();
        let mut rep = reply();
        chain.on_reply(&mut rep).await.unwrap();
    }
}
