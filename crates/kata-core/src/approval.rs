//! Human-in-the-loop approval for tool execution
//!
//! A [`GatedExecutor`] wraps any [`ToolExecutor`] and consults an
//! [`ApprovalPolicy`] before each call. Denied calls are reported back to the
//! model as a refusal string rather than failing the run.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::providers::types::ToolDefinition;
use crate::tools::ToolExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Deny,
}

#[async_trait]
pub trait ApprovalPolicy: Send + Sync {
    async fn review(&self, tool_name: &str, input: &Value) -> Result<ApprovalDecision>;
}

/// Approves every call (non-interactive runs, tests)
pub struct AllowAll;

#[async_trait]
impl ApprovalPolicy for AllowAll {
    async fn review(&self, _tool_name: &str, _input: &Value) -> Result<ApprovalDecision> {
        Ok(ApprovalDecision::Approve)
    }
}

/// Denies every call
pub struct DenyAll;

#[async_trait]
impl ApprovalPolicy for DenyAll {
    async fn review(&self, _tool_name: &str, _input: &Value) -> Result<ApprovalDecision> {
        Ok(ApprovalDecision::Deny)
    }
}

/// Prompts y/N on stdin before each tool call
pub struct ConsoleApproval;

#[async_trait]
impl ApprovalPolicy for ConsoleApproval {
    async fn review(&self, tool_name: &str, input: &Value) -> Result<ApprovalDecision> {
        let prompt = format!("  Allow tool '{}' with input {}? [y/N] ", tool_name, input);
        let line = tokio::task::spawn_blocking(move || {
            use std::io::{self, BufRead, Write};
            print!("{}", prompt);
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok::<_, io::Error>(line)
        })
        .await??;

        if line.trim().eq_ignore_ascii_case("y") {
            Ok(ApprovalDecision::Approve)
        } else {
            Ok(ApprovalDecision::Deny)
        }
    }
}

/// ToolExecutor wrapper that consults a policy before delegating
pub struct GatedExecutor {
    inner: Arc<dyn ToolExecutor>,
    policy: Arc<dyn ApprovalPolicy>,
}

impl GatedExecutor {
    pub fn new(inner: Arc<dyn ToolExecutor>, policy: Arc<dyn ApprovalPolicy>) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl ToolExecutor for GatedExecutor {
    async fn execute(&self, tool_name: &str, input: Value) -> Result<String> {
        match self.policy.review(tool_name, &input).await? {
            ApprovalDecision::Approve => {
                debug!("Tool '{}' approved", tool_name);
                self.inner.execute(tool_name, input).await
            }
            ApprovalDecision::Deny => {
                warn!("Tool '{}' denied by approval policy", tool_name);
                Ok(format!("Tool call '{}' was denied by the user.", tool_name))
            }
        }
    }

    fn list_tools(&self) -> Vec<ToolDefinition> {
        self.inner.list_tools()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolHandler, ToolRegistry, json_schema};

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn input_schema(&self) -> Value {
            json_schema(serde_json::json!({"word": {"type": "string"}}), vec!["word"])
        }

        async fn execute(&self, input: Value) -> Result<String> {
            Ok(input["word"].as_str().unwrap_or("").to_string())
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_approved_call_delegates() {
        let gated = GatedExecutor::new(registry(), Arc::new(AllowAll));
        let result = gated
            .execute("echo", serde_json::json!({"word": "through"}))
            .await
            .unwrap();
        assert_eq!(result, "through");
    }

    #[tokio::test]
    async fn test_denied_call_returns_refusal() {
        let gated = GatedExecutor::new(registry(), Arc::new(DenyAll));
        let result = gated
            .execute("echo", serde_json::json!({"word": "blocked"}))
            .await
            .unwrap();
        assert!(result.contains("denied"));
        assert!(result.contains("echo"));
    }

    #[tokio::test]
    async fn test_gate_preserves_tool_listing() {
        let gated = GatedExecutor::new(registry(), Arc::new(DenyAll));
        let tools = gated.list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");
    }
}
