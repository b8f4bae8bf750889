//! Demo tools used by the function-calling and approval labs

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;

use super::{ToolHandler, json_schema};

/// Reports the current date and time
pub struct CurrentTimeTool;

#[async_trait]
impl ToolHandler for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time. Use this whenever the user asks what time or day it is."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "timezone": {
                    "type": "string",
                    "enum": ["utc", "local"],
                    "description": "Which clock to read (default: utc)"
                }
            }),
            vec![],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let timezone = input["timezone"].as_str().unwrap_or("utc");
        match timezone {
            "local" => Ok(chrono::Local::now().to_rfc3339()),
            _ => Ok(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Basic arithmetic on two numbers
pub struct CalculatorTool;

#[async_trait]
impl ToolHandler for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform basic arithmetic on two numbers. Supports +, -, * and /."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "a": {"type": "number", "description": "Left operand"},
                "b": {"type": "number", "description": "Right operand"},
                "op": {"type": "string", "enum": ["+", "-", "*", "/"], "description": "Operator"}
            }),
            vec!["a", "b", "op"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let a = input["a"]
            .as_f64()
            .ok_or_else(|| anyhow!("'a' must be a number"))?;
        let b = input["b"]
            .as_f64()
            .ok_or_else(|| anyhow!("'b' must be a number"))?;
        let op = input["op"]
            .as_str()
            .ok_or_else(|| anyhow!("'op' must be a string"))?;

        let result = match op {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            "/" => {
                if b == 0.0 {
                    return Err(anyhow!("division by zero"));
                }
                a / b
            }
            other => return Err(anyhow!("unsupported operator: {}", other)),
        };

        Ok(result.to_string())
    }
}
