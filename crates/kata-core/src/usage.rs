//! Usage telemetry and cost estimation
//!
//! Tracks token usage per model call, estimates cost from a configurable
//! price table, and renders a per-run report. Everything lives in memory;
//! a lab run is short and prints its report at exit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Accumulated usage from one agent interaction (may span multiple API calls
/// when the tool loop runs more than one round).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccumulatedUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub api_calls: u32,
    pub tool_calls: Vec<String>,
}

impl AccumulatedUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add usage from a single API response
    pub fn add(&mut self, input_tokens: u32, output_tokens: u32) {
        self.input_tokens += input_tokens as u64;
        self.output_tokens += output_tokens as u64;
        self.api_calls += 1;
    }

    /// Record a tool call
    pub fn record_tool_call(&mut self, tool_name: &str) {
        self.tool_calls.push(tool_name.to_string());
    }

    /// Fold another accumulator into this one
    pub fn merge(&mut self, other: &AccumulatedUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.api_calls += other.api_calls;
        self.tool_calls.extend(other.tool_calls.iter().cloned());
    }

    /// Total tokens
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Pricing for a specific model (USD per million tokens)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

impl ModelPricing {
    /// Estimate cost in USD for given token counts
    pub fn estimate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input_cost = (input_tokens as f64 / 1_000_000.0) * self.input_per_mtok;
        let output_cost = (output_tokens as f64 / 1_000_000.0) * self.output_per_mtok;
        input_cost + output_cost
    }
}

/// Model price lookup with config overrides on top of built-in defaults.
/// Unknown models (anything served locally by Ollama) cost nothing.
#[derive(Debug, Clone)]
pub struct PriceTable {
    prices: HashMap<String, ModelPricing>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let mut prices = HashMap::new();
        prices.insert(
            "gpt-4o-mini".to_string(),
            ModelPricing {
                input_per_mtok: 0.15,
                output_per_mtok: 0.60,
            },
        );
        prices.insert(
            "gpt-4o".to_string(),
            ModelPricing {
                input_per_mtok: 2.50,
                output_per_mtok: 10.00,
            },
        );
        Self { prices }
    }
}

impl PriceTable {
    /// Built-in defaults with config-supplied overrides applied on top
    pub fn with_overrides(overrides: &HashMap<String, ModelPricing>) -> Self {
        let mut table = Self::default();
        for (model, pricing) in overrides {
            table.prices.insert(model.clone(), pricing.clone());
        }
        table
    }

    /// Estimate cost for accumulated usage against the named model
    pub fn estimate(&self, model: &str, usage: &AccumulatedUsage) -> f64 {
        match self.prices.get(model) {
            Some(pricing) => pricing.estimate_cost(usage.input_tokens, usage.output_tokens),
            None => 0.0,
        }
    }
}

/// One recorded interaction
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub at: DateTime<Utc>,
    pub model: String,
    pub label: String,
    pub usage: AccumulatedUsage,
    pub cost_usd: f64,
}

/// Per-run usage recorder
pub struct UsageLog {
    session_id: String,
    table: PriceTable,
    records: Vec<UsageRecord>,
}

impl UsageLog {
    pub fn new(table: PriceTable) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            table,
            records: Vec::new(),
        }
    }

    /// Record one interaction's usage; returns its estimated cost.
    pub fn record(&mut self, model: &str, label: &str, usage: &AccumulatedUsage) -> f64 {
        let cost_usd = self.table.estimate(model, usage);
        debug!(
            "Recorded usage: {} in={} out={} cost=${:.4} label={}",
            model, usage.input_tokens, usage.output_tokens, cost_usd, label
        );
        self.records.push(UsageRecord {
            at: Utc::now(),
            model: model.to_string(),
            label: label.to_string(),
            usage: usage.clone(),
            cost_usd,
        });
        cost_usd
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn total_cost(&self) -> f64 {
        self.records.iter().map(|r| r.cost_usd).sum()
    }

    pub fn total_tokens(&self) -> u64 {
        self.records.iter().map(|r| r.usage.total_tokens()).sum()
    }

    /// Render a human-readable report for the run
    pub fn report(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("Usage report (session {})\n\n", self.session_id));
        out.push_str("| Label | Model | Tokens (in/out) | Tool calls | Cost |\n");
        out.push_str("|-------|-------|-----------------|------------|------|\n");
        for record in &self.records {
            out.push_str(&format!(
                "| {} | {} | {}/{} | {} | ${:.4} |\n",
                record.label,
                record.model,
                record.usage.input_tokens,
                record.usage.output_tokens,
                record.usage.tool_calls.len(),
                record.cost_usd
            ));
        }
        out.push_str(&format!(
            "\nTotal: {} tokens across {} interaction(s), ${:.4}\n",
            self.total_tokens(),
            self.records.len(),
            self.total_cost()
        ));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulated_usage() {
        let mut usage = AccumulatedUsage::new();
        usage.add(100, 50);
        usage.add(200, 100);
        usage.record_tool_call("current_time");

        assert_eq!(usage.input_tokens, 300);
        assert_eq!(usage.output_tokens, 150);
        assert_eq!(usage.api_calls, 2);
        assert_eq!(usage.tool_calls.len(), 1);
        assert_eq!(usage.total_tokens(), 450);
    }

    #[test]
    fn test_merge() {
        let mut a = AccumulatedUsage::new();
        a.add(10, 5);
        let mut b = AccumulatedUsage::new();
        b.add(20, 10);
        b.record_tool_call("calculator");

        a.merge(&b);
        assert_eq!(a.input_tokens, 30);
        assert_eq!(a.output_tokens, 15);
        assert_eq!(a.api_calls, 2);
        assert_eq!(a.tool_calls, vec!["calculator"]);
    }

    #[test]
    fn test_model_pricing() {
        let pricing = ModelPricing {
            input_per_mtok: 0.15,
            output_per_mtok: 0.60,
        };
        // 1M input + 1M output
        let cost = pricing.estimate_cost(1_000_000, 1_000_000);
        assert!((cost - 0.75).abs() < 0.0001);
    }

    #[test]
    fn test_price_table_defaults_and_unknown() {
        let table = PriceTable::default();
        let mut usage = AccumulatedUsage::new();
        usage.add(1_000_000, 0);

        let known = table.estimate("gpt-4o-mini", &usage);
        assert!((known - 0.15).abs() < 0.0001);

        let unknown = table.estimate("llama3.2", &usage);
        assert_eq!(unknown, 0.0);
    }

    #[test]
    fn test_price_table_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "gpt-4o-mini".to_string(),
            ModelPricing {
                input_per_mtok: 1.0,
                output_per_mtok: 2.0,
            },
        );
        let table = PriceTable::with_overrides(&overrides);

        let mut usage = AccumulatedUsage::new();
        usage.add(1_000_000, 0);
        assert!((table.estimate("gpt-4o-mini", &usage) - 1.0).abs() < 0.0001);
        // non-overridden defaults survive
        usage.input_tokens = 0;
        usage.output_tokens = 1_000_000;
        assert!((table.estimate("gpt-4o", &usage) - 10.0).abs() < 0.0001);
    }

    #[test]
    fn test_usage_log_report() {
        let mut log = UsageLog::new(PriceTable::default());
        let mut usage = AccumulatedUsage::new();
        usage.add(1000, 500);
        usage.record_tool_call("calculator");

        let cost = log.record("gpt-4o-mini", "first question", &usage);
        assert!(cost > 0.0);
        assert_eq!(log.records().len(), 1);
        assert_eq!(log.total_tokens(), 1500);

        let report = log.report();
        assert!(report.contains("first question"));
        assert!(report.contains("gpt-4o-mini"));
        assert!(report.contains("1000/500"));
        assert!(report.contains("1 interaction(s)"));
    }
}
