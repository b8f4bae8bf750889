//! Multi-agent composition — pipelines and routed delegation

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::providers::types::ChatClient;
use crate::structured;
use crate::thread::ConversationThread;
use crate::usage::AccumulatedUsage;

/// Runs agents in order; each stage receives the previous stage's output as
/// its input, on a fresh thread.
pub struct Pipeline {
    agents: Vec<Agent>,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReply {
    pub text: String,
    pub usage: AccumulatedUsage,
}

impl Pipeline {
    pub fn new(agents: Vec<Agent>) -> Result<Self> {
        if agents.is_empty() {
            return Err(anyhow!("Pipeline requires at least one agent"));
        }
        Ok(Self { agents })
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub async fn run(&self, input: &str) -> Result<PipelineReply> {
        let mut usage = AccumulatedUsage::new();
        let mut current = input.to_string();

        for agent in &self.agents {
            let mut thread = ConversationThread::new();
            let reply = agent
                .send(&mut thread, &current)
                .await
                .with_context(|| format!("pipeline stage '{}' failed", agent.name()))?;
            debug!(
                "pipeline stage '{}' produced {} chars",
                agent.name(),
                reply.text.len()
            );
            usage.merge(&reply.usage);
            current = reply.text;
        }

        Ok(PipelineReply {
            text: current,
            usage,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RoutingChoice {
    specialist: String,
}

/// A coordinator model picks one specialist from the roster by name, then the
/// request is delegated to that specialist. An unrecognized pick (or a failed
/// routing call) falls back to the first specialist.
pub struct Router {
    coordinator: Arc<dyn ChatClient>,
    specialists: Vec<Agent>,
}

/// Outcome of a routed run
#[derive(Debug, Clone)]
pub struct RoutedReply {
    pub specialist: String,
    pub text: String,
    pub usage: AccumulatedUsage,
}

impl Router {
    pub fn new(coordinator: Arc<dyn ChatClient>, specialists: Vec<Agent>) -> Result<Self> {
        if specialists.is_empty() {
            return Err(anyhow!("Router requires at least one specialist"));
        }
        Ok(Self {
            coordinator,
            specialists,
        })
    }

    pub async fn run(&self, input: &str) -> Result<RoutedReply> {
        let roster = self
            .specialists
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ");
        let instructions = format!(
            "You dispatch requests to exactly one specialist agent. \
             Available specialists: {}. \
             Pick the best fit for the user's request and respond with JSON of the form \
             {{\"specialist\": \"<name>\"}}.",
            roster
        );

        let mut usage = AccumulatedUsage::new();
        let specialist = match structured::extract::<RoutingChoice>(
            self.coordinator.as_ref(),
            &instructions,
            input,
        )
        .await
        {
            Ok((choice, routing_usage)) => {
                usage.merge(&routing_usage);
                match self
                    .specialists
                    .iter()
                    .find(|a| a.name().eq_ignore_ascii_case(&choice.specialist))
                {
                    Some(agent) => agent,
                    None => {
                        warn!(
                            "coordinator picked unknown specialist '{}', falling back to '{}'",
                            choice.specialist,
                            self.specialists[0].name()
                        );
                        &self.specialists[0]
                    }
                }
            }
            Err(e) => {
                warn!(
                    "routing call failed ({}), falling back to '{}'",
                    e,
                    self.specialists[0].name()
                );
                &self.specialists[0]
            }
        };

        info!("routing request to specialist '{}'", specialist.name());

        let mut thread = ConversationThread::new();
        let reply = specialist
            .send(&mut thread, input)
            .await
            .with_context(|| format!("specialist '{}' failed", specialist.name()))?;
        usage.merge(&reply.usage);

        Ok(RoutedReply {
            specialist: specialist.name().to_string(),
            text: reply.text,
            usage,
        })
    }
}
