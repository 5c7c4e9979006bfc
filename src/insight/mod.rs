//! Generated insights and remedies.
//!
//! `InsightGenerator` turns prompts into `ai_insights` and `ai_solution`
//! events through a pluggable `TextGenerator`. Any generation failure, slow
//! backend included, publishes a fixed fallback text on the same topic.

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::GeminiClient;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::broker::{topics, Broker};
use crate::error::{ExecutionError, PulseResult};
use crate::event::{Insight, Solution, TriggeringEvent};
use crate::schedule::{self, TimerSet};

/// Prompt for the periodic insight.
pub const INSIGHT_PROMPT: &str = "Generate a concise, actionable supply chain insight or a potential anomaly alert. \
                                  Focus on metrics like inventory, delivery, or sustainability. Keep it under 40 words.";

/// Published when an insight cannot be generated.
pub const INSIGHT_FALLBACK: &str = "Error generating insights. Check API key or model access.";

/// Published when a remedy cannot be generated.
pub const SOLUTION_FALLBACK: &str = "Could not generate solution.";

/// Opaque text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Completes `prompt`.
    async fn generate(&self, prompt: &str) -> PulseResult<String>;

    /// Backend name, for logs.
    fn name(&self) -> &str;
}

/// Backend used when no text generation is configured. Always fails, so every
/// request takes the fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTextGenerator;

#[async_trait]
impl TextGenerator for NoTextGenerator {
    async fn generate(&self, _prompt: &str) -> PulseResult<String> {
        Err(ExecutionError::Unconfigured {
            reason: "no text generation backend".to_string(),
        }
        .into())
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Builds the remedy prompt for `trigger`.
#[must_use]
pub fn solution_prompt(trigger: &TriggeringEvent) -> String {
    let changes = serde_json::to_string(trigger.metrics().changes()).unwrap_or_else(|_| "[]".to_string());
    format!(
        "An anomaly has been detected in the supply chain: {}. Its type is {}. The affected metrics are: {}. \
         What is a plausible solution or recommended action? Keep it concise, under 70 words.",
        trigger.message(),
        trigger.type_name(),
        changes
    )
}

/// Publishes generated insights and remedies.
pub struct InsightGenerator {
    broker: Arc<Broker>,
    backend: Arc<dyn TextGenerator>,
    timeout: Duration,
    in_flight: TimerSet,
}

impl InsightGenerator {
    /// Creates a generator bounding each backend call by `timeout`.
    #[must_use]
    pub fn new(broker: Arc<Broker>, backend: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self {
            broker,
            backend,
            timeout,
            in_flight: TimerSet::new(),
        }
    }

    async fn complete(&self, prompt: &str) -> PulseResult<String> {
        match tokio::time::timeout(self.timeout, self.backend.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ExecutionError::Timeout {
                duration_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
            .into()),
        }
    }

    /// Generates one insight and publishes it on `ai_insights`.
    pub async fn generate_insights(&self) -> Insight {
        let insight = match self.complete(INSIGHT_PROMPT).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(backend = self.backend.name(), error = %err, "insight generation failed");
                INSIGHT_FALLBACK.to_string()
            }
        };
        let insight = Insight { insight };
        self.broker.publish(&topics::AI_INSIGHTS, insight.clone());
        insight
    }

    /// Generates a remedy for `trigger` and publishes it on `ai_solution`.
    pub async fn generate_solution(&self, trigger: TriggeringEvent) -> Solution {
        let solution = match self.complete(&solution_prompt(&trigger)).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    trigger = trigger.kind_name(),
                    error = %err,
                    "solution generation failed"
                );
                SOLUTION_FALLBACK.to_string()
            }
        };
        let solution = Solution {
            solution,
            anomaly: trigger,
        };
        self.broker.publish(&topics::AI_SOLUTION, solution.clone());
        solution
    }

    /// Runs [`generate_solution`](Self::generate_solution) in the background.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::NoRuntime` outside a Tokio runtime.
    pub fn spawn_solution(self: &Arc<Self>, trigger: TriggeringEvent) -> PulseResult<()> {
        let this = Arc::clone(self);
        let task = schedule::detach("ai-solution", async move {
            this.generate_solution(trigger).await;
        })?;
        self.in_flight.push(task);
        Ok(())
    }

    /// Background generations not yet finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.in_flight.pending()
    }

    /// Abandons every background generation.
    pub fn shutdown(&self) {
        self.in_flight.cancel_all();
    }
}

impl std::fmt::Debug for InsightGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightGenerator")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
