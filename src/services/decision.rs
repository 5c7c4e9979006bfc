//! Decision engine.
//!
//! Maps anomalies and simulation results to canned remedial suggestions and
//! executes decisions approved by an operator. Execution is acknowledged on
//! `decision_made` immediately; the impact estimate follows on
//! `decision_impact_reported` after a fixed delay.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use crate::broker::{topics, Broker, Subscriber, Topic};
use crate::error::PulseResult;
use crate::event::{
    ApprovedDecision, DecisionImpact, DecisionKind, DecisionSuggestion, Event, ImpactReport, SuggestionIds,
    TriggeringEvent,
};
use crate::insight::InsightGenerator;
use crate::schedule::{self, TimerSet};

use super::{lock, unexpected_payload};

/// Units moved by restock and transfer suggestions.
const SUGGESTED_QUANTITY: u32 = 500;

fn spaced(kind: &str) -> String {
    kind.replace('_', " ")
}

/// Builds the suggestion for `trigger` from the fixed decision table.
fn suggestion_for(id_source: &SuggestionIds, trigger: TriggeringEvent) -> DecisionSuggestion {
    let kind_name = trigger.kind_name().to_string();
    let (kind, message, details) = match kind_name.as_str() {
        "demand_surge" | "seasonal_spike" => (
            DecisionKind::HighPriorityRestock,
            format!("Suggested: High priority restock due to {}.", spaced(&kind_name)),
            Some(json!({ "quantity": SUGGESTED_QUANTITY, "priority": "high", "reason": kind_name.clone() })),
        ),
        "delivery_delay" => (
            DecisionKind::RerouteShipment,
            "Suggested: Reroute delayed shipments.".to_string(),
            Some(json!({ "impact": "medium" })),
        ),
        "warehouse_full" => (
            DecisionKind::TransferInventory,
            "Suggested: Initiate inventory transfer to less occupied warehouse.".to_string(),
            Some(json!({ "quantity": SUGGESTED_QUANTITY, "destination": "Warehouse B" })),
        ),
        other => (
            DecisionKind::AiSuggestedAction,
            format!("Suggested action for {}.", spaced(other)),
            None,
        ),
    };

    DecisionSuggestion {
        id: id_source.next(),
        kind,
        message,
        timestamp: Utc::now(),
        details,
        anomaly: trigger,
    }
}

/// Suggests and executes remedial decisions.
pub struct DecisionEngine {
    broker: Arc<Broker>,
    ids: SuggestionIds,
    insights: Option<Arc<InsightGenerator>>,
    impact_delay: Duration,
    reports: TimerSet,
    rng: Mutex<StdRng>,
}

impl DecisionEngine {
    /// Creates the engine and subscribes it to anomalies and simulation
    /// results. When `insights` is set, every suggestion also requests a
    /// generated remedy.
    pub fn attach(broker: Arc<Broker>, insights: Option<Arc<InsightGenerator>>, impact_delay: Duration) -> Arc<Self> {
        let engine = Arc::new(Self {
            broker: Arc::clone(&broker),
            ids: SuggestionIds::new(),
            insights,
            impact_delay,
            reports: TimerSet::new(),
            rng: Mutex::new(StdRng::from_entropy()),
        });
        broker.subscribe(topics::ANOMALY, Arc::clone(&engine) as Arc<dyn Subscriber>);
        broker.subscribe(topics::SIMULATION_RESULT, Arc::clone(&engine) as Arc<dyn Subscriber>);
        engine
    }

    /// Publishes a suggestion for `trigger` and requests a remedy for it.
    pub fn suggest(&self, trigger: TriggeringEvent) -> DecisionSuggestion {
        let suggestion = suggestion_for(&self.ids, trigger);
        tracing::info!(
            id = %suggestion.id,
            kind = suggestion.kind.as_str(),
            trigger = suggestion.anomaly.kind_name(),
            "decision suggested"
        );
        self.broker.publish(&topics::DECISION_SUGGESTION, suggestion.clone());

        if let Some(insights) = &self.insights {
            if let Err(err) = insights.spawn_solution(suggestion.anomaly.clone()) {
                tracing::warn!(error = %err, "remedy generation not started");
            }
        }
        suggestion
    }

    /// Executes an approved decision.
    ///
    /// Publishes `decision_made` before returning and arms the delayed impact
    /// report. The decision is taken as given; it need not match an earlier
    /// suggestion.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::NoRuntime` when the impact report cannot be
    /// scheduled. `decision_made` has been published in that case.
    pub fn execute_approved_decision(&self, decision: ApprovedDecision) -> PulseResult<()> {
        tracing::info!(decision = %decision.raw(), "executing approved decision");
        self.broker.publish(&topics::DECISION_MADE, decision.clone());

        let impact = {
            let mut rng = lock(&self.rng);
            DecisionImpact {
                sales_increase: rng.gen_range(100..600),
                inventory_saved: rng.gen_range(50..250),
            }
        };
        let report = ImpactReport {
            decision_id: decision.id,
            impact,
            message: format!(
                "Decision '{}' impact reported.",
                decision.kind.as_deref().unwrap_or("unknown")
            ),
        };
        let broker = Arc::clone(&self.broker);
        let timer = schedule::after("impact-report", self.impact_delay, move || {
            broker.publish(&topics::DECISION_IMPACT_REPORTED, report);
        })?;
        self.reports.push(timer);
        Ok(())
    }

    /// Impact reports armed but not yet published.
    #[must_use]
    pub fn pending_reports(&self) -> usize {
        self.reports.pending()
    }

    /// Cancels every pending impact report.
    pub fn shutdown(&self) {
        self.reports.cancel_all();
    }
}

impl Subscriber for DecisionEngine {
    fn notify(&self, topic: &Topic, event: &Event) -> PulseResult<()> {
        let trigger = match event {
            Event::Anomaly(anomaly) => TriggeringEvent::Anomaly(anomaly.clone()),
            Event::Simulation(result) => TriggeringEvent::Simulation(result.clone()),
            other => return Err(unexpected_payload(topic, other, "anomaly or simulation result")),
        };
        self.suggest(trigger);
        Ok(())
    }

    fn name(&self) -> &str {
        "decision-engine"
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("impact_delay", &self.impact_delay)
            .field("pending_reports", &self.pending_reports())
            .finish_non_exhaustive()
    }
}
