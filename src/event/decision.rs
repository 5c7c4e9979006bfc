//! Decision suggestions, approvals and impact reports.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::anomaly::{AffectedMetrics, Anomaly};
use super::scenario::SimulationResult;

/// Identifier of a decision suggestion (wall-clock milliseconds, bumped to
/// stay strictly increasing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(u64);

impl SuggestionId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates strictly increasing, time-derived suggestion ids.
#[derive(Debug, Default)]
pub struct SuggestionIds {
    last: AtomicU64,
}

impl SuggestionIds {
    /// A generator that has issued nothing yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Next id: current epoch millis, or `last + 1` when the clock has not moved.
    pub fn next(&self) -> SuggestionId {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return SuggestionId(candidate),
                Err(seen) => last = seen,
            }
        }
    }
}

/// Remedial action kinds.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    HighPriorityRestock,
    RerouteShipment,
    TransferInventory,
    AiSuggestedAction,
}

impl DecisionKind {
    /// Wire name, e.g. `reroute_shipment`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighPriorityRestock => "high_priority_restock",
            Self::RerouteShipment => "reroute_shipment",
            Self::TransferInventory => "transfer_inventory",
            Self::AiSuggestedAction => "ai_suggested_action",
        }
    }
}

/// The event a suggestion responds to.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TriggeringEvent {
    Anomaly(Anomaly),
    Simulation(SimulationResult),
}

impl TriggeringEvent {
    /// Anomaly kind, or the scenario name for simulation results.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Anomaly(a) => a.kind.as_str(),
            Self::Simulation(s) => &s.scenario,
        }
    }

    /// Record type as rendered on the wire.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Anomaly(a) => a.kind.as_str(),
            Self::Simulation(_) => "simulation_result",
        }
    }

    /// Human-readable description of the trigger.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Anomaly(a) => &a.message,
            Self::Simulation(s) => &s.message,
        }
    }

    /// Metrics the trigger affects.
    #[must_use]
    pub const fn metrics(&self) -> &AffectedMetrics {
        match self {
            Self::Anomaly(a) => &a.metrics,
            Self::Simulation(s) => &s.metrics,
        }
    }
}

/// A proposed remedial action awaiting approval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionSuggestion {
    /// Generated id.
    pub id: SuggestionId,
    /// Suggested action.
    #[serde(rename = "type")]
    pub kind: DecisionKind,
    /// Human-readable suggestion.
    pub message: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Structured parameters of the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Back-reference to the triggering event.
    pub anomaly: TriggeringEvent,
}

/// A decision as echoed back by the approval endpoint.
///
/// Suggestions are not retained, so approval accepts whatever value the
/// client sends. `id` and `type` are read when they have the expected JSON
/// type; the value itself is republished untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ApprovedDecision {
    /// Suggestion id, when the client sent a numeric one.
    #[serde(skip)]
    pub id: Option<SuggestionId>,
    /// Action kind, when the client sent a string `type`.
    #[serde(skip)]
    pub kind: Option<String>,
    raw: serde_json::Value,
}

impl ApprovedDecision {
    /// Wraps the decision value as received.
    #[must_use]
    pub fn new(raw: serde_json::Value) -> Self {
        let id = raw.get("id").and_then(serde_json::Value::as_u64).map(SuggestionId);
        let kind = raw.get("type").and_then(serde_json::Value::as_str).map(str::to_string);
        Self { id, kind, raw }
    }

    /// The decision value as received.
    #[must_use]
    pub const fn raw(&self) -> &serde_json::Value {
        &self.raw
    }
}

impl Default for ApprovedDecision {
    fn default() -> Self {
        Self::new(serde_json::Value::Object(serde_json::Map::new()))
    }
}

/// Estimated effect of an executed decision.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionImpact {
    pub sales_increase: u32,
    pub inventory_saved: u32,
}

/// Delayed report following an executed decision.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactReport {
    pub decision_id: Option<SuggestionId>,
    pub impact: DecisionImpact,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_ids_strictly_increase() {
        let ids = SuggestionIds::new();
        let mut prev = ids.next();
        for _ in 0..1000 {
            let next = ids.next();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn suggestion_ids_track_wall_clock() {
        let before = u64::try_from(Utc::now().timestamp_millis()).unwrap();
        let id = SuggestionIds::new().next();
        assert!(id.as_u64() >= before);
    }

    #[test]
    fn approved_decision_is_republished_untouched() {
        let raw = serde_json::json!({
            "id": 42,
            "type": "reroute_shipment",
            "message": "Suggested: Reroute delayed shipments."
        });
        let d = ApprovedDecision::new(raw.clone());
        assert_eq!(d.id, Some(SuggestionId::from_raw(42)));
        assert_eq!(d.kind.as_deref(), Some("reroute_shipment"));
        assert_eq!(serde_json::to_value(&d).unwrap(), raw);
    }

    #[test]
    fn approved_decision_tolerates_unexpected_shapes() {
        let d = ApprovedDecision::new(serde_json::json!({ "id": "1700000000000", "type": 5 }));
        assert_eq!(d.id, None);
        assert_eq!(d.kind, None);

        let d = ApprovedDecision::new(serde_json::json!({ "id": 1.5e12 }));
        assert_eq!(d.id, None);

        let d = ApprovedDecision::new(serde_json::json!("approve-it"));
        assert_eq!(d.id, None);
        assert_eq!(serde_json::to_value(&d).unwrap(), "approve-it");
    }

    #[test]
    fn default_decision_is_an_empty_object() {
        assert_eq!(serde_json::to_value(ApprovedDecision::default()).unwrap(), serde_json::json!({}));
    }
}
