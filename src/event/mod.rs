//! Event payloads carried by the broker.
//!
//! Each topic has its own payload shape. `Event` is the closed set of those
//! shapes; it serializes untagged so the push channel sees exactly the
//! per-topic JSON the dashboard renders.

/// Anomaly records and metric impact lists.
pub mod anomaly;
/// Decision suggestions, approvals and impact reports.
pub mod decision;
/// Raw telemetry records.
pub mod records;
/// What-if scenarios and simulation results.
pub mod scenario;
/// Gauge, stock and forecast snapshots.
pub mod snapshot;

pub use anomaly::{AffectedMetrics, Anomaly, AnomalyKind, ChangeType, Magnitude, MetricChange, MetricId, Severity};
pub use decision::{
    ApprovedDecision, DecisionImpact, DecisionKind, DecisionSuggestion, ImpactReport, SuggestionId, SuggestionIds,
    TriggeringEvent,
};
pub use records::RawRecord;
pub use scenario::{Scenario, SimulationRecordType, SimulationResult};
pub use snapshot::{DemandForecast, MetricsSnapshot, RestockAlert, StockLevels, Weather};

use serde::Serialize;

/// Generated supply-chain insight text.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub insight: String,
}

/// Generated remedy for an anomaly or simulated scenario.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub solution: String,
    pub anomaly: TriggeringEvent,
}

/// Any payload that can be published on a topic.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    Raw(RawRecord),
    Metrics(MetricsSnapshot),
    Anomaly(Anomaly),
    Simulation(SimulationResult),
    Suggestion(DecisionSuggestion),
    DecisionMade(ApprovedDecision),
    ImpactReport(ImpactReport),
    Forecast(DemandForecast),
    RestockAlert(RestockAlert),
    StockLevels(StockLevels),
    Insight(Insight),
    Solution(Solution),
}

impl Event {
    /// Short label of the payload shape, for logs.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw",
            Self::Metrics(_) => "metrics",
            Self::Anomaly(_) => "anomaly",
            Self::Simulation(_) => "simulation",
            Self::Suggestion(_) => "suggestion",
            Self::DecisionMade(_) => "decision_made",
            Self::ImpactReport(_) => "impact_report",
            Self::Forecast(_) => "forecast",
            Self::RestockAlert(_) => "restock_alert",
            Self::StockLevels(_) => "stock_levels",
            Self::Insight(_) => "insight",
            Self::Solution(_) => "solution",
        }
    }
}

macro_rules! impl_from_payload {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Event {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_payload! {
    RawRecord => Raw,
    MetricsSnapshot => Metrics,
    Anomaly => Anomaly,
    SimulationResult => Simulation,
    DecisionSuggestion => Suggestion,
    ApprovedDecision => DecisionMade,
    ImpactReport => ImpactReport,
    DemandForecast => Forecast,
    RestockAlert => RestockAlert,
    StockLevels => StockLevels,
    Insight => Insight,
    Solution => Solution,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_without_wrapper() {
        let ev: Event = StockLevels {
            warehouse_1: 1,
            warehouse_2: 2,
            warehouse_3: 3,
            total_stock: 6,
        }
        .into();
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["total_stock"], 6);
        assert_eq!(ev.shape(), "stock_levels");
    }
}
