use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a class of events.
///
/// Matching is exact; there are no wildcards or hierarchies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(Cow<'static, str>);

impl Topic {
    /// Topic from a static name.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Topic from any name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The topic name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Topic {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// Topics published by the built-in services.
pub mod topics {
    use super::Topic;

    /// Raw ingested records.
    pub const RAW_DATA: Topic = Topic::from_static("raw_data");
    /// Records after the processing stage.
    pub const PROCESSED_DATA: Topic = Topic::from_static("processed_data");
    /// Legacy raw telemetry feed (temperature display).
    pub const UPDATE: Topic = Topic::from_static("update");
    /// Metrics gauge snapshots.
    pub const METRICS_UPDATE: Topic = Topic::from_static("metrics_update");
    /// Detected anomalies.
    pub const ANOMALY: Topic = Topic::from_static("anomaly");
    /// What-if scenario results.
    pub const SIMULATION_RESULT: Topic = Topic::from_static("simulation_result");
    /// Proposed remedial actions.
    pub const DECISION_SUGGESTION: Topic = Topic::from_static("decision_suggestion");
    /// Approved decisions, published on execution.
    pub const DECISION_MADE: Topic = Topic::from_static("decision_made");
    /// Delayed impact estimates for executed decisions.
    pub const DECISION_IMPACT_REPORTED: Topic = Topic::from_static("decision_impact_reported");
    /// Periodic generated insights.
    pub const AI_INSIGHTS: Topic = Topic::from_static("ai_insights");
    /// Generated remedies for anomalies.
    pub const AI_SOLUTION: Topic = Topic::from_static("ai_solution");
    /// Demand forecasts.
    pub const DEMAND_FORECAST: Topic = Topic::from_static("demand_forecast");
    /// High-demand restock alerts.
    pub const RESTOCK_ALERT: Topic = Topic::from_static("restock_alert");
    /// Stock level snapshots.
    pub const STOCK_LEVELS_UPDATE: Topic = Topic::from_static("stock_levels_update");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_and_owned_topics_compare_equal() {
        assert_eq!(topics::ANOMALY, Topic::new("anomaly"));
        assert_ne!(topics::ANOMALY, Topic::new("anomaly_"));
    }

    #[test]
    fn topic_serializes_as_plain_string() {
        let v = serde_json::to_value(topics::METRICS_UPDATE).unwrap();
        assert_eq!(v, serde_json::json!("metrics_update"));
    }
}
