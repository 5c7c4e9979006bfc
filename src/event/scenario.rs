//! What-if scenarios and the simulation result record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::anomaly::AffectedMetrics;

/// Scripted scenarios known to the simulation runner.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    DemandSurge,
    DeliveryDelay,
    WarehouseFire,
    SupplierStrike,
    WebTrafficSpike,
    InventoryFill,
    InventoryStockout,
    SeasonalSpike,
}

impl Scenario {
    /// Every scripted scenario.
    pub const ALL: [Self; 8] = [
        Self::DemandSurge,
        Self::DeliveryDelay,
        Self::WarehouseFire,
        Self::SupplierStrike,
        Self::WebTrafficSpike,
        Self::InventoryFill,
        Self::InventoryStockout,
        Self::SeasonalSpike,
    ];

    /// Looks a scenario up by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Wire name, e.g. `warehouse_fire`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DemandSurge => "demand_surge",
            Self::DeliveryDelay => "delivery_delay",
            Self::WarehouseFire => "warehouse_fire",
            Self::SupplierStrike => "supplier_strike",
            Self::WebTrafficSpike => "web_traffic_spike",
            Self::InventoryFill => "inventory_fill",
            Self::InventoryStockout => "inventory_stockout",
            Self::SeasonalSpike => "seasonal_spike",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record type marker, rendered as `"type": "simulation_result"`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationRecordType {
    #[default]
    SimulationResult,
}

/// Output of a what-if run. Shaped like an anomaly for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// Always `simulation_result`.
    #[serde(rename = "type")]
    pub record_type: SimulationRecordType,
    /// Narrative of the scenario.
    pub message: String,
    /// Run time.
    pub timestamp: DateTime<Utc>,
    /// Requested scenario name, echoed as given.
    pub scenario: String,
    /// Scenario-specific impact estimate (empty object when none).
    pub impact: serde_json::Value,
    /// Affected metrics and their changes.
    #[serde(flatten)]
    pub metrics: AffectedMetrics,
}

impl SimulationResult {
    /// The scripted scenario this result came from, if it was recognized.
    #[must_use]
    pub fn known_scenario(&self) -> Option<Scenario> {
        Scenario::from_name(&self.scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_names_round_trip_through_lookup() {
        for s in Scenario::ALL {
            assert_eq!(Scenario::from_name(s.as_str()), Some(s));
        }
        assert_eq!(Scenario::from_name("meteor_strike"), None);
    }

    #[test]
    fn result_serializes_type_marker() {
        let result = SimulationResult {
            record_type: SimulationRecordType::SimulationResult,
            message: "m".to_string(),
            timestamp: Utc::now(),
            scenario: "inventory_fill".to_string(),
            impact: serde_json::json!({}),
            metrics: AffectedMetrics::none(),
        };
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["type"], "simulation_result");
        assert_eq!(v["affectedMetrics"], serde_json::json!([]));
        assert_eq!(v["metricChanges"], serde_json::json!([]));
        assert_eq!(result.known_scenario(), Some(Scenario::InventoryFill));
    }
}
