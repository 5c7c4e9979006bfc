//! Scripted what-if scenarios.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::broker::{topics, Broker};
use crate::event::{
    AffectedMetrics, ChangeType, Magnitude, MetricChange, MetricId, Scenario, SimulationRecordType, SimulationResult,
};

use super::metrics::WebTraffic;

use ChangeType::{Decrease, Increase};
use Magnitude::{Moderate, Significant, Slight};
use MetricId::{
    AvgTransaction, CurrentWebTraffic, InventoryTurnover, OnTimeDelivery, OrderFulfillmentTime, SupplierDefectRate,
    SupplierOnTime, TotalSales, WarehouseItems, WarehouseOccupancy, WarehousePickRate,
};

/// Web-traffic multiplier applied by `web_traffic_spike`.
const TRAFFIC_SPIKE_FACTOR: f64 = 1.5;

struct Script {
    suffix: &'static str,
    impact: serde_json::Value,
    changes: Vec<MetricChange>,
}

const fn change(id: MetricId, change_type: ChangeType, magnitude: Magnitude) -> MetricChange {
    MetricChange::new(id, change_type, magnitude)
}

fn script(scenario: Scenario) -> Script {
    match scenario {
        Scenario::DemandSurge => Script {
            suffix: " Expect increased sales and potential stockouts.",
            impact: json!({ "salesIncrease": 0.3, "stockoutRisk": true }),
            changes: vec![
                change(TotalSales, Increase, Significant),
                change(AvgTransaction, Increase, Moderate),
                change(InventoryTurnover, Increase, Slight),
            ],
        },
        Scenario::DeliveryDelay => Script {
            suffix: " Expect delays in incoming inventory and potential customer dissatisfaction.",
            impact: json!({ "inventoryDelay": "24h", "customerImpact": "medium" }),
            changes: vec![
                change(OnTimeDelivery, Decrease, Significant),
                change(OrderFulfillmentTime, Increase, Significant),
            ],
        },
        Scenario::WarehouseFire => Script {
            suffix: " Simulating a warehouse fire. Expect significant inventory loss and operational disruption.",
            impact: json!({ "inventoryLoss": "80%", "operationalDown": "48h" }),
            changes: vec![
                change(WarehouseOccupancy, Decrease, Significant),
                change(WarehouseItems, Decrease, Significant),
                change(WarehousePickRate, Decrease, Significant),
            ],
        },
        Scenario::SupplierStrike => Script {
            suffix: " Simulating a supplier strike. Expect raw material shortages and production halts.",
            impact: json!({ "materialShortage": true, "productionImpact": "high" }),
            changes: vec![
                change(SupplierOnTime, Decrease, Significant),
                change(SupplierDefectRate, Increase, Significant),
            ],
        },
        Scenario::WebTrafficSpike => Script {
            suffix: " Simulating a web traffic spike. Expect increased website visitors and potential impact on sales.",
            impact: json!({}),
            changes: vec![
                change(CurrentWebTraffic, Increase, Significant),
                change(TotalSales, Increase, Moderate),
            ],
        },
        Scenario::InventoryFill => Script {
            suffix: " Simulating inventory being filled. Expect increased warehouse occupancy and items.",
            impact: json!({}),
            changes: vec![
                change(WarehouseOccupancy, Increase, Moderate),
                change(WarehouseItems, Increase, Moderate),
            ],
        },
        Scenario::InventoryStockout => Script {
            suffix: " Simulating an inventory stockout. Expect decreased warehouse items and potential lost sales.",
            impact: json!({}),
            changes: vec![
                change(WarehouseOccupancy, Decrease, Moderate),
                change(WarehouseItems, Decrease, Moderate),
                change(TotalSales, Decrease, Moderate),
            ],
        },
        Scenario::SeasonalSpike => Script {
            suffix: " Simulating a seasonal spike. Expect significant increase in sales and web traffic.",
            impact: json!({}),
            changes: vec![
                change(TotalSales, Increase, Significant),
                change(CurrentWebTraffic, Increase, Significant),
            ],
        },
    }
}

/// Synthesizes scenario results on request.
#[derive(Debug)]
pub struct SimulationRunner {
    broker: Arc<Broker>,
    traffic: WebTraffic,
}

impl SimulationRunner {
    /// Creates a runner adjusting `traffic` on traffic scenarios.
    #[must_use]
    pub fn new(broker: Arc<Broker>, traffic: WebTraffic) -> Self {
        Self { broker, traffic }
    }

    /// Runs `scenario` and publishes the result on `simulation_result`.
    ///
    /// Unrecognized names still publish a result, with an empty impact and no
    /// affected metrics.
    pub fn run(&self, scenario: &str) -> SimulationResult {
        let mut message = format!("Simulating anomaly: {scenario}.");
        let (impact, metrics) = match Scenario::from_name(scenario) {
            Some(known) => {
                if known == Scenario::WebTrafficSpike {
                    let traffic = self.traffic.scale(TRAFFIC_SPIKE_FACTOR);
                    tracing::info!(traffic, "web traffic spiked");
                }
                let script = script(known);
                message.push_str(script.suffix);
                (script.impact, AffectedMetrics::from_changes(&script.changes))
            }
            None => {
                tracing::warn!(scenario, "unknown scenario requested");
                message.push_str(" Unknown scenario.");
                (json!({}), AffectedMetrics::none())
            }
        };

        let result = SimulationResult {
            record_type: SimulationRecordType::SimulationResult,
            message,
            timestamp: Utc::now(),
            scenario: scenario.to_string(),
            impact,
            metrics,
        };
        tracing::info!(scenario, "simulation run");
        self.broker.publish(&topics::SIMULATION_RESULT, result.clone());
        result
    }

    /// Current web-traffic counter.
    #[must_use]
    pub fn web_traffic(&self) -> u64 {
        self.traffic.get()
    }

    /// Overrides the web-traffic counter.
    pub fn set_web_traffic(&self, value: u64) {
        self.traffic.set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> SimulationRunner {
        SimulationRunner::new(Arc::new(Broker::detached()), WebTraffic::new(1000))
    }

    #[test]
    fn traffic_spike_compounds() {
        let sim = runner();
        sim.run("web_traffic_spike");
        assert_eq!(sim.web_traffic(), 1500);
        sim.run("web_traffic_spike");
        assert_eq!(sim.web_traffic(), 2250);
    }

    #[test]
    fn unknown_scenario_is_generic() {
        let result = runner().run("unknown_scenario_xyz");
        assert!(result.message.ends_with("Unknown scenario."));
        assert!(result.metrics.is_empty());
        assert_eq!(result.impact, json!({}));
        assert_eq!(result.known_scenario(), None);
    }

    #[test]
    fn every_script_lists_its_changed_metrics() {
        for scenario in Scenario::ALL {
            let result = runner().run(scenario.as_str());
            for c in result.metrics.changes() {
                assert!(result.metrics.affected().contains(&c.id), "{scenario}: {}", c.id);
            }
            assert!(!result.metrics.changes().is_empty());
            assert!(result.message.starts_with(&format!("Simulating anomaly: {scenario}.")));
        }
    }

    #[test]
    fn demand_surge_carries_impact() {
        let result = runner().run("demand_surge");
        assert_eq!(result.impact["stockoutRisk"], true);
        assert_eq!(result.metrics.affected(), &[TotalSales, AvgTransaction, InventoryTurnover]);
    }

    #[test]
    fn set_web_traffic_overrides() {
        let sim = runner();
        sim.set_web_traffic(42);
        assert_eq!(sim.web_traffic(), 42);
    }
}
