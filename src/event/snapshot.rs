//! Snapshot payloads: metrics gauges, stock levels and demand forecasts.

use serde::{Deserialize, Serialize};

/// Current weather at the main distribution site.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature: u32,
    pub condition: String,
    pub humidity: u32,
    pub wind: u32,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            temperature: 25,
            condition: "Sunny".to_string(),
            humidity: 60,
            wind: 15,
        }
    }
}

/// Read-only copy of the metrics gauges taken at publish time.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub warehouse_occupancy: f64,
    pub warehouse_items: i64,
    pub waste_saved: i64,
    pub carbon_reduced: i64,
    pub open_stores: i64,
    pub on_time_delivery: f64,
    pub inventory_turnover: f64,
    pub order_fulfillment_time: f64,
    pub supplier_on_time_delivery: f64,
    pub supplier_defect_rate: f64,
    pub transportation_cost_per_mile: f64,
    pub warehouse_pick_rate: i64,
    pub return_rate: f64,
    pub weather: Weather,
    pub web_traffic: u64,
    pub sales: u64,
}

/// Stock per warehouse plus the derived total.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub warehouse_1: u64,
    pub warehouse_2: u64,
    pub warehouse_3: u64,
    pub total_stock: u64,
}

/// Predicted demand for the next window.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandForecast {
    pub predicted_demand: u32,
    pub confidence: f64,
}

/// Raised when forecast demand outruns the restock threshold.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestockAlert {
    pub message: String,
    pub predicted_demand: u32,
}
