//! Anomaly records and the metric-impact list shared with simulation results.
//!
//! Downstream rendering highlights every metric named in `metricChanges` by
//! looking it up in `affectedMetrics`, so a change may only reference a metric
//! that is also listed as affected. `AffectedMetrics` enforces that at
//! construction time.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier of a dashboard metric tile.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricId {
    TotalSales,
    AvgTransaction,
    InventoryTurnover,
    OnTimeDelivery,
    OrderFulfillmentTime,
    WarehouseOccupancy,
    WarehouseItems,
    WarehousePickRate,
    SupplierOnTime,
    SupplierDefectRate,
    CurrentWebTraffic,
    ReturnRate,
}

impl MetricId {
    /// Wire name of the metric (as rendered by the dashboard).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TotalSales => "total-sales",
            Self::AvgTransaction => "avg-transaction",
            Self::InventoryTurnover => "inventory-turnover",
            Self::OnTimeDelivery => "on-time-delivery",
            Self::OrderFulfillmentTime => "order-fulfillment-time",
            Self::WarehouseOccupancy => "warehouse-occupancy",
            Self::WarehouseItems => "warehouse-items",
            Self::WarehousePickRate => "warehouse-pick-rate",
            Self::SupplierOnTime => "supplier-on-time",
            Self::SupplierDefectRate => "supplier-defect-rate",
            Self::CurrentWebTraffic => "current-web-traffic",
            Self::ReturnRate => "return-rate",
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a metric change.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Increase,
    Decrease,
}

/// Magnitude class of a metric change.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Magnitude {
    Slight,
    Moderate,
    Significant,
}

/// One (metric, direction, magnitude) entry.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricChange {
    pub id: MetricId,
    pub change_type: ChangeType,
    pub value_change: Magnitude,
}

impl MetricChange {
    /// One change entry.
    #[must_use]
    pub const fn new(id: MetricId, change_type: ChangeType, value_change: Magnitude) -> Self {
        Self {
            id,
            change_type,
            value_change,
        }
    }
}

/// Affected metric ids plus the changes applied to them.
///
/// Serialized flattened into the owning record as `affectedMetrics` and
/// `metricChanges`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedMetrics {
    affected_metrics: Vec<MetricId>,
    metric_changes: Vec<MetricChange>,
}

impl AffectedMetrics {
    /// Builds the list from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnlistedMetricChange` if a change references a
    /// metric missing from `affected`.
    pub fn new(affected: Vec<MetricId>, changes: Vec<MetricChange>) -> Result<Self, ValidationError> {
        if let Some(stray) = changes.iter().find(|c| !affected.contains(&c.id)) {
            return Err(ValidationError::UnlistedMetricChange {
                metric: stray.id.to_string(),
            });
        }
        Ok(Self {
            affected_metrics: affected,
            metric_changes: changes,
        })
    }

    /// Every changed metric is also the affected list, in change order.
    #[must_use]
    pub fn from_changes(changes: &[MetricChange]) -> Self {
        let mut affected = Vec::with_capacity(changes.len());
        for change in changes {
            if !affected.contains(&change.id) {
                affected.push(change.id);
            }
        }
        Self {
            affected_metrics: affected,
            metric_changes: changes.to_vec(),
        }
    }

    /// Marks an extra metric as affected without recording a change for it.
    #[must_use]
    pub fn also_affecting(mut self, id: MetricId) -> Self {
        if !self.affected_metrics.contains(&id) {
            self.affected_metrics.push(id);
        }
        self
    }

    /// No affected metrics at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            affected_metrics: Vec::new(),
            metric_changes: Vec::new(),
        }
    }

    /// Affected metric ids.
    #[must_use]
    pub fn affected(&self) -> &[MetricId] {
        &self.affected_metrics
    }

    /// Recorded changes, in order.
    #[must_use]
    pub fn changes(&self) -> &[MetricChange] {
        &self.metric_changes
    }

    /// True when nothing is affected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.affected_metrics.is_empty() && self.metric_changes.is_empty()
    }
}

/// Kinds of anomaly the detector can raise.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    DemandSurge,
    DeliveryDelay,
    WarehouseFull,
    HighReturnRate,
}

impl AnomalyKind {
    /// Wire name, e.g. `demand_surge`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DemandSurge => "demand_surge",
            Self::DeliveryDelay => "delivery_delay",
            Self::WarehouseFull => "warehouse_full",
            Self::HighReturnRate => "high_return_rate",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anomaly severity.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

/// A detected deviation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    /// Anomaly kind.
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    /// Severity class.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Detection time.
    pub timestamp: DateTime<Utc>,
    /// Store or site the anomaly was observed at, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Affected metrics and their changes.
    #[serde(flatten)]
    pub metrics: AffectedMetrics,
}

impl Anomaly {
    /// Creates an anomaly stamped with the current time.
    #[must_use]
    pub fn new(kind: AnomalyKind, severity: Severity, message: impl Into<String>, metrics: AffectedMetrics) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            timestamp: Utc::now(),
            location: None,
            metrics,
        }
    }

    /// Attaches a location.
    #[must_use]
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}
