//! Threshold rules over processed records and metrics snapshots.

use std::sync::Arc;

use crate::broker::{topics, Broker, Subscriber, Topic};
use crate::error::PulseResult;
use crate::event::{
    AffectedMetrics, Anomaly, AnomalyKind, ChangeType, Event, Magnitude, MetricChange, MetricId, MetricsSnapshot,
    RawRecord, Severity,
};

use super::unexpected_payload;

/// Units sold in one POS window above which demand counts as a surge.
pub const DEMAND_SURGE_SALES: u32 = 250;
/// On-time delivery percentage below which deliveries count as delayed.
pub const DELIVERY_DELAY_PCT: f64 = 90.0;
/// Occupancy ratio above which the warehouse counts as full.
pub const WAREHOUSE_FULL_RATIO: f64 = 0.95;
/// Return ratio above which returns count as high.
pub const HIGH_RETURN_RATIO: f64 = 0.10;

fn significant(id: MetricId, change_type: ChangeType) -> AffectedMetrics {
    AffectedMetrics::from_changes(&[MetricChange::new(id, change_type, Magnitude::Significant)])
}

/// Rule over a processed record.
#[must_use]
pub fn detect_processed(record: &RawRecord) -> Option<Anomaly> {
    match record {
        RawRecord::Pos { store_id, sales, .. } if *sales > DEMAND_SURGE_SALES => Some(
            Anomaly::new(
                AnomalyKind::DemandSurge,
                Severity::High,
                format!("Unusual high demand detected: {sales} units in {store_id}"),
                significant(MetricId::TotalSales, ChangeType::Increase).also_affecting(MetricId::AvgTransaction),
            )
            .at(store_id.clone()),
        ),
        _ => None,
    }
}

/// Rules over a metrics snapshot. At most one anomaly per snapshot: the first
/// matching rule wins, in the order delivery, occupancy, returns.
#[must_use]
pub fn detect_metrics(metrics: &MetricsSnapshot) -> Option<Anomaly> {
    if metrics.on_time_delivery < DELIVERY_DELAY_PCT {
        return Some(Anomaly::new(
            AnomalyKind::DeliveryDelay,
            Severity::High,
            format!("On-time delivery dropped to {:.2}%", metrics.on_time_delivery),
            significant(MetricId::OnTimeDelivery, ChangeType::Decrease),
        ));
    }
    if metrics.warehouse_occupancy > WAREHOUSE_FULL_RATIO {
        return Some(Anomaly::new(
            AnomalyKind::WarehouseFull,
            Severity::Medium,
            format!(
                "Warehouse occupancy at {:.0}% - nearing capacity!",
                metrics.warehouse_occupancy * 100.0
            ),
            significant(MetricId::WarehouseOccupancy, ChangeType::Increase),
        ));
    }
    if metrics.return_rate > HIGH_RETURN_RATIO {
        return Some(Anomaly::new(
            AnomalyKind::HighReturnRate,
            Severity::Medium,
            format!("Return rate increased to {:.1}%", metrics.return_rate * 100.0),
            significant(MetricId::ReturnRate, ChangeType::Increase),
        ));
    }
    None
}

/// Publishes an `anomaly` whenever a rule matches.
#[derive(Debug)]
pub struct AnomalyDetector {
    broker: Arc<Broker>,
}

impl AnomalyDetector {
    /// Creates the detector and subscribes it to processed records and
    /// metrics snapshots.
    pub fn attach(broker: Arc<Broker>) -> Arc<Self> {
        let detector = Arc::new(Self {
            broker: Arc::clone(&broker),
        });
        broker.subscribe(topics::PROCESSED_DATA, Arc::clone(&detector) as Arc<dyn Subscriber>);
        broker.subscribe(topics::METRICS_UPDATE, Arc::clone(&detector) as Arc<dyn Subscriber>);
        detector
    }
}

impl Subscriber for AnomalyDetector {
    fn notify(&self, topic: &Topic, event: &Event) -> PulseResult<()> {
        let anomaly = if *topic == topics::PROCESSED_DATA {
            match event {
                Event::Raw(record) => detect_processed(record),
                other => return Err(unexpected_payload(topic, other, "raw record")),
            }
        } else if *topic == topics::METRICS_UPDATE {
            match event {
                Event::Metrics(metrics) => detect_metrics(metrics),
                other => return Err(unexpected_payload(topic, other, "metrics snapshot")),
            }
        } else {
            None
        };

        if let Some(anomaly) = anomaly {
            tracing::info!(kind = %anomaly.kind, message = %anomaly.message, "anomaly detected");
            self.broker.publish(&topics::ANOMALY, anomaly);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "anomaly-detector"
    }
}
