//! Producer and consumer services wired around the broker.
//!
//! Every service holds a shared `Broker` handle. Services that consume events
//! implement `Subscriber` and register themselves through an `attach`
//! constructor; producers expose a tick or command method that the dashboard
//! drives from a timer or from the HTTP surface.

/// Anomaly detection rules.
pub mod anomaly;
/// Decision suggestions and approved-decision execution.
pub mod decision;
/// Demand forecasting.
pub mod forecast;
/// Raw record ingestion and the synthetic feed.
pub mod ingestion;
/// Stock levels and restock alerts.
pub mod inventory;
/// Gauge random walks and the web-traffic counter.
pub mod metrics;
/// Raw to processed pass-through.
pub mod processing;
/// Scripted what-if scenarios.
pub mod simulation;

pub use anomaly::AnomalyDetector;
pub use decision::DecisionEngine;
pub use forecast::DemandForecaster;
pub use ingestion::{IngestionSource, SyntheticFeed};
pub use inventory::InventoryService;
pub use metrics::{MetricsGenerator, WebTraffic};
pub use processing::ProcessingStage;
pub use simulation::SimulationRunner;

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::broker::Topic;
use crate::error::{PulseError, ValidationError};
use crate::event::Event;

/// Error for a payload whose shape does not belong on `topic`.
pub(crate) fn unexpected_payload(topic: &Topic, event: &Event, expected: &str) -> PulseError {
    ValidationError::InvalidPayload {
        field: topic.to_string(),
        reason: format!("expected {expected}, got {}", event.shape()),
    }
    .into()
}

/// Locks `m`, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
