//! # ChainPulse - Live Supply-Chain Dashboard Backend
//!
//! ChainPulse simulates a retail supply chain and pushes everything it does to
//! connected dashboards. At its core is an in-process topic broker: producers
//! (ingestion, metrics, inventory) publish events, consumers (anomaly
//! detection, decisions, insights) react and publish derived events, and the
//! broker mirrors every publish to remote listeners.
//!
//! ## Core Concepts
//!
//! - **Topic**: named channel of one event kind
//! - **Event**: immutable payload published on a topic
//! - **Subscriber**: anything with a `notify(topic, event)` operation
//! - **Cascade**: chain of publishes triggered within one originating publish
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chainpulse::{Dashboard, DashboardConfig};
//! use chainpulse::insight::NoTextGenerator;
//!
//! let dashboard = Dashboard::new(DashboardConfig::default(), Arc::new(NoTextGenerator));
//! let mut rx = dashboard.listen();
//! dashboard.simulate("warehouse_fire");
//! // simulation_result, decision_suggestion, stock_levels_update, ...
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod broker;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod event;
pub mod insight;
pub mod schedule;
pub mod services;

// HTTP / WebSocket / SSE surface
#[cfg(feature = "server")]
pub mod transport;

pub use broker::{topics, BroadcastOutbound, Broker, Envelope, FnSubscriber, Outbound, Subscriber, Topic};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, MetricsCache};
pub use error::{ExecutionError, PulseError, PulseResult, TransportError, ValidationError};
pub use event::{
    Anomaly, AnomalyKind, ApprovedDecision, DecisionKind, DecisionSuggestion, Event, MetricsSnapshot, RawRecord,
    Scenario, SimulationResult, StockLevels,
};
pub use insight::{InsightGenerator, TextGenerator};
