//! Service graph.
//!
//! `Dashboard` builds the broker and every service once, in dependency order,
//! and owns the periodic timers that drive the producers. Nothing is global:
//! the HTTP layer and tests reach the services through this value.

use std::sync::{Arc, PoisonError, RwLock};

use crate::broker::{topics, BroadcastOutbound, Broker, Envelope};
use crate::config::DashboardConfig;
use crate::error::PulseResult;
use crate::event::{ApprovedDecision, Event, MetricsSnapshot, SimulationResult};
use crate::insight::{InsightGenerator, TextGenerator};
use crate::schedule::{self, TimerSet};
use crate::services::{
    AnomalyDetector, DecisionEngine, DemandForecaster, IngestionSource, InventoryService, MetricsGenerator,
    ProcessingStage, SimulationRunner, SyntheticFeed,
};

/// Last metrics snapshot seen on `metrics_update`.
#[derive(Debug, Clone, Default)]
pub struct MetricsCache {
    latest: Arc<RwLock<Option<MetricsSnapshot>>>,
}

impl MetricsCache {
    /// Creates the cache and subscribes it to `metrics_update`.
    #[must_use]
    pub fn attach(broker: &Broker) -> Self {
        let cache = Self::default();
        let slot = Arc::clone(&cache.latest);
        broker.subscribe_fn(topics::METRICS_UPDATE, "metrics-cache", move |event| {
            if let Event::Metrics(snapshot) = event {
                *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
            }
        });
        cache
    }

    /// The cached snapshot, `None` before the first tick.
    #[must_use]
    pub fn latest(&self) -> Option<MetricsSnapshot> {
        self.latest.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// The wired service graph.
#[allow(missing_docs)]
#[derive(Debug)]
pub struct Dashboard {
    config: DashboardConfig,
    outbound: BroadcastOutbound,
    broker: Arc<Broker>,
    pub ingestion: Arc<IngestionSource>,
    pub processing: Arc<ProcessingStage>,
    pub detector: Arc<AnomalyDetector>,
    pub metrics: Arc<MetricsGenerator>,
    pub simulation: Arc<SimulationRunner>,
    pub insights: Arc<InsightGenerator>,
    pub decisions: Arc<DecisionEngine>,
    pub forecaster: Arc<DemandForecaster>,
    pub inventory: Arc<InventoryService>,
    metrics_cache: MetricsCache,
    timers: TimerSet,
}

impl Dashboard {
    /// Builds the graph. No timer runs until [`start`](Self::start).
    #[must_use]
    pub fn new(config: DashboardConfig, text: Arc<dyn TextGenerator>) -> Self {
        let outbound = BroadcastOutbound::new(config.outbound_capacity);
        let broker = Arc::new(Broker::new(Arc::new(outbound.clone())));

        let ingestion = Arc::new(IngestionSource::new(Arc::clone(&broker), config.ingestion_log_capacity));
        let processing = ProcessingStage::attach(Arc::clone(&broker));
        let detector = AnomalyDetector::attach(Arc::clone(&broker));
        let metrics = Arc::new(MetricsGenerator::new(Arc::clone(&broker), config.initial_web_traffic));
        let simulation = Arc::new(SimulationRunner::new(Arc::clone(&broker), metrics.web_traffic()));
        let insights = Arc::new(InsightGenerator::new(
            Arc::clone(&broker),
            text,
            config.text_generation_timeout,
        ));
        let decisions = DecisionEngine::attach(
            Arc::clone(&broker),
            Some(Arc::clone(&insights)),
            config.impact_report_delay,
        );
        let forecaster = DemandForecaster::attach(Arc::clone(&broker));
        let inventory = InventoryService::attach(Arc::clone(&broker));
        let metrics_cache = MetricsCache::attach(&broker);

        tracing::debug!(subscriptions = broker.subscription_count(), "dashboard wired");

        Self {
            config,
            outbound,
            broker,
            ingestion,
            processing,
            detector,
            metrics,
            simulation,
            insights,
            decisions,
            forecaster,
            inventory,
            metrics_cache,
            timers: TimerSet::new(),
        }
    }

    /// Arms the ingestion, metrics, inventory and insight timers. Does nothing
    /// while they are already running.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::NoRuntime` outside a Tokio runtime.
    pub fn start(&self) -> PulseResult<()> {
        if self.timers.pending() > 0 {
            tracing::warn!(timers = self.timers.pending(), "dashboard already started");
            return Ok(());
        }
        let cfg = &self.config;

        let ingestion = Arc::clone(&self.ingestion);
        let mut feed = SyntheticFeed::new(cfg.pos_sample_every);
        self.timers.push(schedule::every("ingest", cfg.ingest_period, move || {
            for record in feed.next_batch() {
                ingestion.ingest(record);
            }
        })?);

        let metrics = Arc::clone(&self.metrics);
        self.timers.push(schedule::every("metrics", cfg.metrics_period, move || {
            metrics.tick();
        })?);

        let inventory = Arc::clone(&self.inventory);
        self.timers.push(schedule::every("inventory", cfg.inventory_period, move || {
            inventory.tick();
        })?);

        let insights = Arc::clone(&self.insights);
        self.timers.push(schedule::every_async("insights", cfg.insight_period, move || {
            let insights = Arc::clone(&insights);
            async move {
                insights.generate_insights().await;
            }
        })?);

        tracing::info!(timers = self.timers.pending(), "dashboard started");
        Ok(())
    }

    /// Cancels every timer, pending impact report and in-flight generation.
    pub fn shutdown(&self) {
        self.timers.cancel_all();
        self.decisions.shutdown();
        self.insights.shutdown();
        tracing::info!("dashboard stopped");
    }

    /// Runs a what-if scenario.
    pub fn simulate(&self, scenario: &str) -> SimulationResult {
        self.simulation.run(scenario)
    }

    /// Executes an operator-approved decision.
    ///
    /// # Errors
    ///
    /// See [`DecisionEngine::execute_approved_decision`].
    pub fn approve(&self, decision: ApprovedDecision) -> PulseResult<()> {
        self.decisions.execute_approved_decision(decision)
    }

    /// The shared broker.
    #[must_use]
    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// Configuration the graph was built with.
    #[must_use]
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Attaches a remote listener to the outbound mirror.
    #[must_use]
    pub fn listen(&self) -> tokio::sync::broadcast::Receiver<Envelope> {
        self.outbound.subscribe()
    }

    /// Latest metrics snapshot, `None` before the first tick.
    #[must_use]
    pub fn latest_metrics(&self) -> Option<MetricsSnapshot> {
        self.metrics_cache.latest()
    }

    /// Timers currently armed by [`start`](Self::start).
    #[must_use]
    pub fn running_timers(&self) -> usize {
        self.timers.pending()
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::NoTextGenerator;

    fn dashboard() -> Dashboard {
        Dashboard::new(DashboardConfig::default(), Arc::new(NoTextGenerator))
    }

    #[test]
    fn metrics_cache_tracks_latest_tick() {
        let dash = dashboard();
        assert!(dash.latest_metrics().is_none());
        let snapshot = dash.metrics.tick();
        assert_eq!(dash.latest_metrics(), Some(snapshot));
    }

    #[test]
    fn simulation_shares_the_traffic_counter() {
        let dash = dashboard();
        dash.simulate("web_traffic_spike");
        assert_eq!(dash.metrics.tick().web_traffic, 1500);
    }

    #[test]
    fn start_needs_a_runtime() {
        assert!(dashboard().start().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_timers() {
        let dash = dashboard();
        dash.start().unwrap();
        assert_eq!(dash.running_timers(), 4);
        dash.shutdown();
        assert_eq!(dash.running_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_keeps_one_set_of_timers() {
        let dash = dashboard();
        let mut rx = dash.listen();
        dash.start().unwrap();
        dash.start().unwrap();
        assert_eq!(dash.running_timers(), 4);

        tokio::time::sleep(dash.config().metrics_period + std::time::Duration::from_millis(1)).await;
        let mut ticks = 0;
        while let Ok(envelope) = rx.try_recv() {
            if envelope.topic == topics::METRICS_UPDATE {
                ticks += 1;
            }
        }
        assert_eq!(ticks, 1);

        dash.shutdown();
        dash.start().unwrap();
        assert_eq!(dash.running_timers(), 4);
    }
}
