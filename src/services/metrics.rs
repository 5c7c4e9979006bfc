//! Metrics generator.
//!
//! Owns the gauge bundle and the web-traffic counter. Each tick moves every
//! gauge by an independent bounded random walk and publishes a rounded copy
//! on `metrics_update`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::broker::{topics, Broker};
use crate::event::{MetricsSnapshot, Weather};

use super::lock;

const WEATHER_CONDITIONS: [&str; 5] = ["Sunny", "Cloudy", "Rainy", "Partly Cloudy", "Stormy"];

/// Baseline the traffic counter is normalized against when deriving sales.
const TRAFFIC_BASELINE: f64 = 1000.0;

/// Shared handle to the web-traffic counter.
///
/// Owned by the metrics generator; the simulation runner receives a clone and
/// adjusts it through `scale`.
#[derive(Debug, Clone)]
pub struct WebTraffic(Arc<AtomicU64>);

impl WebTraffic {
    /// A counter starting at `initial`.
    #[must_use]
    pub fn new(initial: u64) -> Self {
        Self(Arc::new(AtomicU64::new(initial)))
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Overwrites the value.
    pub fn set(&self, value: u64) {
        self.0.store(value, Ordering::Release);
    }

    /// Multiplies the counter by `factor`, flooring the result. Returns the
    /// new value.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn scale(&self, factor: f64) -> u64 {
        let scaled = |v: u64| (v as f64 * factor).floor().max(0.0) as u64;
        match self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| Some(scaled(v))) {
            Ok(prev) | Err(prev) => scaled(prev),
        }
    }
}

#[derive(Debug, Clone)]
struct Gauges {
    warehouse_occupancy: f64,
    warehouse_items: f64,
    waste_saved: f64,
    carbon_reduced: f64,
    open_stores: f64,
    on_time_delivery: f64,
    inventory_turnover: f64,
    order_fulfillment_time: f64,
    supplier_on_time_delivery: f64,
    supplier_defect_rate: f64,
    transportation_cost_per_mile: f64,
    warehouse_pick_rate: f64,
    return_rate: f64,
    weather: Weather,
}

impl Default for Gauges {
    fn default() -> Self {
        Self {
            warehouse_occupancy: 0.75,
            warehouse_items: 15_000.0,
            waste_saved: 1200.0,
            carbon_reduced: 800.0,
            open_stores: 4500.0,
            on_time_delivery: 98.5,
            inventory_turnover: 12.0,
            order_fulfillment_time: 24.0,
            supplier_on_time_delivery: 95.0,
            supplier_defect_rate: 1.5,
            transportation_cost_per_mile: 2.50,
            warehouse_pick_rate: 150.0,
            return_rate: 0.05,
            weather: Weather::default(),
        }
    }
}

fn jitter(rng: &mut StdRng, spread: f64) -> f64 {
    rng.gen_range(-spread..spread)
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

impl Gauges {
    fn walk(&mut self, rng: &mut StdRng) {
        self.warehouse_occupancy = (self.warehouse_occupancy + jitter(rng, 0.015)).clamp(0.6, 1.0);
        self.warehouse_items = (self.warehouse_items + jitter(rng, 100.0)).floor();
        self.waste_saved = (self.waste_saved + jitter(rng, 10.0)).floor();
        self.carbon_reduced = (self.carbon_reduced + rng.gen_range(-7.0..8.0)).floor();
        self.open_stores = (self.open_stores + rng.gen_range(-2.0..3.0)).floor();
        self.on_time_delivery = (self.on_time_delivery + jitter(rng, 0.5)).clamp(85.0, 100.0);
        self.inventory_turnover = (self.inventory_turnover + jitter(rng, 0.25)).max(8.0);
        self.order_fulfillment_time = (self.order_fulfillment_time + jitter(rng, 1.0)).max(18.0);
        self.supplier_on_time_delivery = (self.supplier_on_time_delivery + jitter(rng, 0.5)).clamp(80.0, 100.0);
        self.supplier_defect_rate = (self.supplier_defect_rate + jitter(rng, 0.1)).max(0.5);
        self.transportation_cost_per_mile = (self.transportation_cost_per_mile + jitter(rng, 0.05)).max(2.0);
        self.warehouse_pick_rate = (self.warehouse_pick_rate + jitter(rng, 5.0)).floor();
        self.return_rate = (self.return_rate + jitter(rng, 0.005)).max(0.01);

        self.weather.temperature = rng.gen_range(20..35);
        self.weather.humidity = rng.gen_range(40..80);
        self.weather.wind = rng.gen_range(5..25);
        if let Some(condition) = WEATHER_CONDITIONS.choose(rng) {
            (*condition).clone_into(&mut self.weather.condition);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn snapshot(&self, web_traffic: u64, sales: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            warehouse_occupancy: round_to(self.warehouse_occupancy, 2),
            warehouse_items: self.warehouse_items as i64,
            waste_saved: self.waste_saved as i64,
            carbon_reduced: self.carbon_reduced as i64,
            open_stores: self.open_stores as i64,
            on_time_delivery: round_to(self.on_time_delivery, 2),
            inventory_turnover: self.inventory_turnover,
            order_fulfillment_time: round_to(self.order_fulfillment_time, 0),
            supplier_on_time_delivery: round_to(self.supplier_on_time_delivery, 2),
            supplier_defect_rate: round_to(self.supplier_defect_rate, 2),
            transportation_cost_per_mile: round_to(self.transportation_cost_per_mile, 2),
            warehouse_pick_rate: self.warehouse_pick_rate as i64,
            return_rate: round_to(self.return_rate, 3),
            weather: self.weather.clone(),
            web_traffic,
            sales,
        }
    }
}

#[derive(Debug)]
struct State {
    gauges: Gauges,
    rng: StdRng,
}

/// Periodic publisher of gauge snapshots.
#[derive(Debug)]
pub struct MetricsGenerator {
    broker: Arc<Broker>,
    traffic: WebTraffic,
    state: Mutex<State>,
}

impl MetricsGenerator {
    /// Creates a generator with the standard initial gauges.
    #[must_use]
    pub fn new(broker: Arc<Broker>, initial_traffic: u64) -> Self {
        Self::with_rng(broker, initial_traffic, StdRng::from_entropy())
    }

    /// Creates a generator with a deterministic random source.
    #[must_use]
    pub fn seeded(broker: Arc<Broker>, initial_traffic: u64, seed: u64) -> Self {
        Self::with_rng(broker, initial_traffic, StdRng::seed_from_u64(seed))
    }

    fn with_rng(broker: Arc<Broker>, initial_traffic: u64, rng: StdRng) -> Self {
        Self {
            broker,
            traffic: WebTraffic::new(initial_traffic),
            state: Mutex::new(State {
                gauges: Gauges::default(),
                rng,
            }),
        }
    }

    /// Handle to the web-traffic counter owned by this generator.
    #[must_use]
    pub fn web_traffic(&self) -> WebTraffic {
        self.traffic.clone()
    }

    /// Advances every gauge one step and publishes the snapshot.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn tick(&self) -> MetricsSnapshot {
        let traffic = self.traffic.get();
        let snapshot = {
            let mut guard = lock(&self.state);
            let State { gauges, rng } = &mut *guard;
            gauges.walk(rng);
            let base_sales = rng.gen_range(0u64..300);
            let sales = (base_sales as f64 * traffic as f64 / TRAFFIC_BASELINE).floor() as u64;
            gauges.snapshot(traffic, sales)
        };

        tracing::debug!(
            occupancy = snapshot.warehouse_occupancy,
            on_time = snapshot.on_time_delivery,
            sales = snapshot.sales,
            "metrics generated"
        );
        self.broker.publish(&topics::METRICS_UPDATE, snapshot.clone());
        snapshot
    }
}
