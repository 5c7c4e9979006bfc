//! Warehouse stock levels.
//!
//! Three counters drift on a timer and react to simulated scenarios. Counters
//! never go below zero. The service also turns high demand forecasts into
//! restock alerts.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::broker::{topics, Broker, Subscriber, Topic};
use crate::error::PulseResult;
use crate::event::{Event, RestockAlert, Scenario, StockLevels};

use super::{lock, unexpected_payload};

/// Predicted demand above which a restock alert is raised.
pub const RESTOCK_THRESHOLD: u32 = 120;

const INITIAL: [f64; 3] = [1000.0, 800.0, 1200.0];
const DRIFT: [f64; 3] = [50.0, 40.0, 60.0];
const FILL: [f64; 3] = [200.0, 150.0, 250.0];
const STOCKOUT: [f64; 3] = [300.0, 200.0, 400.0];
const SURGE_DRAW: [f64; 3] = [100.0, 80.0, 120.0];

#[derive(Debug)]
struct State {
    stock: [f64; 3],
    rng: StdRng,
}

impl State {
    fn add(&mut self, delta: [f64; 3]) {
        for (level, d) in self.stock.iter_mut().zip(delta) {
            *level += d;
        }
    }

    fn withdraw(&mut self, amount: [f64; 3]) {
        for (level, a) in self.stock.iter_mut().zip(amount) {
            *level = (*level - a).max(0.0);
        }
    }

    fn drift(&mut self) {
        for (level, spread) in self.stock.iter_mut().zip(DRIFT) {
            *level = (*level + self.rng.gen_range(-spread..spread)).max(0.0);
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn levels(&self) -> StockLevels {
        let [w1, w2, w3] = self.stock;
        StockLevels {
            warehouse_1: w1.floor() as u64,
            warehouse_2: w2.floor() as u64,
            warehouse_3: w3.floor() as u64,
            total_stock: (w1 + w2 + w3).floor() as u64,
        }
    }
}

/// Owner of the warehouse stock counters.
#[derive(Debug)]
pub struct InventoryService {
    broker: Arc<Broker>,
    state: Mutex<State>,
}

impl InventoryService {
    /// Creates the service and subscribes it to demand forecasts and
    /// simulation results.
    pub fn attach(broker: Arc<Broker>) -> Arc<Self> {
        Self::attach_with(broker, StdRng::from_entropy())
    }

    /// Like [`attach`](Self::attach) with a deterministic random source.
    pub fn attach_seeded(broker: Arc<Broker>, seed: u64) -> Arc<Self> {
        Self::attach_with(broker, StdRng::seed_from_u64(seed))
    }

    fn attach_with(broker: Arc<Broker>, rng: StdRng) -> Arc<Self> {
        let service = Arc::new(Self {
            broker: Arc::clone(&broker),
            state: Mutex::new(State { stock: INITIAL, rng }),
        });
        broker.subscribe(topics::DEMAND_FORECAST, Arc::clone(&service) as Arc<dyn Subscriber>);
        broker.subscribe(topics::SIMULATION_RESULT, Arc::clone(&service) as Arc<dyn Subscriber>);
        service
    }

    /// Current levels without drifting.
    #[must_use]
    pub fn levels(&self) -> StockLevels {
        lock(&self.state).levels()
    }

    /// Applies one random drift step and publishes `stock_levels_update`.
    pub fn tick(&self) -> StockLevels {
        let levels = {
            let mut state = lock(&self.state);
            state.drift();
            state.levels()
        };
        tracing::debug!(total = levels.total_stock, "stock levels updated");
        self.broker.publish(&topics::STOCK_LEVELS_UPDATE, levels);
        levels
    }

    /// Applies the stock effect of `scenario`, then publishes immediately.
    pub fn apply_scenario(&self, scenario: &str) -> StockLevels {
        {
            let mut state = lock(&self.state);
            match Scenario::from_name(scenario) {
                Some(Scenario::InventoryFill) => state.add(FILL),
                Some(Scenario::InventoryStockout) => state.withdraw(STOCKOUT),
                Some(Scenario::DemandSurge | Scenario::SeasonalSpike) => state.withdraw(SURGE_DRAW),
                _ => {}
            }
        }
        tracing::info!(scenario, "scenario applied to stock");
        self.tick()
    }
}

impl Subscriber for InventoryService {
    fn notify(&self, topic: &Topic, event: &Event) -> PulseResult<()> {
        match event {
            Event::Forecast(forecast) if *topic == topics::DEMAND_FORECAST => {
                if forecast.predicted_demand > RESTOCK_THRESHOLD {
                    tracing::info!(predicted = forecast.predicted_demand, "restock alert");
                    self.broker.publish(
                        &topics::RESTOCK_ALERT,
                        RestockAlert {
                            message: "High demand predicted - consider restocking".to_string(),
                            predicted_demand: forecast.predicted_demand,
                        },
                    );
                }
            }
            Event::Simulation(result) if *topic == topics::SIMULATION_RESULT => {
                self.apply_scenario(&result.scenario);
            }
            other if *topic == topics::DEMAND_FORECAST => {
                return Err(unexpected_payload(topic, other, "demand forecast"));
            }
            other if *topic == topics::SIMULATION_RESULT => {
                return Err(unexpected_payload(topic, other, "simulation result"));
            }
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "inventory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DemandForecast;

    fn service() -> Arc<InventoryService> {
        InventoryService::attach_seeded(Arc::new(Broker::detached()), 17)
    }

    #[test]
    fn starts_at_initial_levels() {
        let levels = service().levels();
        assert_eq!(
            (levels.warehouse_1, levels.warehouse_2, levels.warehouse_3, levels.total_stock),
            (1000, 800, 1200, 3000)
        );
    }

    #[test]
    fn stockout_never_goes_negative() {
        let inventory = service();
        for _ in 0..20 {
            inventory.apply_scenario("inventory_stockout");
            assert!(lock(&inventory.state).stock.iter().all(|level| *level >= 0.0));
        }
        let levels = inventory.levels();
        assert!(levels.warehouse_1 < 50);
        assert!(levels.warehouse_2 < 40);
        assert!(levels.warehouse_3 < 60);
    }

    #[test]
    fn fill_raises_every_warehouse() {
        let inventory = service();
        let levels = inventory.apply_scenario("inventory_fill");
        assert!(levels.warehouse_1 >= 1150);
        assert!(levels.warehouse_2 >= 910);
        assert!(levels.warehouse_3 >= 1390);
    }

    #[test]
    fn unknown_scenario_still_publishes() {
        let broker = Arc::new(Broker::detached());
        let inventory = InventoryService::attach_seeded(Arc::clone(&broker), 1);
        let hits = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let h = Arc::clone(&hits);
        broker.subscribe_fn(topics::STOCK_LEVELS_UPDATE, "count", move |_| {
            h.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        });
        inventory.apply_scenario("meteor_strike");
        assert_eq!(hits.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn high_forecast_raises_restock_alert() {
        let broker = Arc::new(Broker::detached());
        let _inventory = InventoryService::attach_seeded(Arc::clone(&broker), 1);
        let alerts = Arc::new(Mutex::new(Vec::new()));
        let a = Arc::clone(&alerts);
        broker.subscribe_fn(topics::RESTOCK_ALERT, "alerts", move |e| {
            if let Event::RestockAlert(alert) = e {
                a.lock().unwrap().push(alert.predicted_demand);
            }
        });

        for demand in [RESTOCK_THRESHOLD, 121, 90] {
            broker.publish(
                &topics::DEMAND_FORECAST,
                DemandForecast {
                    predicted_demand: demand,
                    confidence: 0.8,
                },
            );
        }
        assert_eq!(*alerts.lock().unwrap(), vec![121]);
    }
}
