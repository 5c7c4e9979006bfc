//! Demand forecasting.
//!
//! Every processed record yields a fresh forecast with a fixed confidence.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::broker::{topics, Broker, Subscriber, Topic};
use crate::error::PulseResult;
use crate::event::{DemandForecast, Event};

use super::lock;

/// Confidence attached to every forecast.
pub const FORECAST_CONFIDENCE: f64 = 0.8;

/// Publishes a fresh `demand_forecast` for every processed record.
#[derive(Debug)]
pub struct DemandForecaster {
    broker: Arc<Broker>,
    rng: Mutex<StdRng>,
}

impl DemandForecaster {
    /// Creates the forecaster and subscribes it to `processed_data`.
    pub fn attach(broker: Arc<Broker>) -> Arc<Self> {
        Self::attach_with(broker, StdRng::from_entropy())
    }

    /// Like [`attach`](Self::attach) with a deterministic random source.
    pub fn attach_seeded(broker: Arc<Broker>, seed: u64) -> Arc<Self> {
        Self::attach_with(broker, StdRng::seed_from_u64(seed))
    }

    fn attach_with(broker: Arc<Broker>, rng: StdRng) -> Arc<Self> {
        let forecaster = Arc::new(Self {
            broker: Arc::clone(&broker),
            rng: Mutex::new(rng),
        });
        broker.subscribe(topics::PROCESSED_DATA, Arc::clone(&forecaster) as Arc<dyn Subscriber>);
        forecaster
    }

    /// Next forecast: demand uniform in [80, 120).
    pub fn forecast(&self) -> DemandForecast {
        DemandForecast {
            predicted_demand: lock(&self.rng).gen_range(80..120),
            confidence: FORECAST_CONFIDENCE,
        }
    }
}

impl Subscriber for DemandForecaster {
    fn notify(&self, topic: &Topic, _event: &Event) -> PulseResult<()> {
        if *topic == topics::PROCESSED_DATA {
            let forecast = self.forecast();
            tracing::debug!(predicted = forecast.predicted_demand, "demand forecast");
            self.broker.publish(&topics::DEMAND_FORECAST, forecast);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "demand-forecaster"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_range_and_confidence() {
        let forecaster = DemandForecaster::attach_seeded(Arc::new(Broker::detached()), 5);
        for _ in 0..1000 {
            let f = forecaster.forecast();
            assert!((80..120).contains(&f.predicted_demand));
            assert!((f.confidence - 0.8).abs() < f64::EPSILON);
        }
    }
}
