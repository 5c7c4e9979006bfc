//! Dashboard configuration.
//!
//! Defaults reproduce the demo cadence. The server binary overrides
//! individual fields from command-line flags and environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timer periods, delays and buffer sizes for a `Dashboard`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Period of the synthetic ingestion feed.
    #[serde(with = "millis")]
    pub ingest_period: Duration,
    /// Every Nth ingestion tick also produces a point-of-sale sample (0 disables).
    pub pos_sample_every: u32,
    /// Period of the metrics random walk.
    #[serde(with = "millis")]
    pub metrics_period: Duration,
    /// Period of the inventory stock drift.
    #[serde(with = "millis")]
    pub inventory_period: Duration,
    /// Period of generated insights.
    #[serde(with = "millis")]
    pub insight_period: Duration,
    /// Delay between executing a decision and reporting its impact.
    #[serde(with = "millis")]
    pub impact_report_delay: Duration,
    /// Upper bound on one text-generation call.
    #[serde(with = "millis")]
    pub text_generation_timeout: Duration,
    /// Maximum number of records kept in the ingestion log (oldest evicted).
    pub ingestion_log_capacity: usize,
    /// Per-listener buffer of the outbound push channel.
    pub outbound_capacity: usize,
    /// Starting web-traffic counter.
    pub initial_web_traffic: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            ingest_period: Duration::from_secs(3),
            pos_sample_every: 5,
            metrics_period: Duration::from_secs(5),
            inventory_period: Duration::from_secs(8),
            insight_period: Duration::from_secs(15),
            impact_report_delay: Duration::from_secs(10),
            text_generation_timeout: Duration::from_secs(30),
            ingestion_log_capacity: 10_000,
            outbound_capacity: 1024,
            initial_web_traffic: 1000,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_cadence() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.ingest_period, Duration::from_secs(3));
        assert_eq!(cfg.metrics_period, Duration::from_secs(5));
        assert_eq!(cfg.inventory_period, Duration::from_secs(8));
        assert_eq!(cfg.insight_period, Duration::from_secs(15));
        assert_eq!(cfg.impact_report_delay, Duration::from_secs(10));
        assert_eq!(cfg.initial_web_traffic, 1000);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg: DashboardConfig = serde_json::from_str(r#"{"metrics_period": 250}"#).unwrap();
        assert_eq!(cfg.metrics_period, Duration::from_millis(250));
        assert_eq!(cfg.inventory_period, Duration::from_secs(8));
    }
}
