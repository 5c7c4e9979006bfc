//! Raw record ingestion.
//!
//! `IngestionSource` keeps a bounded in-memory log of everything it ingested
//! and republishes each record on `raw_data`. `SyntheticFeed` manufactures
//! the records the dashboard timer feeds into it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::broker::{topics, Broker};
use crate::event::RawRecord;

use super::lock;

/// Entry point for raw records.
#[derive(Debug)]
pub struct IngestionSource {
    broker: Arc<Broker>,
    log: Mutex<VecDeque<RawRecord>>,
    capacity: usize,
    ingested: AtomicU64,
}

impl IngestionSource {
    /// Creates a source whose log keeps at most `capacity` records.
    #[must_use]
    pub fn new(broker: Arc<Broker>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            broker,
            log: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            ingested: AtomicU64::new(0),
        }
    }

    /// Appends `record` to the log, evicting the oldest entry when full, and
    /// publishes it on `raw_data`.
    pub fn ingest(&self, record: RawRecord) {
        let stored = {
            let mut log = lock(&self.log);
            if log.len() == self.capacity {
                log.pop_front();
            }
            log.push_back(record.clone());
            log.len()
        };
        let total = self.ingested.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(stored, total, "record ingested");
        self.broker.publish(&topics::RAW_DATA, record);
    }

    /// Records ingested since startup, evicted ones included.
    #[must_use]
    pub fn ingested_count(&self) -> u64 {
        self.ingested.load(Ordering::Relaxed)
    }

    /// Records currently held in the log.
    #[must_use]
    pub fn log_len(&self) -> usize {
        lock(&self.log).len()
    }

    /// The `n` most recent records, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<RawRecord> {
        let log = lock(&self.log);
        log.iter().skip(log.len().saturating_sub(n)).cloned().collect()
    }
}

/// Generator of synthetic sensor and point-of-sale records.
#[derive(Debug)]
pub struct SyntheticFeed {
    rng: StdRng,
    ticks: u64,
    pos_every: u32,
}

impl SyntheticFeed {
    /// A feed emitting one point-of-sale sample every `pos_every` ticks
    /// (0 disables them).
    #[must_use]
    pub fn new(pos_every: u32) -> Self {
        Self::with_rng(pos_every, StdRng::from_entropy())
    }

    /// Deterministic feed for tests.
    #[must_use]
    pub fn seeded(pos_every: u32, seed: u64) -> Self {
        Self::with_rng(pos_every, StdRng::seed_from_u64(seed))
    }

    fn with_rng(pos_every: u32, rng: StdRng) -> Self {
        Self {
            rng,
            ticks: 0,
            pos_every,
        }
    }

    /// Records for one ingestion tick: always a temperature reading, plus a
    /// POS sample on every Nth tick.
    pub fn next_batch(&mut self) -> Vec<RawRecord> {
        self.ticks += 1;
        let mut batch = vec![self.iot_reading()];
        if self.pos_every > 0 && self.ticks % u64::from(self.pos_every) == 0 {
            batch.push(self.pos_sample());
        }
        batch
    }

    fn iot_reading(&mut self) -> RawRecord {
        RawRecord::Iot {
            timestamp: Utc::now(),
            sensor_id: format!("temp_sensor_{}", self.rng.gen_range(1..=5)),
            sensor_type: "temperature".to_string(),
            value: self.rng.gen_range(18.0..33.0),
            location: format!("warehouse_{}", self.rng.gen_range(1..=3)),
        }
    }

    fn pos_sample(&mut self) -> RawRecord {
        RawRecord::Pos {
            timestamp: Utc::now(),
            store_id: format!("store_{}", self.rng.gen_range(1..=5)),
            sales: self.rng.gen_range(0..300),
        }
    }
}
