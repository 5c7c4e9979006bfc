//! Raw telemetry records entering the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw sample as produced by the ingestion feed.
///
/// The `type` tag selects the record family; the processing stage passes
/// records through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawRecord {
    /// IoT sensor reading.
    Iot {
        /// Capture time.
        timestamp: DateTime<Utc>,
        /// Sensor identifier, e.g. `temp_sensor_3`.
        sensor_id: String,
        /// Sensor family, e.g. `temperature`.
        sensor_type: String,
        /// Reading value.
        value: f64,
        /// Site tag, e.g. `warehouse_2`.
        location: String,
    },

    /// Point-of-sale aggregate for one store.
    Pos {
        /// Capture time.
        timestamp: DateTime<Utc>,
        /// Store identifier, e.g. `store_4`.
        store_id: String,
        /// Units sold in the sampling window.
        sales: u32,
    },
}

impl RawRecord {
    /// Capture time of the record.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Iot { timestamp, .. } | Self::Pos { timestamp, .. } => *timestamp,
        }
    }

    /// Returns true for point-of-sale records.
    #[must_use]
    pub const fn is_pos(&self) -> bool {
        matches!(self, Self::Pos { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iot_record_uses_type_tag() {
        let rec = RawRecord::Iot {
            timestamp: Utc::now(),
            sensor_id: "temp_sensor_1".to_string(),
            sensor_type: "temperature".to_string(),
            value: 21.5,
            location: "warehouse_1".to_string(),
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["type"], "iot");
        assert_eq!(v["sensor_id"], "temp_sensor_1");
        assert!(!rec.is_pos());
    }

    #[test]
    fn pos_record_parses_from_wire() {
        let rec: RawRecord = serde_json::from_value(serde_json::json!({
            "type": "pos",
            "timestamp": "2024-01-01T00:00:00Z",
            "store_id": "store_2",
            "sales": 260
        }))
        .unwrap();
        assert!(rec.is_pos());
    }
}
