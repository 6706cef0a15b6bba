//! Classified sensor records and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::SensorCategory;

/// One classified sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Sensor path exactly as reported, e.g. `/cpu/0/temperature/2`.
    pub id: String,
    /// Lowercased first path segment (`cpu`, `gpu`, `mainboard`, ...).
    pub hw_type: String,
    #[serde(rename = "sensor_category")]
    pub category: SensorCategory,
    pub value: f64,
    /// Maximum reported alongside the value, if any.
    pub peak: Option<f64>,
}

impl SensorRecord {
    /// Returns the last non-empty segment of the sensor path.
    pub fn last_segment(&self) -> &str {
        self.id
            .split('/')
            .rfind(|s| !s.is_empty())
            .unwrap_or_default()
    }

    /// Returns a key identifying this sensor within its hardware group.
    ///
    /// Format: `{hw_type}_{category}_{last segment}`. The device index is not
    /// part of it, so two devices of the same type can share a key
    /// (`/nvme/0/temperature/0` and `/nvme/1/temperature/0`). Consumers that
    /// need unique keys must disambiguate across a whole snapshot.
    pub fn key(&self) -> String {
        format!("{}_{}_{}", self.hw_type, self.category, self.last_segment())
    }
}

/// The result of parsing one sensor tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Capture time.
    pub timestamp: DateTime<Utc>,
    /// Records in depth-first pre-order of the source tree.
    pub sensors: Vec<SensorRecord>,
}

impl Snapshot {
    /// Creates an empty snapshot captured at `timestamp`.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            sensors: Vec::new(),
        }
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Returns true if no sensors were classified.
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Looks up a record by its sensor path.
    pub fn get(&self, id: &str) -> Option<&SensorRecord> {
        self.sensors.iter().find(|s| s.id == id)
    }

    /// Iterates over records of one category.
    pub fn by_category(
        &self,
        category: SensorCategory,
    ) -> impl Iterator<Item = &SensorRecord> + '_ {
        self.sensors.iter().filter(move |s| s.category == category)
    }
}
