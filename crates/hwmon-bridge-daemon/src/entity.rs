//! Published sensor entities.
//!
//! An entity is the consumer-facing view of one record: a stable key, a
//! display name, the reading with its unit, and a few attributes.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use hwmon_bridge_core::{SensorRecord, Snapshot};
use serde::Serialize;

/// Prefix for entity unique ids.
const UNIQUE_ID_PREFIX: &str = "hardware_monitor";

/// Extra attributes published with each entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityAttributes {
    pub hw_type: String,
    pub category: String,
    pub peak: Option<f64>,
    /// Capture time of the snapshot the value comes from.
    pub updated: DateTime<Utc>,
}

/// One published sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorEntity {
    pub key: String,
    pub unique_id: String,
    pub name: String,
    pub sensor_id: String,
    pub state: f64,
    pub unit: &'static str,
    pub available: bool,
    pub attributes: EntityAttributes,
}

impl SensorEntity {
    /// Renders an entity for a record of `snapshot` under `key`.
    fn from_record(
        record: &SensorRecord,
        key: String,
        snapshot: &Snapshot,
        available: bool,
    ) -> Self {
        Self {
            unique_id: format!("{}_{}", UNIQUE_ID_PREFIX, key),
            key,
            name: format!(
                "{} {}",
                title_case(&record.hw_type),
                title_case(record.category.as_str())
            ),
            sensor_id: record.id.clone(),
            state: record.value,
            unit: record.category.unit(),
            available,
            attributes: EntityAttributes {
                hw_type: record.hw_type.clone(),
                category: record.category.to_string(),
                peak: record.peak,
                updated: snapshot.timestamp,
            },
        }
    }
}

/// Renders every record of a snapshot.
///
/// Keys are unique within the result. The first record keeps its plain key
/// and later records with the same key get `_2`, `_3`, ... appended, so two
/// drives reporting `/nvme/0/temperature/0` and `/nvme/1/temperature/0`
/// become `nvme_temperature_0` and `nvme_temperature_0_2`.
pub fn entities(snapshot: &Snapshot, available: bool) -> Vec<SensorEntity> {
    let mut taken = HashSet::new();
    snapshot
        .sensors
        .iter()
        .map(|record| {
            let base = record.key();
            let mut key = base.clone();
            let mut n = 1;
            while !taken.insert(key.clone()) {
                n += 1;
                key = format!("{}_{}", base, n);
            }
            SensorEntity::from_record(record, key, snapshot, available)
        })
        .collect()
}

/// Capitalizes the first letter of every word ("gpu-nvidia" -> "Gpu-Nvidia").
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwmon_bridge_core::SensorTreeParser;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        SensorTreeParser
            .parse_json(&json!({
                "Children": [
                    {"SensorId": "/cpu/0/temperature/2", "Value": "45.2 °C", "Max": "78.0 °C"},
                    {"SensorId": "/gpu-nvidia/0/load/1", "Value": "12 %"},
                    {"SensorId": "/nic/eth0/throughput/7", "Value": "0.4 MB/s"}
                ]
            }))
            .unwrap()
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("cpu"), "Cpu");
        assert_eq!(title_case("gpu-nvidia"), "Gpu-Nvidia");
        assert_eq!(title_case("MAINBOARD"), "Mainboard");
        assert_eq!(title_case("nvme2x"), "Nvme2X");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_entity_fields() {
        let snapshot = snapshot();
        let record = &snapshot.sensors[0];
        let entity = SensorEntity::from_record(record, record.key(), &snapshot, true);

        assert_eq!(entity.key, "cpu_temperature_2");
        assert_eq!(entity.unique_id, "hardware_monitor_cpu_temperature_2");
        assert_eq!(entity.name, "Cpu Temperature");
        assert_eq!(entity.sensor_id, "/cpu/0/temperature/2");
        assert_eq!(entity.state, 45.2);
        assert_eq!(entity.unit, "°C");
        assert!(entity.available);
        assert_eq!(entity.attributes.hw_type, "cpu");
        assert_eq!(entity.attributes.category, "temperature");
        assert_eq!(entity.attributes.peak, Some(78.0));
        assert_eq!(entity.attributes.updated, snapshot.timestamp);
    }

    #[test]
    fn test_entities_follow_snapshot_order() {
        let snapshot = snapshot();
        let rendered = entities(&snapshot, false);

        let names: Vec<&str> = rendered.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Cpu Temperature", "Gpu-Nvidia Usage", "Nic Network"]
        );
        assert_eq!(rendered[1].unit, "%");
        assert_eq!(rendered[2].unit, "MB/s");
        assert!(rendered.iter().all(|e| !e.available));
    }

    #[test]
    fn test_duplicate_keys_get_suffix() {
        let snapshot = SensorTreeParser
            .parse_json(&json!({
                "Children": [
                    {"SensorId": "/nvme/0/temperature/0", "Value": "40 °C"},
                    {"SensorId": "/nvme/1/temperature/0", "Value": "52 °C"},
                    {"SensorId": "/nvme/2/temperature/0", "Value": "47 °C"}
                ]
            }))
            .unwrap();
        let rendered = entities(&snapshot, true);

        let keys: Vec<&str> = rendered.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["nvme_temperature_0", "nvme_temperature_0_2", "nvme_temperature_0_3"]
        );
        assert_eq!(rendered[1].unique_id, "hardware_monitor_nvme_temperature_0_2");
        assert_eq!(rendered[1].state, 52.0);
        assert_eq!(rendered[1].sensor_id, "/nvme/1/temperature/0");
    }

    #[test]
    fn test_serialized_shape() {
        let snapshot = snapshot();
        let record = &snapshot.sensors[1];
        let entity = SensorEntity::from_record(record, record.key(), &snapshot, true);
        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["key"], "gpu-nvidia_usage_1");
        assert_eq!(json["unit"], "%");
        assert!(json["attributes"]["peak"].is_null());
        assert!(json["attributes"]["updated"].is_string());
    }
}
