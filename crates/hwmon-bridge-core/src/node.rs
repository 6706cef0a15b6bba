//! Sensor tree nodes.
//!
//! Monitors such as LibreHardwareMonitor publish a tree where every entry
//! may carry `SensorId`, `Value`, `Max` and `Children`. Decoding is lenient:
//! a field with the wrong JSON type is treated as missing, and a child that
//! is not an object is dropped, so a bad branch never rejects the document.

use serde_json::{Map, Value};

use crate::value::Reading;
use crate::{Error, Result};

/// One entry of the sensor tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorNode {
    /// Hierarchical sensor path, e.g. `/cpu/0/temperature/2`.
    pub sensor_id: Option<String>,
    /// Current reading.
    pub value: Option<Reading>,
    /// Maximum reading observed by the monitor.
    pub max: Option<Reading>,
    /// Child nodes, in document order.
    pub children: Vec<SensorNode>,
}

impl SensorNode {
    /// Decodes the root of a document.
    ///
    /// Fails only when the root itself is not an object.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(Error::NotANode(json_kind(other))),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let children = match map.get("Children") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(Self::from_map)
                .collect(),
            _ => Vec::new(),
        };

        Self {
            sensor_id: map
                .get("SensorId")
                .and_then(Value::as_str)
                .map(str::to_string),
            value: map.get("Value").and_then(Reading::from_json),
            max: map.get("Max").and_then(Reading::from_json),
            children,
        }
    }

    /// Creates a leaf node with an id and a reading.
    pub fn leaf(sensor_id: &str, value: impl Into<Reading>) -> Self {
        Self {
            sensor_id: Some(sensor_id.to_string()),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Sets the maximum reading.
    pub fn with_max(mut self, max: impl Into<Reading>) -> Self {
        self.max = Some(max.into());
        self
    }

    /// Appends a child node.
    pub fn with_child(mut self, child: SensorNode) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the sensor id, or an empty string when missing.
    pub fn id(&self) -> &str {
        self.sensor_id.as_deref().unwrap_or_default()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
