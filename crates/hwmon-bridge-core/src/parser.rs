//! Sensor tree traversal.
//!
//! Walks a [`SensorNode`] tree depth-first and collects every node that
//! carries a readable, classifiable sensor. Nodes that do not qualify are
//! skipped but their children are still visited.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::trace;

use crate::category::SensorCategory;
use crate::node::SensorNode;
use crate::record::{SensorRecord, Snapshot};
use crate::value::coerce;
use crate::Result;

/// Stateless parser turning sensor trees into snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorTreeParser;

impl SensorTreeParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        Self
    }

    /// Parses a tree, stamping the snapshot with the current time.
    pub fn parse(&self, root: &SensorNode) -> Snapshot {
        self.parse_at(root, Utc::now())
    }

    /// Parses a tree with an explicit capture time.
    pub fn parse_at(&self, root: &SensorNode, timestamp: DateTime<Utc>) -> Snapshot {
        let mut snapshot = Snapshot::new(timestamp);
        self.scan(root, &mut snapshot.sensors);
        snapshot
    }

    /// Parses a decoded JSON document.
    ///
    /// Fails only if the root is not an object.
    pub fn parse_json(&self, document: &Value) -> Result<Snapshot> {
        let timestamp = Utc::now();
        let root = SensorNode::from_json(document)?;
        Ok(self.parse_at(&root, timestamp))
    }

    /// Parses a JSON document from text.
    pub fn parse_str(&self, document: &str) -> Result<Snapshot> {
        let value: Value = serde_json::from_str(document)?;
        self.parse_json(&value)
    }

    fn scan(&self, node: &SensorNode, out: &mut Vec<SensorRecord>) {
        if let Some(record) = Self::classify(node) {
            out.push(record);
        }

        for child in &node.children {
            self.scan(child, out);
        }
    }

    /// Builds a record for a single node, ignoring its children.
    ///
    /// The category comes from the last path segment. When that segment
    /// matches no rule, earlier segments are tried from nearest to farthest,
    /// never the hardware type. A last-segment-only rule would drop
    /// LibreHardwareMonitor ids that end in an index or a label, such as
    /// `/cpu/0/temperature/2` or `/mainboard/power/vcore`, which must classify
    /// as temperature and power. Do not narrow this to the last segment.
    pub fn classify(node: &SensorNode) -> Option<SensorRecord> {
        let id = node.id();
        if id.is_empty() {
            return None;
        }

        let Some(value) = coerce(node.value.as_ref()) else {
            trace!(sensor_id = id, "Skipping sensor without a numeric value");
            return None;
        };

        let segments: Vec<&str> = id
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if segments.len() < 2 {
            trace!(sensor_id = id, "Skipping malformed sensor id");
            return None;
        }

        // The last segment decides. When it is only an index or a label
        // ("/cpu/0/temperature/2", "/mainboard/power/vcore") the nearest
        // classifiable segment above it does, never the hardware type.
        let hw_type = segments[0].to_lowercase();
        let category = segments[1..]
            .iter()
            .rev()
            .find_map(|segment| SensorCategory::classify(segment));
        let Some(category) = category else {
            trace!(sensor_id = id, "Skipping unsupported sensor type");
            return None;
        };

        Some(SensorRecord {
            id: id.to_string(),
            hw_type,
            category,
            value,
            peak: coerce(node.max.as_ref()),
        })
    }
}
