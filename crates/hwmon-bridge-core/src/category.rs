//! Sensor category taxonomy and classification.
//!
//! Classification looks at one path segment at a time. Rules are checked in
//! order and the first match wins, since some names overlap (a segment
//! containing both "temperature" and "load" is a temperature).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Physical quantity measured by a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorCategory {
    Temperature,
    Power,
    Usage,
    Frequency,
    Memory,
    Network,
}

/// A single classification rule.
struct Rule {
    category: SensorCategory,
    matches: fn(&str) -> bool,
}

/// Classification rules, in precedence order.
const RULES: &[Rule] = &[
    Rule {
        category: SensorCategory::Temperature,
        matches: |s| s.contains("temperature"),
    },
    Rule {
        category: SensorCategory::Power,
        matches: |s| s.contains("power"),
    },
    Rule {
        category: SensorCategory::Usage,
        matches: |s| s.contains("load") || s.contains("usage"),
    },
    Rule {
        category: SensorCategory::Frequency,
        // The prefix check runs against the segment alone, which never
        // contains a slash. Kept literal so classification does not change.
        matches: |s| s.contains("clock") && !s.starts_with("clock/0"),
    },
    Rule {
        category: SensorCategory::Memory,
        matches: |s| s.contains("data"),
    },
    Rule {
        category: SensorCategory::Network,
        matches: |s| s.contains("throughput"),
    },
];

impl SensorCategory {
    /// All categories, in classification order.
    pub const ALL: [SensorCategory; 6] = [
        SensorCategory::Temperature,
        SensorCategory::Power,
        SensorCategory::Usage,
        SensorCategory::Frequency,
        SensorCategory::Memory,
        SensorCategory::Network,
    ];

    /// Classifies a single sensor path segment.
    ///
    /// Matching is case-insensitive. Returns `None` when no rule matches.
    pub fn classify(segment: &str) -> Option<Self> {
        let segment = segment.to_lowercase();
        RULES
            .iter()
            .find(|rule| (rule.matches)(&segment))
            .map(|rule| rule.category)
    }

    /// Returns the lowercase name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorCategory::Temperature => "temperature",
            SensorCategory::Power => "power",
            SensorCategory::Usage => "usage",
            SensorCategory::Frequency => "frequency",
            SensorCategory::Memory => "memory",
            SensorCategory::Network => "network",
        }
    }

    /// Returns the unit readings of this category are displayed in.
    pub fn unit(&self) -> &'static str {
        match self {
            SensorCategory::Temperature => "°C",
            SensorCategory::Power => "W",
            SensorCategory::Usage => "%",
            SensorCategory::Frequency => "GHz",
            SensorCategory::Memory => "GB",
            SensorCategory::Network => "MB/s",
        }
    }
}

impl FromStr for SensorCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SensorCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidCategory(s.to_string()))
    }
}

impl std::fmt::Display for SensorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
