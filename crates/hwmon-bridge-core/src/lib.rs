//! hwmon-bridge core library
//!
//! Turns the sensor tree published by a hardware monitor's web endpoint
//! into a flat, classified list of readings.
//!
//! ```
//! use hwmon_bridge_core::{SensorCategory, SensorTreeParser};
//!
//! let snapshot = SensorTreeParser
//!     .parse_str(r#"{"SensorId": "/cpu/0/temperature/2", "Value": "45.2 °C"}"#)
//!     .unwrap();
//! assert_eq!(snapshot.sensors[0].category, SensorCategory::Temperature);
//! ```

pub mod category;
pub mod error;
pub mod node;
pub mod parser;
pub mod record;
pub mod value;

pub use category::SensorCategory;
pub use error::{Error, Result};
pub use node::SensorNode;
pub use parser::SensorTreeParser;
pub use record::{SensorRecord, Snapshot};
pub use value::{coerce, Reading};
