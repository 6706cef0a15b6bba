//! Error types for the sensor tree parser.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by this crate.
///
/// Parsing reports only problems with the document as a whole (not JSON, or
/// a root that is not a node). Anything wrong inside the tree is skipped
/// during traversal. Parsing a category name from text can also fail.
#[derive(Error, Debug)]
pub enum Error {
    /// The document is not valid JSON.
    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// The root of the document is not a sensor node object.
    #[error("Root is not a sensor node (found {0})")]
    NotANode(&'static str),

    /// Unknown sensor category name.
    #[error("Invalid sensor category: {0}")]
    InvalidCategory(String),
}

#[cfg(test)]
mod tests {
    use crate::{SensorCategory, SensorTreeParser};

    #[test]
    fn test_error_messages() {
        let err = SensorTreeParser.parse_str("[]").unwrap_err();
        assert_eq!(err.to_string(), "Root is not a sensor node (found array)");

        let err = "fan".parse::<SensorCategory>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid sensor category: fan");
    }
}
