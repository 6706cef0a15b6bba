//! Poll cycle errors.

use thiserror::Error;

/// Reasons a poll cycle can fail.
///
/// Each failed cycle is reported once; the previous snapshot stays
/// published.
#[derive(Error, Debug)]
pub enum PollError {
    /// The HTTP request itself failed (connect, DNS, TLS, ...).
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The endpoint did not answer within the fetch timeout.
    #[error("Request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status.
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    /// The response body is not JSON.
    #[error("Invalid response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The response is JSON but not a sensor tree.
    #[error("Unparseable response: {0}")]
    Unparseable(#[from] hwmon_bridge_core::Error),
}

impl PollError {
    /// Classifies a transport error.
    pub(crate) fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PollError::Timeout
        } else if err.is_decode() {
            PollError::Body(err)
        } else {
            PollError::Request(err)
        }
    }
}
