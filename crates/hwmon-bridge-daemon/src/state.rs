//! Application state management.
//!
//! Holds the last good snapshot and the outcome of the most recent poll
//! cycle. A failed cycle flips availability off but never discards the
//! published readings.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use hwmon_bridge_core::Snapshot;
use serde::Serialize;
use tokio::sync::{broadcast, Notify};
use tracing::info;

use crate::config::Config;
use crate::entity::{self, SensorEntity};
use crate::error::PollError;

/// Capacity of the snapshot update channel.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Outcome of the poll cycles so far.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollStatus {
    /// True iff the most recent cycle succeeded.
    pub available: bool,
    pub url: String,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub sensor_count: usize,
}

/// Shared application state.
pub struct AppState {
    /// Configuration
    config: Config,

    /// Last successfully parsed snapshot
    snapshot: RwLock<Option<Arc<Snapshot>>>,

    /// Poll cycle bookkeeping
    status: RwLock<PollStatus>,

    /// Notifies subscribers after each successful cycle
    updates: broadcast::Sender<Arc<Snapshot>>,

    /// Wakes the poll loop for an out-of-schedule cycle
    refresh: Notify,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: Config) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let status = PollStatus {
            url: config.url.clone(),
            ..Default::default()
        };

        Self {
            config,
            snapshot: RwLock::new(None),
            status: RwLock::new(status),
            updates,
            refresh: Notify::new(),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Publishes a freshly parsed snapshot.
    pub fn record_success(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let recovered = {
            let mut status = self.status.write().unwrap();
            let recovered = status.consecutive_failures > 0;
            status.available = true;
            status.successes += 1;
            status.consecutive_failures = 0;
            status.last_attempt = Some(Utc::now());
            status.last_success = Some(snapshot.timestamp);
            status.last_error = None;
            status.sensor_count = snapshot.len();
            recovered
        };
        *self.snapshot.write().unwrap() = Some(snapshot.clone());

        if recovered {
            info!("Sensor endpoint reachable again");
        }

        // No receivers is fine.
        let _ = self.updates.send(snapshot.clone());
        snapshot
    }

    /// Marks the current cycle as failed, keeping the last snapshot.
    pub fn record_failure(&self, error: &PollError) {
        let mut status = self.status.write().unwrap();
        status.available = false;
        status.failures += 1;
        status.consecutive_failures = status.consecutive_failures.saturating_add(1);
        status.last_attempt = Some(Utc::now());
        status.last_error = Some(error.to_string());
    }

    /// Returns the last good snapshot, if any cycle has succeeded yet.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().unwrap().clone()
    }

    /// Returns true if the most recent cycle succeeded.
    pub fn is_available(&self) -> bool {
        self.status.read().unwrap().available
    }

    /// Returns the poll cycle bookkeeping.
    pub fn status(&self) -> PollStatus {
        self.status.read().unwrap().clone()
    }

    /// Subscribes to snapshot updates.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.updates.subscribe()
    }

    /// Renders entities for the current snapshot.
    pub fn entities(&self) -> Vec<SensorEntity> {
        match self.snapshot() {
            Some(snapshot) => entity::entities(&snapshot, self.is_available()),
            None => Vec::new(),
        }
    }

    /// Renders the entity with the given key.
    pub fn entity(&self, key: &str) -> Option<SensorEntity> {
        self.entities().into_iter().find(|entity| entity.key == key)
    }

    /// Asks the poll loop to run a cycle now.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Waits until a refresh is requested.
    pub async fn refresh_requested(&self) {
        self.refresh.notified().await;
    }
}
