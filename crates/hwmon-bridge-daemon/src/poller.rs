//! Poll loop: fetch, parse, publish.
//!
//! Cycles run one at a time on a fixed interval. A refresh request runs a
//! cycle immediately and the schedule continues from there.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::PollError;
use crate::fetch::SensorFetcher;
use crate::state::AppState;

/// Minimum time between two repeated failure log lines.
const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Runs a single cycle and records its outcome.
pub async fn poll_once(state: &AppState, fetcher: &SensorFetcher) -> Result<(), PollError> {
    match fetcher.fetch_snapshot().await {
        Ok(snapshot) => {
            let snapshot = state.record_success(snapshot);
            debug!(sensors = snapshot.len(), "Published snapshot");
            Ok(())
        }
        Err(e) => {
            state.record_failure(&e);
            Err(e)
        }
    }
}

/// Rate limits repeated failure logs.
struct ErrorThrottle {
    consecutive_errors: u32,
    suppressed: u32,
    last_error_log: Instant,
}

impl ErrorThrottle {
    fn new() -> Self {
        Self {
            consecutive_errors: 0,
            suppressed: 0,
            last_error_log: Instant::now(),
        }
    }

    fn failure(&mut self, url: &str, e: &PollError) {
        self.consecutive_errors += 1;
        // Log the first failure of a streak, then at most once per minute.
        let elapsed = self.last_error_log.elapsed();
        if self.consecutive_errors == 1 || elapsed >= ERROR_LOG_INTERVAL {
            if self.suppressed > 0 {
                warn!(
                    "Poll of {} failed (repeated {} times in {:?}): {}",
                    url,
                    self.suppressed + 1,
                    elapsed,
                    e
                );
            } else {
                warn!("Poll of {} failed: {}", url, e);
            }
            self.last_error_log = Instant::now();
            self.suppressed = 0;
        } else {
            self.suppressed += 1;
        }
    }

    fn success(&mut self) {
        self.consecutive_errors = 0;
        self.suppressed = 0;
    }
}

/// Polls forever. The first cycle runs immediately.
pub async fn poll_loop(state: Arc<AppState>, fetcher: SensorFetcher, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut throttle = ErrorThrottle::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = state.refresh_requested() => {
                debug!("Refresh requested");
                ticker.reset();
            }
        }

        match poll_once(&state, &fetcher).await {
            Ok(()) => throttle.success(),
            Err(e) => throttle.failure(fetcher.url(), &e),
        }
    }
}
