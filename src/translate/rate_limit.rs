use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{BlocksError, Result};

/// Minimum-interval gate shared by every translation request.
///
/// Only successful calls move the gate, and they move it to their completion
/// time. The check and the record are each taken under the lock so hosts that
/// drive callbacks from several tasks still see a consistent timestamp.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_success: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_success: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Fail with `RateLimited` if the last success is too recent.
    pub fn check(&self, now: Instant) -> Result<()> {
        let last = *self.lock();
        match last {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed < self.min_interval {
                    let wait = self.min_interval - elapsed;
                    debug!("Rate limited, {:?} remaining", wait);
                    Err(BlocksError::RateLimited { wait })
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    /// Record a successful translation completing at `completed_at`.
    pub fn record_success(&self, completed_at: Instant) {
        *self.lock() = Some(completed_at);
    }

    pub fn last_success(&self) -> Option<Instant> {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        // The guarded value is a plain timestamp, so a poisoned lock is still usable.
        self.last_success.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
