use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Single transient error notice. A new message replaces the current one and
/// restarts its display window.
#[derive(Debug, Clone)]
pub struct Notice {
    duration: Duration,
    current: Option<(String, Instant)>,
}

impl Notice {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            current: None,
        }
    }

    pub fn show(&mut self, message: impl Into<String>, now: Instant) {
        let message = message.into();
        warn!("{}", message);
        self.current = Some((message, now));
    }

    /// Message visible at `now`, if any
    pub fn visible(&self, now: Instant) -> Option<&str> {
        match &self.current {
            Some((message, shown_at)) if now.saturating_duration_since(*shown_at) < self.duration => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    /// Drop the message once its window has passed
    pub fn expire(&mut self, now: Instant) {
        if self.visible(now).is_none() {
            self.current = None;
        }
    }
}
