//! Rate gate: caps how often completed frames are actually published.
//!
//! FPP refreshes the wall on its own fixed cadence, so publishing faster
//! than that cadence only burns CPU and risks more torn reads. The gate is
//! a leaky bucket of one: a frame completing within `min_interval` of the
//! last publish is dropped, anything later passes. There is no queue —
//! backpressure is realized entirely as bounded, silent frame loss.

use std::time::{Duration, Instant};

/// Default minimum publish interval: 50 ms, matching FPP's 20 FPS refresh.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(50);

pub struct RateGate {
    min_interval: Duration,
    last_publish: Option<Instant>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_publish: None,
        }
    }

    /// Whether a frame completing at `now` may be published.
    ///
    /// The caller must call [`RateGate::record_publish`] after the publish
    /// actually succeeds; a failed publish leaves the window open.
    pub fn should_publish(&self, now: Instant) -> bool {
        match self.last_publish {
            None => true,
            Some(last) => now.duration_since(last) >= self.min_interval,
        }
    }

    pub fn record_publish(&mut self, now: Instant) {
        self.last_publish = Some(now);
    }
}

// ── Tests ──────────────────────────────────────────────────────────
