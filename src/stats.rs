//! Rolling per-second bridge statistics.
//!
//! Counts are observational only — nothing on the data path reads them
//! back. The receive loop owns one `WindowStats`, records events as they
//! happen, and calls [`WindowStats::maybe_report`] once per datagram; at
//! each one-second boundary the window is logged and reset.

use std::time::{Duration, Instant};

/// One second's worth of bridge activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowReport {
    /// Frames fully assembled in this window.
    pub completed: u32,
    /// Frames written to the shared region.
    pub published: u32,
    /// Frames dropped by the rate gate.
    pub dropped: u32,
    /// Mean shared-region write time across published frames.
    pub mean_publish: Duration,
    /// Chunk count of the most recently completed frame.
    pub chunks_per_frame: u32,
}

pub struct WindowStats {
    window_start: Instant,
    completed: u32,
    published: u32,
    dropped: u32,
    publish_total: Duration,
    chunks_per_frame: u32,
}

impl WindowStats {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            completed: 0,
            published: 0,
            dropped: 0,
            publish_total: Duration::ZERO,
            chunks_per_frame: 0,
        }
    }

    pub fn record_completed(&mut self, chunk_count: u32) {
        self.completed += 1;
        self.chunks_per_frame = chunk_count;
    }

    pub fn record_published(&mut self, write_time: Duration) {
        self.published += 1;
        self.publish_total += write_time;
    }

    pub fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    /// Close the current window and start the next one.
    pub fn end_window(&mut self, now: Instant) -> WindowReport {
        let mean_publish = if self.published > 0 {
            self.publish_total / self.published
        } else {
            Duration::ZERO
        };

        let report = WindowReport {
            completed: self.completed,
            published: self.published,
            dropped: self.dropped,
            mean_publish,
            chunks_per_frame: self.chunks_per_frame,
        };

        *self = Self::new(now);
        report
    }

    /// Log and reset the window once a second has elapsed. Quiet seconds
    /// (no frames at all) roll over silently.
    pub fn maybe_report(&mut self, now: Instant) {
        if now.duration_since(self.window_start) < Duration::from_secs(1) {
            return;
        }

        let report = self.end_window(now);
        if report.completed == 0 && report.published == 0 && report.dropped == 0 {
            return;
        }

        tracing::info!(
            "1s stats: in={} fps | out={} fps | drop={} | write {:.2}ms | chunks/frame={}",
            report.completed,
            report.published,
            report.dropped,
            report.mean_publish.as_secs_f64() * 1000.0,
            report.chunks_per_frame
        );
    }
}

// ── Tests ──────────────────────────────────────────────────────────
