//! DDP → FPP pixel overlay bridge.
//!
//! Receives DDP v1 datagrams over UDP, reassembles them into full RGB
//! frames, and publishes completed frames into the FPP daemon's pixel
//! overlay shared-memory region at a bounded rate.
//!
//! ## Architecture
//! - **Bridge loop** (blocking thread): owns the socket, frame assembler,
//!   rate gate, pixel map, and shared-memory output
//! - **Control plane** (tokio/reqwest): one best-effort HTTP call at startup
//!   to switch the overlay model into externally-driven mode

pub mod assembler;
pub mod bridge;
pub mod fpp;
pub mod gate;
pub mod mapping;
pub mod output;
pub mod protocol;
pub mod stats;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Matrix configuration ───────────────────────────────────────────

/// Dimensions of the light wall's logical pixel grid.
///
/// Explicit, testable, and no hidden global state — every component that
/// needs the frame geometry takes one of these by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatrixConfig {
    pub width: u32,
    pub height: u32,
}

impl MatrixConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels on the wall.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Number of bytes in one raw RGB frame (3 bytes per pixel).
    pub fn frame_byte_count(&self) -> usize {
        (self.width * self.height * 3) as usize
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            width: 90,
            height: 50,
        }
    }
}

// ── Shared-region naming ───────────────────────────────────────────

/// Path of the FPP pixel overlay data file for a model name.
///
/// FPP publishes each overlay model at `/dev/shm/FPP-Model-Data-<name>`
/// with spaces replaced by underscores. This naming convention plus the
/// region size is the entire contract with the daemon.
pub fn overlay_region_path(model_name: &str) -> std::path::PathBuf {
    let sanitized = model_name.replace(' ', "_");
    std::path::PathBuf::from(format!("/dev/shm/FPP-Model-Data-{sanitized}"))
}

// ── Shutdown signal ────────────────────────────────────────────────

/// Set up a Ctrl+C handler that sets `running` to false.
pub fn setup_signal_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    running
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────
