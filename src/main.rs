//! DDP → FPP bridge daemon.
//!
//! Listens for DDP v1 frame chunks over UDP and publishes completed
//! frames into the FPP daemon's pixel overlay shared-memory region,
//! capped at a configured publish rate.
//!
//! ## Architecture
//! - **Bridge loop** (blocking, via `spawn_blocking`): owns the socket
//!   and the whole data path, one datagram at a time
//! - **Startup control-plane call** (tokio/reqwest): best-effort request
//!   asking FPP to accept externally written frames for the model
//!
//! ## Usage
//! ```sh
//! ./target/release/ddp-bridge --width 90 --height 50 --model Light_Wall
//! ```

use clap::Parser;
use ddp_bridge::bridge::Bridge;
use ddp_bridge::fpp::{DEFAULT_API_PORT, FppClient};
use ddp_bridge::mapping::{MapSource, PixelMap};
use ddp_bridge::output::FrameOutput;
use ddp_bridge::{MatrixConfig, overlay_region_path, setup_signal_handler};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// DDP v1 → FPP pixel overlay bridge
#[derive(Parser)]
#[command(name = "ddp-bridge")]
#[command(about = "Bridges DDP frame streams into an FPP pixel overlay model")]
#[command(version)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Listen UDP port
    #[arg(long, default_value = "4049")]
    port: u16,

    /// Matrix width in pixels
    #[arg(long, default_value = "90")]
    width: u32,

    /// Matrix height in pixels
    #[arg(long, default_value = "50")]
    height: u32,

    /// Overlay model name (determines the shared-memory path)
    #[arg(long, default_value = "Light_Wall")]
    model: String,

    /// Layout CSV mapping grid cells to pixel indices; identity if omitted
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Minimum interval between publishes, in milliseconds
    #[arg(long, default_value = "50")]
    min_interval_ms: u64,

    /// FPP API host for the overlay enable call
    #[arg(long, default_value = "localhost")]
    fpp_host: String,

    /// FPP API port
    #[arg(long, default_value_t = DEFAULT_API_PORT)]
    fpp_port: u16,

    /// Skip the FPP overlay enable call at startup
    #[arg(long)]
    skip_fpp_setup: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing subscriber for bridge logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let args = Args::parse();
    let matrix = MatrixConfig::new(args.width, args.height);
    let listen = SocketAddr::new(args.host, args.port);
    let region = overlay_region_path(&args.model);

    tracing::info!("DDP bridge v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Matrix: {}x{}", matrix.width, matrix.height);
    tracing::info!("Listening on {}", listen);
    tracing::info!("Model: {} → {}", args.model, region.display());
    tracing::info!("Publish ceiling: every {} ms", args.min_interval_ms);

    let map = PixelMap::load(args.layout.as_deref(), matrix);
    match map.source() {
        MapSource::LayoutFile { entries, skipped } => {
            tracing::info!("Loaded {} pixel mappings ({} skipped)", entries, skipped);
        }
        MapSource::Identity => tracing::info!("Using row-major identity mapping"),
    }

    let output = FrameOutput::new(region, matrix.frame_byte_count());

    // Bind before anything else: a taken port is the one fatal error.
    let mut bridge = match Bridge::new(
        listen,
        matrix,
        Duration::from_millis(args.min_interval_ms),
        map,
        output,
    ) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    // Best-effort: ask FPP to accept externally written frames.
    if !args.skip_fpp_setup {
        match FppClient::new(&args.fpp_host, args.fpp_port) {
            Ok(client) => client.setup_overlay(&args.model).await,
            Err(e) => tracing::warn!("FPP client unavailable: {}", e),
        }
    }

    let running = setup_signal_handler();
    tokio::task::spawn_blocking(move || bridge.run(running))
        .await
        .expect("Bridge thread panicked");
}
