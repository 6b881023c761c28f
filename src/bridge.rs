//! The bridge receive loop: one thread, one datagram at a time.
//!
//! A single thread owns the socket, the frame assembler, the rate gate,
//! the pixel map, and the shared-memory output, and processes each
//! datagram to completion before reading the next. The only blocking
//! point is the socket read itself (with a short timeout so the shutdown
//! flag is polled); everything per-chunk is CPU-bound and small.
//!
//! Only the socket bind is fatal. After that the loop never stops for a
//! data-path problem: malformed datagrams are discarded, stalled frames
//! are superseded by the next frame start, and publish failures are
//! logged while ingestion continues.

use crate::assembler::FrameAssembler;
use crate::gate::RateGate;
use crate::mapping::PixelMap;
use crate::output::FrameOutput;
use crate::protocol::parse_datagram;
use crate::stats::WindowStats;
use crate::{MatrixConfig, is_running};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Largest datagram we accept; DDP producers stay under the Ethernet MTU.
const MAX_DATAGRAM: usize = 1500;

/// How often the loop wakes from a quiet socket to poll the shutdown flag.
const RECV_TIMEOUT: Duration = Duration::from_millis(200);

/// Fatal startup errors. Everything past a successful bind is best effort.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("cannot bind UDP socket on {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("cannot configure UDP socket: {0}")]
    Socket(#[from] io::Error),
}

pub struct Bridge {
    socket: UdpSocket,
    assembler: FrameAssembler,
    gate: RateGate,
    map: PixelMap,
    output: FrameOutput,
    stats: WindowStats,
    /// Persistent remap target; unmapped pixel slots keep their last value.
    remap_buf: Vec<u8>,
}

impl Bridge {
    /// Bind the listen socket and wire up the data path. Bind failure is
    /// the one fatal error in the system; a missing or unwritable shared
    /// region is only logged, and publishing retries per frame.
    pub fn new(
        listen: SocketAddr,
        matrix: MatrixConfig,
        min_interval: Duration,
        map: PixelMap,
        mut output: FrameOutput,
    ) -> Result<Self, BridgeError> {
        let socket = UdpSocket::bind(listen).map_err(|source| BridgeError::Bind {
            addr: listen,
            source,
        })?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;

        match output.open() {
            Ok(init) => tracing::info!(
                "Shared region {} ({:?}, {} bytes)",
                output.path().display(),
                init,
                matrix.frame_byte_count()
            ),
            Err(e) => tracing::warn!("Shared region not available yet: {}", e),
        }

        Ok(Self {
            socket,
            assembler: FrameAssembler::new(matrix.frame_byte_count()),
            gate: RateGate::new(min_interval),
            map,
            output,
            stats: WindowStats::new(Instant::now()),
            remap_buf: vec![0u8; matrix.frame_byte_count()],
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive datagrams until `running` goes false, then blank the wall
    /// and release the shared region.
    pub fn run(&mut self, running: Arc<AtomicBool>) {
        tracing::info!("Bridge listening for DDP frames");

        let mut buf = [0u8; MAX_DATAGRAM];
        while is_running(&running) {
            match self.socket.recv_from(&mut buf) {
                Ok((len, _)) => self.handle_datagram(&buf[..len]),
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => tracing::warn!("Socket receive error: {}", e),
            }
            self.stats.maybe_report(Instant::now());
        }

        tracing::info!("Bridge shutting down");
        if let Err(e) = self.output.clear() {
            tracing::warn!("Could not blank the wall on shutdown: {}", e);
        }
        self.output.close();
    }

    /// One datagram, start to finish: parse, assemble, gate, remap,
    /// publish.
    fn handle_datagram(&mut self, data: &[u8]) {
        // Foreign and malformed traffic is expected noise; discard quietly.
        let Ok(chunk) = parse_datagram(data) else {
            return;
        };

        let Some(frame) = self.assembler.ingest(&chunk) else {
            return;
        };
        self.stats.record_completed(frame.chunk_count);

        let now = Instant::now();
        if !self.gate.should_publish(now) {
            self.stats.record_dropped();
            return;
        }

        let bytes: &[u8] = if self.map.is_identity() {
            &frame.bytes
        } else {
            self.map.remap(&frame.bytes, &mut self.remap_buf);
            &self.remap_buf
        };

        match self.output.publish(bytes) {
            Ok(write_time) => {
                self.gate.record_publish(now);
                self.stats.record_published(write_time);
            }
            Err(e) => tracing::error!("Publish failed: {}", e),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
