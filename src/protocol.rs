//! DDP v1 datagram parsing.
//!
//! Each UDP datagram carries one chunk of a frame:
//!
//! ```text
//! byte 0      marker, always 0x41 ('A')
//! byte 1      flags (bit 0 = end of frame)
//! byte 2      sequence (informational, not validated)
//! bytes 3-5   big-endian 24-bit byte offset into the frame
//! bytes 6-7   big-endian 16-bit payload length
//! bytes 8-9   data id (unused)
//! bytes 10..  payload of exactly the declared length
//! ```
//!
//! Foreign and malformed traffic on a shared network is expected, so a
//! rejected datagram is a typed reason the receive loop can count and
//! discard — never an error-level event.

use thiserror::Error;

/// Leading marker byte of every DDP v1 datagram.
pub const DDP_MARKER: u8 = 0x41;

/// Fixed DDP header length in bytes.
pub const HEADER_LEN: usize = 10;

/// Flag bit 0: this chunk carries the final bytes of a frame.
pub const FLAG_END_OF_FRAME: u8 = 0x01;

/// Why a datagram was not accepted as a chunk.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    /// Datagram shorter than the fixed header.
    #[error("datagram too short: {0} bytes (header is {HEADER_LEN})")]
    ShortHeader(usize),

    /// First byte is not the DDP marker; foreign traffic.
    #[error("bad marker byte: {0:#04x}")]
    BadMarker(u8),

    /// Declared payload length does not match the bytes present.
    #[error("length mismatch: declared {declared}, available {available}")]
    LengthMismatch { declared: usize, available: usize },
}

/// One datagram's contribution to a frame, borrowing its payload from the
/// receive buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Per-chunk sequence number. Carried through for diagnostics only;
    /// producers are not required to send monotonic sequences.
    pub sequence: u8,
    /// Final chunk of this frame.
    pub end_of_frame: bool,
    /// Byte offset of `payload` within the frame.
    pub offset: usize,
    pub payload: &'a [u8],
}

/// Parse one datagram into a chunk descriptor.
pub fn parse_datagram(data: &[u8]) -> Result<Chunk<'_>, ChunkError> {
    if data.is_empty() || data[0] != DDP_MARKER {
        return Err(ChunkError::BadMarker(data.first().copied().unwrap_or(0)));
    }
    if data.len() < HEADER_LEN {
        return Err(ChunkError::ShortHeader(data.len()));
    }

    let flags = data[1];
    let sequence = data[2];
    let offset = ((data[3] as usize) << 16) | ((data[4] as usize) << 8) | (data[5] as usize);
    let declared = ((data[6] as usize) << 8) | (data[7] as usize);
    // bytes 8-9: data id, unused

    let available = data.len() - HEADER_LEN;
    if declared != available {
        return Err(ChunkError::LengthMismatch {
            declared,
            available,
        });
    }

    Ok(Chunk {
        sequence,
        end_of_frame: flags & FLAG_END_OF_FRAME != 0,
        offset,
        payload: &data[HEADER_LEN..HEADER_LEN + declared],
    })
}

// ── Tests ──────────────────────────────────────────────────────────
