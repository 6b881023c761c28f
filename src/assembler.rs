//! Frame assembly: accumulates DDP chunks into complete frames.
//!
//! Chunks may arrive in any order and any size. A chunk at offset 0 marks
//! the start of a new frame and silently abandons whatever was in progress;
//! a frame is complete only when a chunk flagged end-of-frame arrives while
//! the high-water mark has reached the frame size. There is no timeout: a
//! frame that never sees its end marker just waits to be superseded by the
//! next offset-0 chunk.
//!
//! Completeness is tracked by high-water mark, not a coverage bitmap: once
//! some chunk has reached the end of the frame, interior gaps are invisible
//! and keep whatever bytes the buffer held. Producers send contiguous
//! ascending chunks in practice, so this matches the wire behavior they
//! expect.

use crate::protocol::Chunk;
use std::time::Instant;

/// A fully assembled frame, yielded by copy so assembly of the next frame
/// can proceed while the caller publishes this one.
#[derive(Debug)]
pub struct CompletedFrame {
    /// Row-major RGB8 bytes, exactly the configured frame size.
    pub bytes: Vec<u8>,
    /// Number of chunks that contributed to this frame.
    pub chunk_count: u32,
    /// When the frame's first chunk (offset 0) arrived.
    pub started_at: Instant,
}

/// Reassembles one frame at a time from incoming chunks.
pub struct FrameAssembler {
    frame_size: usize,
    buf: Vec<u8>,
    /// Highest `offset + len` seen since the last frame start.
    high_water: usize,
    chunk_count: u32,
    started_at: Instant,
}

impl FrameAssembler {
    pub fn new(frame_size: usize) -> Self {
        Self {
            frame_size,
            buf: vec![0u8; frame_size],
            high_water: 0,
            chunk_count: 0,
            started_at: Instant::now(),
        }
    }

    /// Bytes covered so far for the in-progress frame.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// Feed one chunk; returns the completed frame when this chunk finishes
    /// one.
    ///
    /// An offset-0 chunk always restarts assembly, even mid-frame, so
    /// duplicated or out-of-order frame starts self-heal instead of
    /// accumulating stale state. A chunk whose range exceeds the frame size
    /// is a no-op.
    pub fn ingest(&mut self, chunk: &Chunk<'_>) -> Option<CompletedFrame> {
        if chunk.offset == 0 {
            self.high_water = 0;
            self.chunk_count = 0;
            self.started_at = Instant::now();
        }

        let end = chunk.offset + chunk.payload.len();
        if end > self.frame_size {
            return None;
        }

        self.buf[chunk.offset..end].copy_from_slice(chunk.payload);
        self.high_water = self.high_water.max(end);
        self.chunk_count += 1;

        if chunk.end_of_frame && self.high_water == self.frame_size {
            let frame = CompletedFrame {
                bytes: self.buf.clone(),
                chunk_count: self.chunk_count,
                started_at: self.started_at,
            };
            self.high_water = 0;
            self.chunk_count = 0;
            return Some(frame);
        }

        None
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunk(offset: usize, payload: &[u8], end_of_frame: bool) -> Chunk<'_> {
        Chunk {
            sequence: 0,
            end_of_frame,
            offset,
            payload,
        }
    }

    #[test]
    fn two_chunks_in_order_complete_a_frame() {
        // 4x1 matrix: 12-byte frame in two 6-byte chunks.
        let mut asm = FrameAssembler::new(12);

        assert!(asm.ingest(&chunk(0, &[1, 2, 3, 4, 5, 6], false)).is_none());
        let frame = asm
            .ingest(&chunk(6, &[7, 8, 9, 10, 11, 12], true))
            .expect("frame should complete");

        assert_eq!(frame.bytes, (1..=12).collect::<Vec<u8>>());
        assert_eq!(frame.chunk_count, 2);
        assert_eq!(asm.high_water(), 0);
    }

    #[test]
    fn assembly_is_order_independent() {
        let payload: Vec<u8> = (0..24).collect();

        let mut in_order = FrameAssembler::new(24);
        in_order.ingest(&chunk(0, &payload[0..6], false));
        in_order.ingest(&chunk(6, &payload[6..12], false));
        in_order.ingest(&chunk(12, &payload[12..18], false));
        let a = in_order.ingest(&chunk(18, &payload[18..24], true)).unwrap();

        // Same chunks, interior pair swapped; the end-of-frame chunk still
        // arrives once everything else is in place.
        let mut shuffled = FrameAssembler::new(24);
        shuffled.ingest(&chunk(0, &payload[0..6], false));
        shuffled.ingest(&chunk(12, &payload[12..18], false));
        shuffled.ingest(&chunk(6, &payload[6..12], false));
        let b = shuffled.ingest(&chunk(18, &payload[18..24], true)).unwrap();

        assert_eq!(a.bytes, payload);
        assert_eq!(b.bytes, payload);
    }

    #[test]
    fn eof_below_frame_end_does_not_complete() {
        let mut asm = FrameAssembler::new(12);
        asm.ingest(&chunk(0, &[1, 2, 3, 4], false));
        // End-of-frame flagged, but the high-water mark is still short of
        // the frame size.
        assert!(asm.ingest(&chunk(4, &[5, 6, 7, 8], true)).is_none());
        assert_eq!(asm.high_water(), 8);

        // A later end-of-frame chunk that reaches the frame end completes.
        let frame = asm.ingest(&chunk(8, &[9, 10, 11, 12], true)).unwrap();
        assert_eq!(frame.bytes, (1..=12).collect::<Vec<u8>>());
    }

    #[test]
    fn offset_zero_mid_assembly_discards_previous_bytes() {
        let mut asm = FrameAssembler::new(6);

        // A: partial frame start.
        asm.ingest(&chunk(0, &[9, 9, 9], false));
        // B: end-of-frame, but the frame is not complete (high water 5 < 6).
        assert!(asm.ingest(&chunk(3, &[8, 8], true)).is_none());

        // C: a fresh, complete frame in one chunk — exactly C, no A/B mix.
        let frame = asm
            .ingest(&chunk(0, &[1, 2, 3, 4, 5, 6], true))
            .expect("restart chunk covers the whole frame");
        assert_eq!(frame.bytes, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(frame.chunk_count, 1);
    }

    #[test]
    fn out_of_bounds_chunk_is_a_no_op() {
        let mut asm = FrameAssembler::new(12);
        asm.ingest(&chunk(0, &[1, 2, 3, 4, 5, 6], false));
        let before = asm.high_water();

        assert!(asm.ingest(&chunk(8, &[1, 2, 3, 4, 5, 6], true)).is_none());
        assert_eq!(asm.high_water(), before);
        assert_eq!(asm.chunk_count(), 1);
    }

    #[test]
    fn oversized_restart_chunk_still_resets_counters() {
        let mut asm = FrameAssembler::new(4);
        asm.ingest(&chunk(0, &[1, 2], false));

        // Offset 0 but too long: the restart happens, the write does not.
        assert!(asm.ingest(&chunk(0, &[1, 2, 3, 4, 5], true)).is_none());
        assert_eq!(asm.high_water(), 0);
        assert_eq!(asm.chunk_count(), 0);
    }

    #[test]
    fn duplicate_chunks_do_not_corrupt_the_frame() {
        let mut asm = FrameAssembler::new(6);
        asm.ingest(&chunk(0, &[1, 2, 3], false));
        asm.ingest(&chunk(3, &[4, 5, 6], false));
        let frame = asm.ingest(&chunk(3, &[4, 5, 6], true)).unwrap();
        assert_eq!(frame.bytes, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn assembler_is_reusable_across_frames() {
        let mut asm = FrameAssembler::new(3);
        let first = asm.ingest(&chunk(0, &[1, 2, 3], true)).unwrap();
        let second = asm.ingest(&chunk(0, &[4, 5, 6], true)).unwrap();
        assert_eq!(first.bytes, vec![1, 2, 3]);
        assert_eq!(second.bytes, vec![4, 5, 6]);
    }
}
