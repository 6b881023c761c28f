//! Shared-memory frame output: the hand-off point to the FPP daemon.
//!
//! FPP reads each overlay model's pixel data from a plain file in
//! `/dev/shm`, sized `width * height * 3` bytes, row-major RGB8. There is
//! no header, no sequence number, and no locking — size and naming are the
//! entire contract. The daemon may therefore observe a torn frame (part
//! old, part new) while we write; for a display refreshing many times a
//! second that single-frame glitch is imperceptible, and tightening it
//! (generation counter, double buffering) would change the contract FPP
//! expects. This limitation is accepted, not hidden.
//!
//! Publishing is best effort: if the region cannot be opened or flushed the
//! error goes back to the caller, the mapping is dropped, and the next
//! completed frame retries from scratch — the receive loop never stops.

use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How the shared region was obtained when the mapping was (re)opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionInit {
    /// The region file already existed at the expected size.
    Existing,
    /// The region file was created (or resized) and zero-filled.
    Created,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot open shared region {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot flush shared region {path}: {source}")]
    Flush {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("frame is {got} bytes, shared region holds {expected}")]
    SizeMismatch { got: usize, expected: usize },
}

/// Writer for one overlay model's shared-memory region.
pub struct FrameOutput {
    path: PathBuf,
    size: usize,
    map: Option<MmapMut>,
}

impl FrameOutput {
    /// Create a writer for `path`. No I/O happens here; call
    /// [`FrameOutput::open`] to establish the mapping eagerly, or let the
    /// first [`FrameOutput::publish`] do it.
    pub fn new(path: impl Into<PathBuf>, size: usize) -> Self {
        Self {
            path: path.into(),
            size,
            map: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the region file exists at exactly the expected size and map
    /// it. Reports whether the file was reused or had to be created.
    /// Idempotent once mapped.
    pub fn open(&mut self) -> Result<RegionInit, OutputError> {
        if self.map.is_some() {
            return Ok(RegionInit::Existing);
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| self.open_err(e))?;
        let len = file.metadata().map_err(|e| self.open_err(e))?.len();

        let init = if len == self.size as u64 {
            RegionInit::Existing
        } else {
            // Absent or wrong size: fix the length. New bytes read as zero.
            file.set_len(self.size as u64)
                .map_err(|e| self.open_err(e))?;
            RegionInit::Created
        };

        // Safety: the file is sized above, the mapping outlives the fd,
        // and the only other accessor (the FPP daemon) just reads.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| self.open_err(e))?;
        self.map = Some(map);
        Ok(init)
    }

    fn open_err(&self, source: std::io::Error) -> OutputError {
        OutputError::Open {
            path: self.path.clone(),
            source,
        }
    }

    /// Write one full frame at offset 0 and flush it for the external
    /// reader. Returns the elapsed write time for diagnostics.
    ///
    /// On failure the mapping is dropped so the next publish retries the
    /// whole open path.
    pub fn publish(&mut self, frame: &[u8]) -> Result<Duration, OutputError> {
        if frame.len() != self.size {
            return Err(OutputError::SizeMismatch {
                got: frame.len(),
                expected: self.size,
            });
        }

        self.open()?;
        let start = Instant::now();

        // Unwrap is fine: open() just succeeded.
        let map = self.map.as_mut().expect("mapping present after open");
        map.copy_from_slice(frame);

        if let Err(source) = map.flush() {
            self.map = None;
            return Err(OutputError::Flush {
                path: self.path.clone(),
                source,
            });
        }

        Ok(start.elapsed())
    }

    /// Zero-fill the region (blank the wall). Used at shutdown.
    pub fn clear(&mut self) -> Result<(), OutputError> {
        let zeros = vec![0u8; self.size];
        self.publish(&zeros).map(|_| ())
    }

    /// Release the mapping and underlying handle. Idempotent.
    pub fn close(&mut self) {
        self.map = None;
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn region_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("FPP-Model-Data-Test")
    }

    #[test]
    fn open_creates_a_zero_filled_region_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = region_path(&dir);

        let mut out = FrameOutput::new(&path, 12);
        assert_eq!(out.open().unwrap(), RegionInit::Created);
        assert_eq!(fs::read(&path).unwrap(), vec![0u8; 12]);
    }

    #[test]
    fn open_reuses_an_existing_region_of_the_right_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = region_path(&dir);
        fs::write(&path, vec![7u8; 12]).unwrap();

        let mut out = FrameOutput::new(&path, 12);
        assert_eq!(out.open().unwrap(), RegionInit::Existing);
        // Reuse does not clobber whatever the region held.
        assert_eq!(fs::read(&path).unwrap(), vec![7u8; 12]);
    }

    #[test]
    fn open_resizes_a_wrong_sized_region() {
        let dir = tempfile::tempdir().unwrap();
        let path = region_path(&dir);
        fs::write(&path, vec![7u8; 5]).unwrap();

        let mut out = FrameOutput::new(&path, 12);
        assert_eq!(out.open().unwrap(), RegionInit::Created);
        assert_eq!(fs::metadata(&path).unwrap().len(), 12);
    }

    #[test]
    fn publish_writes_the_frame_and_reports_elapsed_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = region_path(&dir);

        let mut out = FrameOutput::new(&path, 12);
        let frame: Vec<u8> = (1..=12).collect();
        let elapsed = out.publish(&frame).unwrap();

        assert_eq!(fs::read(&path).unwrap(), frame);
        assert!(elapsed <= Duration::from_secs(1));
    }

    #[test]
    fn publish_overwrites_the_previous_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = FrameOutput::new(region_path(&dir), 6);

        out.publish(&[1, 2, 3, 4, 5, 6]).unwrap();
        out.publish(&[9, 9, 9, 9, 9, 9]).unwrap();
        assert_eq!(fs::read(out.path()).unwrap(), vec![9u8; 6]);
    }

    #[test]
    fn publish_rejects_a_wrong_sized_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = FrameOutput::new(region_path(&dir), 12);

        let err = out.publish(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            OutputError::SizeMismatch {
                got: 3,
                expected: 12
            }
        ));
    }

    #[test]
    fn publish_reports_open_failure_and_can_retry() {
        let dir = tempfile::tempdir().unwrap();
        let missing_parent = dir.path().join("gone").join("region");

        let mut out = FrameOutput::new(&missing_parent, 3);
        assert!(matches!(
            out.publish(&[1, 2, 3]),
            Err(OutputError::Open { .. })
        ));

        // Once the parent appears, the next publish succeeds on its own.
        fs::create_dir(dir.path().join("gone")).unwrap();
        out.publish(&[1, 2, 3]).unwrap();
        assert_eq!(fs::read(&missing_parent).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn clear_blanks_the_region() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = FrameOutput::new(region_path(&dir), 6);

        out.publish(&[5, 5, 5, 5, 5, 5]).unwrap();
        out.clear().unwrap();
        assert_eq!(fs::read(out.path()).unwrap(), vec![0u8; 6]);
    }

    #[test]
    fn close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = FrameOutput::new(region_path(&dir), 3);
        out.publish(&[1, 2, 3]).unwrap();

        out.close();
        out.close();

        // Publishing after close reopens the region.
        out.publish(&[4, 5, 6]).unwrap();
        assert_eq!(fs::read(out.path()).unwrap(), vec![4, 5, 6]);
    }
}
