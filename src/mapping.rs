//! Pixel mapping: logical (row, col) grid position → FPP linear pixel index.
//!
//! The wall's physical wiring does not have to match the logical grid, so
//! FPP is told which pixel each grid cell drives via a layout CSV. Each
//! non-empty cell holds the 1-based pixel index for that physical position;
//! blank cells are unmapped. The table is best effort: unparseable cells and
//! out-of-range indices are logged and skipped, and a missing layout file
//! degrades to a row-major identity mapping instead of failing hard.

use crate::MatrixConfig;
use std::fs;
use std::io;
use std::path::Path;

/// Where a pixel map's entries came from. Reported so startup logs show
/// whether the wall is running on a real layout or the identity fallback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapSource {
    /// Loaded from a layout CSV.
    LayoutFile { entries: usize, skipped: usize },
    /// Row-major identity mapping (no layout file available).
    Identity,
}

/// Immutable translation table from grid cells to linear pixel indices.
pub struct PixelMap {
    /// One slot per grid cell, row-major; `None` means unmapped.
    slots: Vec<Option<u32>>,
    config: MatrixConfig,
    source: MapSource,
}

impl PixelMap {
    /// Row-major identity mapping sized to the matrix.
    pub fn identity(config: MatrixConfig) -> Self {
        Self {
            slots: (0..config.pixel_count()).map(Some).collect(),
            config,
            source: MapSource::Identity,
        }
    }

    /// Load a layout CSV, falling back to the identity mapping if the file
    /// cannot be read. The chosen source is visible via [`PixelMap::source`].
    pub fn load(layout: Option<&Path>, config: MatrixConfig) -> Self {
        let Some(path) = layout else {
            return Self::identity(config);
        };

        match Self::from_layout_file(path, config) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(
                    "Could not read layout {}: {} — using identity mapping",
                    path.display(),
                    e
                );
                Self::identity(config)
            }
        }
    }

    /// Parse a layout CSV into a mapping table.
    ///
    /// Cells are 1-based pixel indices in the file, stored 0-based. Cells
    /// outside the matrix bounds, non-numeric cells, and indices outside
    /// `[0, pixel_count)` are skipped with a warning.
    pub fn from_layout_file(path: &Path, config: MatrixConfig) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_layout_str(&text, config))
    }

    fn from_layout_str(text: &str, config: MatrixConfig) -> Self {
        let mut slots = vec![None; config.pixel_count() as usize];
        let pixel_count = config.pixel_count() as i64;
        let mut entries = 0usize;
        let mut skipped = 0usize;

        for (row, line) in text.lines().enumerate() {
            for (col, cell) in line.split(',').enumerate() {
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }

                if row >= config.height as usize || col >= config.width as usize {
                    tracing::warn!("Layout cell ({}, {}) outside {}x{} matrix, skipping",
                        row, col, config.width, config.height);
                    skipped += 1;
                    continue;
                }

                // 1-based in the file, 0-based in the table.
                let index = match cell.parse::<i64>() {
                    Ok(n) => n - 1,
                    Err(_) => {
                        tracing::warn!("Invalid pixel index '{}' at ({}, {})", cell, row, col);
                        skipped += 1;
                        continue;
                    }
                };

                if index < 0 || index >= pixel_count {
                    tracing::warn!(
                        "Pixel index {} at ({}, {}) outside 0..{}, skipping",
                        index,
                        row,
                        col,
                        pixel_count
                    );
                    skipped += 1;
                    continue;
                }

                slots[row * config.width as usize + col] = Some(index as u32);
                entries += 1;
            }
        }

        Self {
            slots,
            config,
            source: MapSource::LayoutFile { entries, skipped },
        }
    }

    pub fn source(&self) -> &MapSource {
        &self.source
    }

    /// Number of mapped grid cells.
    pub fn mapped_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True for a full row-major identity table, where remapping is a
    /// straight copy.
    pub fn is_identity(&self) -> bool {
        self.slots
            .iter()
            .enumerate()
            .all(|(i, s)| *s == Some(i as u32))
    }

    /// Copy each mapped grid cell's RGB triple from `frame` into
    /// `pixel_index * 3` of `out`. Unmapped output slots keep their prior
    /// value. Both buffers are full frames (`width * height * 3` bytes).
    pub fn remap(&self, frame: &[u8], out: &mut [u8]) {
        debug_assert_eq!(frame.len(), self.config.frame_byte_count());
        debug_assert_eq!(out.len(), self.config.frame_byte_count());

        for (cell, slot) in self.slots.iter().enumerate() {
            if let Some(pixel) = slot {
                let src = cell * 3;
                let dst = *pixel as usize * 3;
                out[dst..dst + 3].copy_from_slice(&frame[src..src + 3]);
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
