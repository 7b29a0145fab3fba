//! Fixed pixel permutation maps for rectangular cameras.
//!
//! A camera built from square modules reads its pixels out module by
//! module. A [`PermutationMap`] records, for every cell of the output grid,
//! which flat readout index lands there.
//!
//! # ASTRI layout
//!
//! The ASTRI camera has 37 modules of 8x8 pixels (2368 readout values). The
//! 25 modules forming the inner 5x5 block mosaic make up a 40x40 grid; the
//! 12 border modules are dropped. Inside a block the module's pixel rows are
//! stacked bottom to top, so pixels 56..63 form the top row.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashSet;
use std::sync::OnceLock;

use ndarray::Array2;

use crate::error::{Error, Result};

/// Number of modules in the ASTRI camera.
pub const ASTRI_MODULE_COUNT: usize = 37;
/// Side of one ASTRI module, in pixels.
pub const ASTRI_MODULE_SIDE: usize = 8;
/// Pixels per ASTRI module.
pub const ASTRI_PIXELS_PER_MODULE: usize = ASTRI_MODULE_SIDE * ASTRI_MODULE_SIDE;
/// Length of a flat ASTRI readout image.
pub const ASTRI_PIXEL_COUNT: usize = ASTRI_MODULE_COUNT * ASTRI_PIXELS_PER_MODULE;
/// Side of the cropped ASTRI grid.
pub const ASTRI_GRID_SIDE: usize = 5 * ASTRI_MODULE_SIDE;

/// Module index occupying each 8x8 block of the ASTRI grid, top band first.
pub const ASTRI_MODULE_LAYOUT: [[usize; 5]; 5] = [
    [29, 30, 31, 32, 33],
    [23, 24, 25, 26, 27],
    [16, 17, 18, 19, 20],
    [9, 10, 11, 12, 13],
    [3, 4, 5, 6, 7],
];

static ASTRI_MAP: OnceLock<PermutationMap> = OnceLock::new();

/// Map from output grid cells to flat readout indices.
///
/// Every cell holds exactly one source index and no source index appears
/// twice. The map is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationMap {
    indices: Array2<usize>,
    source_len: usize,
}

impl PermutationMap {
    /// Creates a map from an explicit index grid.
    ///
    /// # Errors
    /// Returns `InvalidLayout` if an index is out of range or repeated.
    pub fn new(indices: Array2<usize>, source_len: usize) -> Result<Self> {
        let mut seen = HashSet::with_capacity(indices.len());
        for &index in &indices {
            if index >= source_len {
                return Err(Error::InvalidLayout(format!(
                    "source index {index} out of range for {source_len} pixels"
                )));
            }
            if !seen.insert(index) {
                return Err(Error::InvalidLayout(format!(
                    "source index {index} assigned to more than one cell"
                )));
            }
        }
        Ok(Self {
            indices,
            source_len,
        })
    }

    /// Builds a block-mosaic map from a module table.
    ///
    /// `layout[band][col]` is the module filling block (band, col). Each
    /// module contributes `module_side * module_side` consecutive readout
    /// indices, laid out row by row with the rows reversed.
    ///
    /// # Errors
    /// Returns `InvalidLayout` for empty or ragged tables, module indices
    /// outside `0..module_count`, or modules used twice.
    pub fn from_module_layout<R: AsRef<[usize]>>(
        layout: &[R],
        module_side: usize,
        module_count: usize,
    ) -> Result<Self> {
        let bands = layout.len();
        let cols = layout.first().map_or(0, |row| row.as_ref().len());
        if bands == 0 || cols == 0 || module_side == 0 {
            return Err(Error::InvalidLayout("empty module layout".to_string()));
        }
        if let Some(band) = layout.iter().position(|row| row.as_ref().len() != cols) {
            return Err(Error::InvalidLayout(format!(
                "band {band} does not have {cols} modules"
            )));
        }

        let pixels_per_module = module_side * module_side;
        let mut used = HashSet::with_capacity(bands * cols);
        let mut indices = Array2::zeros((bands * module_side, cols * module_side));

        for (band, row) in layout.iter().enumerate() {
            for (col, &module) in row.as_ref().iter().enumerate() {
                if module >= module_count {
                    return Err(Error::InvalidLayout(format!(
                        "module {module} out of range for {module_count} modules"
                    )));
                }
                if !used.insert(module) {
                    return Err(Error::InvalidLayout(format!(
                        "module {module} placed more than once"
                    )));
                }

                let base = module * pixels_per_module;
                for r in 0..module_side {
                    let source_row = module_side - 1 - r;
                    for c in 0..module_side {
                        indices[[band * module_side + r, col * module_side + c]] =
                            base + source_row * module_side + c;
                    }
                }
            }
        }

        Ok(Self {
            indices,
            source_len: module_count * pixels_per_module,
        })
    }

    /// Returns the shared ASTRI map, building it on first use.
    pub fn astri() -> &'static Self {
        ASTRI_MAP.get_or_init(|| {
            log::debug!("building ASTRI permutation map");
            Self::from_module_layout(&ASTRI_MODULE_LAYOUT, ASTRI_MODULE_SIDE, ASTRI_MODULE_COUNT)
                .unwrap_or_else(|err| unreachable!("ASTRI module layout is invalid: {err}"))
        })
    }

    /// Grid shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.indices.dim()
    }

    /// Number of output rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.indices.nrows()
    }

    /// Number of output columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.indices.ncols()
    }

    /// Required length of the flat input image.
    #[must_use]
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Source index mapped to a cell, if the cell exists.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<usize> {
        self.indices.get([row, col]).copied()
    }

    /// The full index grid.
    #[must_use]
    pub fn indices(&self) -> &Array2<usize> {
        &self.indices
    }

    /// Cell holding a source index, or `None` if the pixel is not mapped.
    #[must_use]
    pub fn position_of(&self, source_index: usize) -> Option<(usize, usize)> {
        self.indices
            .indexed_iter()
            .find(|(_, &index)| index == source_index)
            .map(|(pos, _)| pos)
    }

    /// Checks that a flat image has the expected length.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` otherwise.
    pub fn check_len(&self, len: usize) -> Result<()> {
        if len == self.source_len {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                expected: self.source_len,
                actual: len,
            })
        }
    }

    /// Reindexes a flat image into the output grid.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `image` is not `source_len()` long.
    pub fn apply<T: Copy>(&self, image: &[T]) -> Result<Array2<T>> {
        self.check_len(image.len())?;
        Ok(self.indices.map(|&index| image[index]))
    }
}
