//! Rectangular grid built from a jagged raster matrix.

use serde::Serialize;

use crate::error::ScanError;
use crate::raster::RasterMatrix;

/// Row-major `rows x cols` grid with a parallel validity mask. Padded cells
/// hold `0.0` and are invalid. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedGrid {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
    mask: Vec<bool>,
}

impl NormalizedGrid {
    /// Pad every row to the longest one, left aligned at column 0.
    pub fn normalize(matrix: &RasterMatrix) -> Result<Self, ScanError> {
        Self::from_rows(matrix.rows())
    }

    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, ScanError> {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        if cols == 0 {
            return Err(ScanError::EmptyScan);
        }
        let n = rows.len() * cols;
        let mut values = Vec::with_capacity(n);
        let mut mask = Vec::with_capacity(n);
        for row in rows {
            values.extend_from_slice(row);
            mask.extend(std::iter::repeat_n(true, row.len()));
            let pad = cols - row.len();
            values.extend(std::iter::repeat_n(0.0, pad));
            mask.extend(std::iter::repeat_n(false, pad));
        }
        let grid = Self {
            rows: rows.len(),
            cols,
            values,
            mask,
        };
        tracing::debug!(
            rows = grid.rows,
            cols = grid.cols,
            invalid = grid.invalid_count(),
            "grid normalized"
        );
        Ok(grid)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Value at `(row, col)` when the cell holds a real sample.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        let i = self.index(row, col)?;
        self.mask[i].then(|| self.values[i])
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.index(row, col).is_some_and(|i| self.mask[i])
    }

    /// Raw values including padding, row-major.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn invalid_count(&self) -> usize {
        self.mask.iter().filter(|v| !**v).count()
    }

    /// Min and max over valid cells.
    pub fn valid_range(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .zip(&self.mask)
            .filter(|(_, ok)| **ok)
            .map(|(v, _)| *v)
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Valid rows back as a jagged matrix. Inverse of `normalize` for
    /// left-aligned input.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.values
            .chunks(self.cols)
            .zip(self.mask.chunks(self.cols))
            .map(|(vals, ok)| {
                vals.iter()
                    .zip(ok)
                    .filter(|(_, ok)| **ok)
                    .map(|(v, _)| *v)
                    .collect()
            })
            .collect()
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }
}
