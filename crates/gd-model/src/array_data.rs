//! Sparse Jacobian accumulator.

use nalgebra::DMatrix;

/// Triplet list of `(row, col, value)` Jacobian contributions.
///
/// Duplicate coordinates are allowed while assembling; [`ArrayData::compact`]
/// sums them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayData {
    entries: Vec<(usize, usize, f64)>,
}

impl ArrayData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn assign(&mut self, row: usize, col: usize, value: f64) {
        self.entries.push((row, col, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &(usize, usize, f64)> {
        self.entries.iter()
    }

    /// Sum duplicates and sort by row, then column.
    pub fn compact(&mut self) {
        self.entries.sort_by_key(|&(r, c, _)| (r, c));
        let mut merged: Vec<(usize, usize, f64)> = Vec::with_capacity(self.entries.len());
        for &(r, c, v) in &self.entries {
            match merged.last_mut() {
                Some(last) if last.0 == r && last.1 == c => last.2 += v,
                _ => merged.push((r, c, v)),
            }
        }
        self.entries = merged;
    }

    /// Sum of every contribution at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.entries
            .iter()
            .filter(|&&(r, c, _)| r == row && c == col)
            .map(|&(_, _, v)| v)
            .sum()
    }

    /// Move every entry of row `from` to row `to`.
    pub fn translate_row(&mut self, from: usize, to: usize) {
        for entry in self.entries.iter_mut().filter(|e| e.0 == from) {
            entry.0 = to;
        }
    }

    /// Shift every row index by `by`, e.g. when a sub-assembly is placed.
    pub fn translate_rows(&mut self, by: usize) {
        for entry in &mut self.entries {
            entry.0 += by;
        }
    }

    pub fn max_row(&self) -> Option<usize> {
        self.entries.iter().map(|e| e.0).max()
    }

    pub fn max_col(&self) -> Option<usize> {
        self.entries.iter().map(|e| e.1).max()
    }

    /// Dense copy; entries outside `rows x cols` are ignored.
    pub fn to_dense(&self, rows: usize, cols: usize) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(rows, cols);
        for &(r, c, v) in &self.entries {
            if r < rows && c < cols {
                m[(r, c)] += v;
            }
        }
        m
    }
}
