// In: src/bridge/format.rs

//! Public-facing descriptions of produced layouts.

use serde::{Deserialize, Serialize};

/// Padding statistics for one converted layout, returned by `analyze`.
///
/// `capacity` counts every addressable column slot in the output (real or
/// padding); `nnz` counts the slots holding a real nonzero. For the condenser,
/// entries diverted into the DCSR remainder count toward both.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LayoutStats {
    pub format: String,
    pub nnz: usize,
    pub capacity: usize,
    pub padding_ratio: f64,
    /// Row slots (or groups, or sub-rows) produced per bucket.
    pub bucket_slots: Vec<usize>,
}

impl LayoutStats {
    pub(crate) fn new(format: &str, nnz: usize, capacity: usize, bucket_slots: Vec<usize>) -> Self {
        let padding_ratio = if capacity == 0 {
            0.0
        } else {
            (capacity - nnz) as f64 / capacity as f64
        };
        Self {
            format: format.to_string(),
            nnz,
            capacity,
            padding_ratio,
            bucket_slots,
        }
    }

    pub fn padding(&self) -> usize {
        self.capacity - self.nnz
    }
}

/// A single output array flattened to Arrow, with its logical shape.
#[derive(Debug, Clone)]
pub struct NamedArray {
    /// Dotted path such as `part0.bucket1.col_indices`.
    pub name: String,
    pub shape: Vec<usize>,
    pub array: arrow::array::ArrayRef,
}
