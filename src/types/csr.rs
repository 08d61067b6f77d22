//! Validated, borrowed views over compressed sparse index structures.
//!
//! The kernels index their inputs directly, so every structural property they
//! rely on (pointer monotonicity, pointer/index length agreement, column range)
//! is checked once here. After construction, every `row()` slice access is in
//! bounds by construction.

use std::ops::Range;

use crate::error::TesseraError;

//==================================================================================
// 1. Validation Helpers
//==================================================================================

/// Checks that `indptr` is a well-formed pointer array of `expected_len` entries
/// spanning exactly `nnz` elements.
fn validate_indptr(
    name: &str,
    indptr: &[i32],
    expected_len: usize,
    nnz: usize,
) -> Result<(), TesseraError> {
    if indptr.len() != expected_len {
        return Err(TesseraError::InvalidArgument(format!(
            "{} has {} entries, expected {}",
            name,
            indptr.len(),
            expected_len
        )));
    }
    if indptr[0] != 0 {
        return Err(TesseraError::InvalidArgument(format!(
            "{} must start at 0, got {}",
            name, indptr[0]
        )));
    }
    if let Some(pos) = indptr.windows(2).position(|w| w[0] > w[1]) {
        return Err(TesseraError::InvalidArgument(format!(
            "{} is not monotonically nondecreasing at position {} ({} > {})",
            name,
            pos,
            indptr[pos],
            indptr[pos + 1]
        )));
    }
    let last = indptr[expected_len - 1] as usize;
    if last != nnz {
        return Err(TesseraError::InvalidArgument(format!(
            "{} ends at {} but the index array holds {} entries",
            name, last, nnz
        )));
    }
    Ok(())
}

/// Checks every index lies in `[0, upper)`.
fn validate_index_range(name: &str, indices: &[i32], upper: usize) -> Result<(), TesseraError> {
    if let Some(&bad) = indices.iter().find(|&&v| v < 0 || v as usize >= upper) {
        return Err(TesseraError::InvalidArgument(format!(
            "{} contains {} outside of [0, {})",
            name, bad, upper
        )));
    }
    Ok(())
}

//==================================================================================
// 2. CsrMatrix
//==================================================================================

/// A validated Compressed Sparse Row index structure.
#[derive(Debug, Clone, Copy)]
pub struct CsrMatrix<'a> {
    num_rows: usize,
    num_cols: usize,
    indptr: &'a [i32],
    indices: &'a [i32],
}

impl<'a> CsrMatrix<'a> {
    /// Validates and wraps a CSR structure with a known column count.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `indptr` is not `num_rows + 1` monotonically
    /// nondecreasing entries starting at 0 and ending at `indices.len()`, or if any
    /// column id falls outside `[0, num_cols)`.
    pub fn new(
        num_rows: usize,
        num_cols: usize,
        indptr: &'a [i32],
        indices: &'a [i32],
    ) -> Result<Self, TesseraError> {
        let expected_len = num_rows.checked_add(1).ok_or_else(|| {
            TesseraError::InvalidArgument(format!("row count {} is out of range", num_rows))
        })?;
        validate_indptr("indptr", indptr, expected_len, indices.len())?;
        validate_index_range("indices", indices, num_cols)?;
        Ok(Self {
            num_rows,
            num_cols,
            indptr,
            indices,
        })
    }

    /// Wraps a CSR structure whose column count is not supplied by the caller.
    /// The row count is taken from `indptr` and the column count is inferred as
    /// one past the largest column id.
    pub fn from_indptr(indptr: &'a [i32], indices: &'a [i32]) -> Result<Self, TesseraError> {
        if indptr.is_empty() {
            return Err(TesseraError::InvalidArgument(
                "indptr must hold at least one entry".to_string(),
            ));
        }
        let num_cols = indices
            .iter()
            .copied()
            .max()
            .map_or(0, |m| (m as i64 + 1).max(0) as usize);
        Self::new(indptr.len() - 1, num_cols, indptr, indices)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn indptr(&self) -> &'a [i32] {
        self.indptr
    }

    pub fn indices(&self) -> &'a [i32] {
        self.indices
    }

    /// The position range of row `i` within `indices`.
    pub fn row_range(&self, i: usize) -> Range<usize> {
        self.indptr[i] as usize..self.indptr[i + 1] as usize
    }

    /// The column ids of row `i`, in storage order.
    pub fn row(&self, i: usize) -> &'a [i32] {
        &self.indices[self.row_range(i)]
    }

    pub fn degree(&self, i: usize) -> usize {
        (self.indptr[i + 1] - self.indptr[i]) as usize
    }
}

//==================================================================================
// 3. CsfRelations
//==================================================================================

/// A validated two-level compressed structure: relation -> active rows -> columns.
///
/// Level 1 is indexed by level-0 *position*: the columns of the `k`-th entry of
/// `indices0` are `indices1[indptr1[k]..indptr1[k + 1]]`.
#[derive(Debug, Clone, Copy)]
pub struct CsfRelations<'a> {
    indptr0: &'a [i32],
    indices0: &'a [i32],
    indptr1: &'a [i32],
    indices1: &'a [i32],
}

impl<'a> CsfRelations<'a> {
    /// # Errors
    /// Returns `InvalidArgument` unless both levels are well-formed pointer/index
    /// pairs and all row and column ids are nonnegative.
    pub fn new(
        indptr0: &'a [i32],
        indices0: &'a [i32],
        indptr1: &'a [i32],
        indices1: &'a [i32],
    ) -> Result<Self, TesseraError> {
        if indptr0.is_empty() {
            return Err(TesseraError::InvalidArgument(
                "indptr0 must hold at least one entry".to_string(),
            ));
        }
        validate_indptr("indptr0", indptr0, indptr0.len(), indices0.len())?;
        validate_indptr("indptr1", indptr1, indices0.len() + 1, indices1.len())?;
        validate_index_range("indices0", indices0, u32::MAX as usize)?;
        validate_index_range("indices1", indices1, u32::MAX as usize)?;
        Ok(Self {
            indptr0,
            indices0,
            indptr1,
            indices1,
        })
    }

    pub fn num_rels(&self) -> usize {
        self.indptr0.len() - 1
    }

    /// Total number of nonzero columns across all relations.
    pub fn nnz(&self) -> usize {
        self.indices1.len()
    }

    /// Iterates the active rows of relation `rel` as `(row_id, columns)`.
    pub fn rows_of(&self, rel: usize) -> impl Iterator<Item = (i32, &'a [i32])> + 'a {
        let indptr1 = self.indptr1;
        let indices0 = self.indices0;
        let indices1 = self.indices1;
        let positions = self.indptr0[rel] as usize..self.indptr0[rel + 1] as usize;
        positions.map(move |k| {
            let cols = &indices1[indptr1[k] as usize..indptr1[k + 1] as usize];
            (indices0[k], cols)
        })
    }
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
