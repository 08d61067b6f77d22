//! This module contains the ELL row reshaper.
//!
//! Each row of `d` nonzeros is split into `ceil(d / col_size)` sub-rows of exactly
//! `col_size` columns, the last one zero-padded. This is a pure index transform;
//! the companion `value_repack` module moves the associated values to match.

use ndarray::{Array1, Array2};

use crate::error::TesseraError;
use crate::kernels::slot_stream::{to_index, PAD_COL};
use crate::types::CsrMatrix;

#[derive(Debug, Clone, PartialEq)]
pub struct EllReshaped {
    pub col_size: usize,
    /// Original row id of every sub-row, shape `[sub_rows]`.
    pub row_indices: Array1<i32>,
    /// Shape `[sub_rows, col_size]`.
    pub col_indices: Array2<i32>,
    /// Padding slots added to each original row, shape `[nv]`.
    pub row_padding_num: Array1<i32>,
}

impl EllReshaped {
    pub fn num_sub_rows(&self) -> usize {
        self.row_indices.len()
    }
}

/// Number of `col_size`-wide sub-rows needed to hold every row of `indptr`.
pub(crate) fn count_sub_rows(indptr: &[i32], col_size: usize) -> usize {
    indptr
        .windows(2)
        .map(|w| ((w[1] - w[0]) as usize).div_ceil(col_size))
        .sum()
}

/// Splits every row of a CSR structure into fixed-width sub-rows.
///
/// `nv` and `ne` are the caller's row and nonzero counts and must agree with
/// `indptr` and `indices`.
///
/// # Errors
/// Returns `InvalidArgument` if `col_size` is zero, the counts disagree with the
/// arrays, or the CSR structure is malformed.
pub fn ell_row_reshape(
    nv: usize,
    ne: usize,
    col_size: usize,
    indptr: &[i32],
    indices: &[i32],
) -> Result<EllReshaped, TesseraError> {
    if col_size == 0 {
        return Err(TesseraError::InvalidArgument(
            "col_size must be positive".to_string(),
        ));
    }
    let expected_ptrs = nv.checked_add(1).ok_or_else(|| {
        TesseraError::InvalidArgument(format!("row count {} is out of range", nv))
    })?;
    if indptr.len() != expected_ptrs || indices.len() != ne {
        return Err(TesseraError::InvalidArgument(format!(
            "expected {} row pointers and {} indices, got {} and {}",
            expected_ptrs,
            ne,
            indptr.len(),
            indices.len()
        )));
    }
    let csr = CsrMatrix::from_indptr(indptr, indices)?;

    let sub_rows = count_sub_rows(indptr, col_size);
    let mut row_indices = Vec::with_capacity(sub_rows);
    let mut col_indices = Vec::with_capacity(sub_rows * col_size);
    let mut row_padding_num = Vec::with_capacity(nv);

    for i in 0..nv {
        let row = csr.row(i);
        let pieces = row.len().div_ceil(col_size);
        let padding = pieces * col_size - row.len();
        row_indices.extend(std::iter::repeat(to_index(i, "row id")?).take(pieces));
        col_indices.extend_from_slice(row);
        col_indices.extend(std::iter::repeat(PAD_COL).take(padding));
        row_padding_num.push(to_index(padding, "row padding")?);
    }

    log::debug!(
        "ell_row_reshape: {} rows, {} nnz -> {} sub-rows of {}",
        nv,
        ne,
        sub_rows,
        col_size
    );

    Ok(EllReshaped {
        col_size,
        row_indices: Array1::from_vec(row_indices),
        col_indices: Array2::from_shape_vec((sub_rows, col_size), col_indices)?,
        row_padding_num: Array1::from_vec(row_padding_num),
    })
}
