//! This module contains the ELL value repacker, the companion of `ell_reshape`.
//!
//! Value buffers hold `nnz x feature_width` opaque records laid out in CSR order.
//! Repacking copies each original row's contiguous record span into the
//! zero-initialised region of its padded sub-rows, so that values line up with
//! the reshaped column indices. Records are moved as raw bytes and never
//! interpreted.

use crate::error::TesseraError;
use crate::kernels::ell_reshape::count_sub_rows;
use crate::types::{CsrMatrix, TesseraDataType, ValueBuffer};

/// Re-lays-out value buffers to match an `nnz_col`-wide row reshaping.
///
/// The output buffers hold `row_num * nnz_col * feature_width` elements each.
/// When `nnz_col == 1` no reshaping is needed and the inputs are returned as-is.
///
/// # Errors
/// Returns `InvalidArgument` if
/// * `feature_widths` and `values` differ in length, or `nnz_col` is zero,
/// * a buffer's element type differs from `dtype`,
/// * a buffer does not hold exactly `nnz * feature_width` elements,
/// * the padded sub-row count exceeds `row_num`.
pub fn ell_value_repack(
    row_num: usize,
    nnz_col: usize,
    dtype: TesseraDataType,
    feature_widths: &[usize],
    indptr: &[i32],
    values: &[ValueBuffer],
) -> Result<Vec<ValueBuffer>, TesseraError> {
    if nnz_col == 0 {
        return Err(TesseraError::InvalidArgument(
            "nnz_col must be positive".to_string(),
        ));
    }
    if feature_widths.len() != values.len() {
        return Err(TesseraError::InvalidArgument(format!(
            "{} feature widths supplied for {} value buffers",
            feature_widths.len(),
            values.len()
        )));
    }
    for (k, buf) in values.iter().enumerate() {
        if buf.dtype != dtype {
            return Err(TesseraError::InvalidArgument(format!(
                "value buffer {} holds {} ({}-byte) elements, expected {} ({}-byte)",
                k,
                buf.dtype,
                buf.dtype.byte_width(),
                dtype,
                dtype.byte_width()
            )));
        }
    }

    if nnz_col == 1 {
        return Ok(values.to_vec());
    }

    // Only the row structure is needed; columns are irrelevant here.
    let nnz = indptr.last().copied().unwrap_or(0).max(0) as usize;
    let placeholder = vec![0i32; nnz];
    let csr = CsrMatrix::from_indptr(indptr, &placeholder)?;

    let padded_rows = count_sub_rows(indptr, nnz_col);
    if padded_rows > row_num {
        return Err(TesseraError::InvalidArgument(format!(
            "reshaping needs {} padded rows but row_num is {}",
            padded_rows, row_num
        )));
    }

    let elem = dtype.byte_width();
    let mut out = Vec::with_capacity(values.len());
    for (buf, &feat) in values.iter().zip(feature_widths) {
        let record = feat * elem;
        if buf.bytes.len() != nnz * record {
            return Err(TesseraError::InvalidArgument(format!(
                "value buffer holds {} bytes, expected {} ({} nnz x {} features x {} bytes)",
                buf.bytes.len(),
                nnz * record,
                nnz,
                feat,
                elem
            )));
        }

        let mut packed = ValueBuffer::zeroed(dtype, row_num * nnz_col * feat);
        let mut sub_row = 0usize;
        for i in 0..csr.num_rows() {
            let span = csr.row_range(i);
            let degree = span.len();
            let src = &buf.bytes[span.start * record..span.end * record];
            let dst_start = sub_row * nnz_col * record;
            packed.bytes[dst_start..dst_start + src.len()].copy_from_slice(src);
            sub_row += degree.div_ceil(nnz_col);
        }
        out.push(packed);
    }

    log::debug!(
        "ell_value_repack: {} buffers, {} padded rows of {} (row_num {})",
        out.len(),
        padded_rows,
        nnz_col,
        row_num
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repack_matches_reshape_layout() {
        // indptr [0, 3, 4] with col width 2: row 0 -> 2 sub-rows, row 1 -> 1 sub-row.
        let values = ValueBuffer::from_slice(TesseraDataType::Float32, &[1.0f32, 2.0, 3.0, 4.0]);
        let out = ell_value_repack(3, 2, TesseraDataType::Float32, &[1], &[0, 3, 4], &[values])
            .unwrap();
        assert_eq!(
            out[0].to_vec::<f32>().unwrap(),
            vec![1.0, 2.0, 3.0, 0.0, 4.0, 0.0]
        );
    }

    #[test]
    fn test_repack_with_feature_width() {
        let values =
            ValueBuffer::from_slice(TesseraDataType::Int64, &[10i64, 11, 20, 21, 30, 31]);
        let out =
            ell_value_repack(2, 2, TesseraDataType::Int64, &[2], &[0, 1, 3], &[values]).unwrap();
        assert_eq!(
            out[0].to_vec::<i64>().unwrap(),
            vec![10, 11, 0, 0, 20, 21, 30, 31]
        );
    }

    #[test]
    fn test_extra_rows_stay_zero() {
        let values = ValueBuffer::from_slice(TesseraDataType::Int32, &[7i32]);
        let out =
            ell_value_repack(3, 2, TesseraDataType::Int32, &[1], &[0, 1], &[values]).unwrap();
        assert_eq!(out[0].to_vec::<i32>().unwrap(), vec![7, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_nnz_col_one_returns_inputs() {
        let values = ValueBuffer::from_slice(TesseraDataType::Float32, &[1.0f32, 2.0]);
        let out = ell_value_repack(
            2,
            1,
            TesseraDataType::Float32,
            &[1],
            &[0, 1, 2],
            std::slice::from_ref(&values),
        )
        .unwrap();
        assert_eq!(out, vec![values]);
    }

    #[test]
    fn test_dtype_mismatch_rejected() {
        let values = ValueBuffer::from_slice(TesseraDataType::Float64, &[1.0f64]);
        assert!(matches!(
            ell_value_repack(1, 2, TesseraDataType::Float32, &[1], &[0, 1], &[values]),
            Err(TesseraError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_row_num_overflow_rejected() {
        let values = ValueBuffer::from_slice(TesseraDataType::Float32, &[1.0f32, 2.0, 3.0]);
        let err = ell_value_repack(1, 2, TesseraDataType::Float32, &[1], &[0, 3], &[values])
            .unwrap_err();
        assert!(matches!(err, TesseraError::InvalidArgument(_)));
    }

    #[test]
    fn test_buffer_length_mismatch_rejected() {
        let values = ValueBuffer::from_slice(TesseraDataType::Float32, &[1.0f32]);
        assert!(ell_value_repack(2, 2, TesseraDataType::Float32, &[1], &[0, 2], &[values]).is_err());
    }
}
