//! This module contains the column-partitioned hybrid ELL encoder.
//!
//! The column range `[0, num_cols)` is cut into `num_col_parts` contiguous slices
//! of `ceil(num_cols / num_col_parts)` columns. Each row is bucketed separately in
//! every slice by its slice-local degree, and its nonzeros are packed into
//! fixed-width slots of that bucket's width.
//!
//! Two serializations are offered: a nested `[partition][bucket]` layout, and a
//! flattened layout with one set of arrays per bucket spanning all partitions.

use ndarray::{Array1, Array2};

use crate::error::TesseraError;
use crate::kernels::bucket::{assign_bucket, validate_widths};
use crate::kernels::slot_stream::{to_index, PackedSlots, SlotStream};
use crate::types::CsrMatrix;

//==================================================================================
// 1. Output Types
//==================================================================================

/// The slots of one (partition, bucket) stream.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSlots {
    pub width: usize,
    /// One row id per slot, shape `[slots]`.
    pub row_indices: Array1<i32>,
    /// Shape `[slots, width]`.
    pub col_indices: Array2<i32>,
    /// Shape `[slots, width]`, 1 for a real nonzero, 0 for padding.
    pub mask: Array2<i32>,
}

impl BucketSlots {
    fn from_packed(packed: PackedSlots) -> Result<Self, TesseraError> {
        let slots = packed.num_slots();
        Ok(Self {
            width: packed.width,
            row_indices: Array1::from_vec(packed.row_indices),
            col_indices: Array2::from_shape_vec((slots, packed.width), packed.col_indices)?,
            mask: Array2::from_shape_vec((slots, packed.width), packed.mask)?,
        })
    }

    pub fn num_slots(&self) -> usize {
        self.row_indices.len()
    }
}

/// Nested encoding, indexed `parts[partition][bucket]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPartHyb {
    pub partition_size: usize,
    pub buckets: Vec<usize>,
    pub parts: Vec<Vec<BucketSlots>>,
}

/// One bucket of the flattened encoding, spanning every partition.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatBucket {
    pub width: usize,
    /// Partition id of every slot, shape `[nnz_row]`.
    pub tile_indices: Array1<i32>,
    /// Offset of each partition's first slot in `row_indices`, shape `[num_col_parts + 1]`.
    pub row_pos: Array1<i32>,
    pub row_indices: Array1<i32>,
    /// Shape `[nnz_row, width]`.
    pub col_indices: Array2<i32>,
    pub mask: Array2<i32>,
    /// Total slot count of this bucket across all partitions.
    pub nnz_row: usize,
}

/// Flattened block encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPartHybFlat {
    pub partition_size: usize,
    pub buckets: Vec<usize>,
    /// Offset of each bucket's first slot in the bucket-major concatenation of all
    /// slots, shape `[num_buckets + 1]`.
    pub tile_pos: Array1<i32>,
    pub per_bucket: Vec<FlatBucket>,
}

//==================================================================================
// 2. Core Packing Logic
//==================================================================================

/// Packs every nonzero into its (partition, bucket) slot stream.
///
/// Rows are walked once in row-major order. For each row, a dense per-partition
/// counter (sized `num_col_parts`) first accumulates the row's slice-local degrees,
/// then the row's nonzeros are packed in storage order, and finally the touched
/// counters are reset.
fn pack_column_parts(
    csr: &CsrMatrix<'_>,
    num_col_parts: usize,
    buckets: &[usize],
) -> Result<(usize, Vec<Vec<PackedSlots>>), TesseraError> {
    if num_col_parts == 0 {
        return Err(TesseraError::InvalidArgument(
            "num_col_parts must be at least 1".to_string(),
        ));
    }
    validate_widths("buckets", buckets, false)?;

    let partition_size = csr.num_cols().div_ceil(num_col_parts).max(1);
    let mut streams: Vec<Vec<SlotStream>> = (0..num_col_parts)
        .map(|_| buckets.iter().map(|&w| SlotStream::new(w)).collect())
        .collect();
    let mut part_degree = vec![0usize; num_col_parts];

    for i in 0..csr.num_rows() {
        let row = csr.row(i);
        for &col in row {
            part_degree[col as usize / partition_size] += 1;
        }
        for &col in row {
            let part_id = col as usize / partition_size;
            let bucket_id = assign_bucket(part_degree[part_id], buckets)?;
            streams[part_id][bucket_id].push(to_index(i, "row id")?, col)?;
        }
        for &col in row {
            part_degree[col as usize / partition_size] = 0;
        }
    }

    let packed = streams
        .into_iter()
        .map(|part| {
            part.into_iter()
                .map(SlotStream::finish)
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (part_id, part) in packed.iter().enumerate() {
        for (bucket_id, slots) in part.iter().enumerate() {
            log_metric!(
                "event" = "column_part_hyb",
                "partition" = part_id,
                "bucket" = bucket_id,
                "width" = slots.width,
                "slots" = slots.num_slots(),
                "nnz" = slots.nnz()
            );
        }
    }

    Ok((partition_size, packed))
}

//==================================================================================
// 3. Public API
//==================================================================================

/// Encodes a CSR matrix as a nested `[partition][bucket]` hybrid ELL layout.
///
/// # Errors
/// * `InvalidArgument` if `num_col_parts` is zero or `buckets` is empty or holds a
///   zero width.
/// * `InternalInvariantViolation` if the padding bookkeeping is inconsistent.
pub fn column_part_hyb(
    csr: &CsrMatrix<'_>,
    num_col_parts: usize,
    buckets: &[usize],
) -> Result<ColumnPartHyb, TesseraError> {
    let (partition_size, packed) = pack_column_parts(csr, num_col_parts, buckets)?;
    let parts = packed
        .into_iter()
        .map(|part| {
            part.into_iter()
                .map(BucketSlots::from_packed)
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "column_part_hyb: {} rows, {} nnz, {} partitions of {} columns, buckets {:?}",
        csr.num_rows(),
        csr.nnz(),
        num_col_parts,
        partition_size,
        buckets
    );

    Ok(ColumnPartHyb {
        partition_size,
        buckets: buckets.to_vec(),
        parts,
    })
}

/// Encodes a CSR matrix as a flattened, bucket-major hybrid ELL layout.
///
/// Within a bucket, partition `p` owns slots `row_pos[p]..row_pos[p + 1]`, and
/// `tile_indices` repeats `p` for each of them. This describes exactly the same
/// slots as `column_part_hyb`, concatenated over partitions.
pub fn column_part_hyb_flat(
    csr: &CsrMatrix<'_>,
    num_col_parts: usize,
    buckets: &[usize],
) -> Result<ColumnPartHybFlat, TesseraError> {
    let (partition_size, mut packed) = pack_column_parts(csr, num_col_parts, buckets)?;

    let mut tile_pos = Vec::with_capacity(buckets.len() + 1);
    tile_pos.push(0i32);
    let mut total_slots = 0usize;
    let mut per_bucket = Vec::with_capacity(buckets.len());

    for (bucket_id, &width) in buckets.iter().enumerate() {
        let mut row_pos = Vec::with_capacity(num_col_parts + 1);
        let mut tile_indices = Vec::new();
        let mut row_indices = Vec::new();
        let mut col_indices = Vec::new();
        let mut mask = Vec::new();
        row_pos.push(0i32);

        for (part_id, part) in packed.iter_mut().enumerate() {
            let slots = std::mem::take(&mut part[bucket_id]);
            let tile = to_index(part_id, "partition id")?;
            tile_indices.extend(std::iter::repeat(tile).take(slots.num_slots()));
            row_indices.extend(slots.row_indices);
            col_indices.extend(slots.col_indices);
            mask.extend(slots.mask);
            row_pos.push(to_index(row_indices.len(), "row_pos offset")?);
        }

        let nnz_row = row_indices.len();
        total_slots += nnz_row;
        tile_pos.push(to_index(total_slots, "tile_pos offset")?);
        per_bucket.push(FlatBucket {
            width,
            tile_indices: Array1::from_vec(tile_indices),
            row_pos: Array1::from_vec(row_pos),
            row_indices: Array1::from_vec(row_indices),
            col_indices: Array2::from_shape_vec((nnz_row, width), col_indices)?,
            mask: Array2::from_shape_vec((nnz_row, width), mask)?,
            nnz_row,
        });
    }

    log::debug!(
        "column_part_hyb_flat: {} rows, {} nnz, slots per bucket {:?}",
        csr.num_rows(),
        csr.nnz(),
        per_bucket.iter().map(|b| b.nnz_row).collect::<Vec<_>>()
    );

    Ok(ColumnPartHybFlat {
        partition_size,
        buckets: buckets.to_vec(),
        tile_pos: Array1::from_vec(tile_pos),
        per_bucket,
    })
}

//==================================================================================
// 4. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn example() -> (Vec<i32>, Vec<i32>) {
        (vec![0, 2, 5, 5, 6], vec![1, 3, 0, 2, 4, 1])
    }

    #[test]
    fn test_single_partition_scenario() {
        let (indptr, indices) = example();
        let csr = CsrMatrix::new(4, 5, &indptr, &indices).unwrap();
        let out = column_part_hyb(&csr, 1, &[2, 4]).unwrap();

        let b0 = &out.parts[0][0];
        assert_eq!(b0.row_indices, array![0, 3]);
        assert_eq!(b0.col_indices, array![[1, 3], [1, 0]]);
        assert_eq!(b0.mask, array![[1, 1], [1, 0]]);

        let b1 = &out.parts[0][1];
        assert_eq!(b1.row_indices, array![1]);
        assert_eq!(b1.col_indices, array![[0, 2, 4, 0]]);
        assert_eq!(b1.mask, array![[1, 1, 1, 0]]);
    }

    #[test]
    fn test_two_partitions_use_local_degree() {
        // Row 0 has columns {0, 1, 4}: degree 2 in part 0 (cols 0..3), 1 in part 1.
        let indptr = vec![0, 3];
        let indices = vec![0, 1, 4];
        let csr = CsrMatrix::new(1, 6, &indptr, &indices).unwrap();
        let out = column_part_hyb(&csr, 2, &[1, 2]).unwrap();
        assert_eq!(out.partition_size, 3);

        assert_eq!(out.parts[0][0].num_slots(), 0);
        assert_eq!(out.parts[0][1].col_indices, array![[0, 1]]);
        assert_eq!(out.parts[1][0].col_indices, array![[4]]);
        assert_eq!(out.parts[1][1].num_slots(), 0);
    }

    #[test]
    fn test_overflow_row_spans_slots() {
        let indptr = vec![0, 5];
        let indices = vec![0, 1, 2, 3, 4];
        let csr = CsrMatrix::new(1, 5, &indptr, &indices).unwrap();
        let out = column_part_hyb(&csr, 1, &[1, 2]).unwrap();
        let b1 = &out.parts[0][1];
        assert_eq!(b1.row_indices, array![0, 0, 0]);
        assert_eq!(b1.mask, array![[1, 1], [1, 1], [1, 0]]);
    }

    #[test]
    fn test_flat_matches_nested() {
        let indptr = vec![0, 3, 4, 8];
        let indices = vec![0, 5, 6, 7, 1, 2, 4, 7];
        let csr = CsrMatrix::new(3, 8, &indptr, &indices).unwrap();
        let nested = column_part_hyb(&csr, 2, &[1, 2, 4]).unwrap();
        let flat = column_part_hyb_flat(&csr, 2, &[1, 2, 4]).unwrap();

        assert_eq!(flat.tile_pos.len(), 4);
        for (b, fb) in flat.per_bucket.iter().enumerate() {
            assert_eq!(fb.row_pos.len(), 3);
            for p in 0..2 {
                let lo = fb.row_pos[p] as usize;
                let hi = fb.row_pos[p + 1] as usize;
                let nb = &nested.parts[p][b];
                assert_eq!(hi - lo, nb.num_slots());
                for k in lo..hi {
                    assert_eq!(fb.tile_indices[k], p as i32);
                    assert_eq!(fb.row_indices[k], nb.row_indices[k - lo]);
                    assert_eq!(fb.col_indices.row(k), nb.col_indices.row(k - lo));
                    assert_eq!(fb.mask.row(k), nb.mask.row(k - lo));
                }
            }
            assert_eq!(
                flat.tile_pos[b + 1] - flat.tile_pos[b],
                fb.nnz_row as i32
            );
        }
    }

    #[test]
    fn test_zero_partitions_rejected() {
        let (indptr, indices) = example();
        let csr = CsrMatrix::new(4, 5, &indptr, &indices).unwrap();
        assert!(matches!(
            column_part_hyb(&csr, 0, &[2]),
            Err(TesseraError::InvalidArgument(_))
        ));
        assert!(column_part_hyb(&csr, 1, &[]).is_err());
    }

    #[test]
    fn test_empty_matrix() {
        let indptr = vec![0];
        let indices: Vec<i32> = vec![];
        let csr = CsrMatrix::new(0, 0, &indptr, &indices).unwrap();
        let out = column_part_hyb(&csr, 3, &[2]).unwrap();
        assert_eq!(out.parts.len(), 3);
        assert!(out.parts.iter().all(|p| p[0].num_slots() == 0));
        assert_eq!(out.parts[0][0].col_indices.shape(), &[0, 2]);
    }
}
