//! This module contains the tile-group condenser.
//!
//! Rows are cut into tiles of `t` consecutive rows. Within a row tile every
//! distinct column becomes a `t x 1` column tile; column tiles are visited in
//! ascending column order and placed `g` at a time into groups. A group records
//! the column id of each of its slots and a `t x g` mask of which rows touch
//! which slot.
//!
//! With a threshold, a column tile holding fewer than `threshold` nonzeros is not
//! grouped; its entries are diverted into a doubly-compressed (DCSR) remainder.

use ndarray::{Array1, Array2, Array3};

use crate::error::TesseraError;
use crate::kernels::slot_stream::to_index;
use crate::types::CsrMatrix;

//==================================================================================
// 1. Output Types
//==================================================================================

/// Entries diverted out of the grouped layout, in DCSR form.
#[derive(Debug, Clone, PartialEq)]
pub struct DcsrRemainder {
    /// The distinct rows holding diverted entries, ascending.
    pub row_indices: Array1<i32>,
    /// Shape `[row_indices.len() + 1]`.
    pub indptr: Array1<i32>,
    pub col_indices: Array1<i32>,
}

impl DcsrRemainder {
    pub fn nnz(&self) -> usize {
        self.col_indices.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondensedTiles {
    pub tile_size: usize,
    pub group_size: usize,
    /// Cumulative group count per row tile, shape `[num_tiles + 1]`.
    pub group_indptr: Array1<i32>,
    /// Column id per group slot (0 for empty slots), shape `[groups, g]`.
    pub tile_indices: Array2<i32>,
    /// Shape `[groups, t, g]`.
    pub mask: Array3<i32>,
    /// Present only when a threshold was supplied.
    pub remainder: Option<DcsrRemainder>,
}

impl CondensedTiles {
    pub fn num_groups(&self) -> usize {
        self.tile_indices.nrows()
    }
}

//==================================================================================
// 2. Core Logic
//==================================================================================

fn build_dcsr(mut entries: Vec<(i32, i32)>) -> Result<DcsrRemainder, TesseraError> {
    entries.sort_unstable();
    let mut row_indices = Vec::new();
    let mut indptr = vec![0i32];
    let mut col_indices = Vec::with_capacity(entries.len());
    for run in entries.chunk_by(|a, b| a.0 == b.0) {
        row_indices.push(run[0].0);
        col_indices.extend(run.iter().map(|&(_, c)| c));
        indptr.push(to_index(col_indices.len(), "dcsr indptr offset")?);
    }
    Ok(DcsrRemainder {
        row_indices: Array1::from_vec(row_indices),
        indptr: Array1::from_vec(indptr),
        col_indices: Array1::from_vec(col_indices),
    })
}

/// Condenses a CSR matrix into `t x 1` column tiles grouped `g` at a time.
///
/// # Errors
/// Returns `InvalidArgument` if `t` or `g` is zero.
pub fn condense(
    csr: &CsrMatrix<'_>,
    t: usize,
    g: usize,
    threshold: Option<usize>,
) -> Result<CondensedTiles, TesseraError> {
    if t == 0 || g == 0 {
        return Err(TesseraError::InvalidArgument(format!(
            "tile size and group size must be positive, got t={} g={}",
            t, g
        )));
    }

    let n = csr.num_rows();
    let num_tiles = n.div_ceil(t);
    let mut group_indptr = Vec::with_capacity(num_tiles + 1);
    let mut tile_indices: Vec<i32> = Vec::new();
    let mut mask: Vec<i32> = Vec::new();
    let mut diverted: Vec<(i32, i32)> = Vec::new();
    let mut num_groups = 0usize;
    group_indptr.push(0i32);

    // (col, row) pairs of the current row tile, reused across tiles.
    let mut tile_entries: Vec<(i32, i32)> = Vec::new();

    for tile_id in 0..num_tiles {
        let begin = tile_id * t;
        let end = (begin + t).min(n);

        tile_entries.clear();
        for i in begin..end {
            let row = to_index(i, "row id")?;
            tile_entries.extend(csr.row(i).iter().map(|&c| (c, row)));
        }
        tile_entries.sort_unstable();

        let mut slot = 0usize;
        for column_tile in tile_entries.chunk_by(|a, b| a.0 == b.0) {
            let col = column_tile[0].0;
            let grouped = threshold.map_or(true, |th| column_tile.len() >= th);
            if !grouped {
                diverted.extend(column_tile.iter().map(|&(c, r)| (r, c)));
                continue;
            }

            if slot == 0 {
                num_groups += 1;
                tile_indices.resize(num_groups * g, 0);
                mask.resize(num_groups * t * g, 0);
            }
            let group_base = num_groups - 1;
            tile_indices[group_base * g + slot] = col;
            for &(_, row) in column_tile {
                let row_local = row as usize - begin;
                mask[group_base * t * g + row_local * g + slot] = 1;
            }
            slot += 1;
            if slot == g {
                slot = 0;
            }
        }
        group_indptr.push(to_index(num_groups, "group_indptr offset")?);
    }

    let remainder = threshold.map(|_| build_dcsr(diverted)).transpose()?;

    log_metric!(
        "event" = "condense",
        "tiles" = num_tiles,
        "groups" = num_groups,
        "diverted" = remainder.as_ref().map_or(0, |r| r.nnz())
    );
    log::debug!(
        "condense: {} rows in {} tiles of {} -> {} groups of {}",
        n,
        num_tiles,
        t,
        num_groups,
        g
    );

    Ok(CondensedTiles {
        tile_size: t,
        group_size: g,
        group_indptr: Array1::from_vec(group_indptr),
        tile_indices: Array2::from_shape_vec((num_groups, g), tile_indices)?,
        mask: Array3::from_shape_vec((num_groups, t, g), mask)?,
        remainder,
    })
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_groups_without_threshold() {
        // 3 rows, t = 2: tile 0 = rows {0, 1}, tile 1 = row {2}.
        // row 0: {1, 3}; row 1: {3, 4, 5}; row 2: {0}
        let indptr = vec![0, 2, 5, 6];
        let indices = vec![3, 1, 3, 5, 4, 0];
        let csr = CsrMatrix::from_indptr(&indptr, &indices).unwrap();
        let out = condense(&csr, 2, 2, None).unwrap();

        // Tile 0 columns ascending: 1, 3, 4, 5 -> two groups. Tile 1: column 0.
        assert_eq!(out.group_indptr, array![0, 2, 3]);
        assert_eq!(out.tile_indices, array![[1, 3], [4, 5], [0, 0]]);
        assert_eq!(
            out.mask,
            array![
                [[1, 1], [0, 1]],
                [[0, 0], [1, 1]],
                [[1, 0], [0, 0]],
            ]
        );
        assert!(out.remainder.is_none());
    }

    #[test]
    fn test_threshold_diverts_sparse_columns() {
        // Tile of 2 rows: column 2 appears in both rows, columns 0 and 7 once.
        let indptr = vec![0, 2, 4];
        let indices = vec![0, 2, 2, 7];
        let csr = CsrMatrix::from_indptr(&indptr, &indices).unwrap();
        let out = condense(&csr, 2, 4, Some(2)).unwrap();

        assert_eq!(out.group_indptr, array![0, 1]);
        assert_eq!(out.tile_indices, array![[2, 0, 0, 0]]);
        assert_eq!(out.mask, array![[[1, 0, 0, 0], [1, 0, 0, 0]]]);

        let rem = out.remainder.unwrap();
        assert_eq!(rem.row_indices, array![0, 1]);
        assert_eq!(rem.indptr, array![0, 1, 2]);
        assert_eq!(rem.col_indices, array![0, 7]);
    }

    #[test]
    fn test_threshold_diverts_every_entry_of_a_column_tile() {
        // Column 5 appears in 2 of 3 rows of the tile; threshold 3 diverts both.
        let indptr = vec![0, 1, 2, 3];
        let indices = vec![5, 5, 6];
        let csr = CsrMatrix::from_indptr(&indptr, &indices).unwrap();
        let out = condense(&csr, 3, 1, Some(3)).unwrap();
        assert_eq!(out.num_groups(), 0);
        assert_eq!(out.group_indptr, array![0, 0]);
        let rem = out.remainder.unwrap();
        assert_eq!(rem.row_indices, array![0, 1, 2]);
        assert_eq!(rem.col_indices, array![5, 5, 6]);
    }

    #[test]
    fn test_threshold_zero_keeps_everything_grouped() {
        let indptr = vec![0, 1];
        let indices = vec![3];
        let csr = CsrMatrix::from_indptr(&indptr, &indices).unwrap();
        let out = condense(&csr, 1, 1, Some(0)).unwrap();
        assert_eq!(out.num_groups(), 1);
        let rem = out.remainder.unwrap();
        assert_eq!(rem.indptr, array![0]);
        assert_eq!(rem.nnz(), 0);
    }

    #[test]
    fn test_partial_last_tile_shape() {
        let indptr = vec![0, 1, 1, 2];
        let indices = vec![0, 0];
        let csr = CsrMatrix::from_indptr(&indptr, &indices).unwrap();
        let out = condense(&csr, 2, 1, None).unwrap();
        assert_eq!(out.mask.shape(), &[2, 2, 1]);
        // Row 2 is local row 0 of tile 1; the padded local row 1 stays empty.
        assert_eq!(out.mask, array![[[1], [0]], [[1], [0]]]);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let indptr = vec![0];
        let indices: Vec<i32> = vec![];
        let csr = CsrMatrix::from_indptr(&indptr, &indices).unwrap();
        assert!(condense(&csr, 0, 1, None).is_err());
        assert!(condense(&csr, 1, 0, None).is_err());
    }
}
