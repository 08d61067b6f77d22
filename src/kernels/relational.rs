//! This module contains the relational two-level bucketed encoder (CSF to 3D ELL).
//!
//! The input is a two-level compressed structure covering several relations.
//! Each active row of each relation is bucketed by its nonzero-column count using
//! the column-bucket widths, and its columns are packed into slots of that width,
//! independently per (bucket, relation). The row slots of every (bucket, relation)
//! stream are then grouped into row super-tiles of the bucket's row width.

use ndarray::{Array1, Array2, Array3};

use crate::error::TesseraError;
use crate::kernels::bucket::{assign_bucket, validate_widths};
use crate::kernels::slot_stream::{to_index, PackedSlots, SlotStream, PAD_COL};
use crate::types::CsfRelations;

//==================================================================================
// 1. Output Types
//==================================================================================

/// The tiles of one (bucket, relation) stream.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationTiles {
    /// Shape `[super_tiles, row_width]`.
    pub row_indices: Array2<i32>,
    /// Shape `[super_tiles, row_width, col_width]`.
    pub col_indices: Array3<i32>,
    /// Shape `[super_tiles, row_width, col_width]`.
    pub mask: Array3<i32>,
}

impl RelationTiles {
    pub fn num_super_tiles(&self) -> usize {
        self.row_indices.nrows()
    }
}

/// Nested encoding, indexed `buckets[bucket][relation]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationalEll3d {
    pub row_buckets: Vec<usize>,
    pub col_buckets: Vec<usize>,
    pub buckets: Vec<Vec<RelationTiles>>,
}

/// One bucket of the flattened encoding, concatenating all relations.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationalFlatBucket {
    pub row_width: usize,
    pub col_width: usize,
    /// Relation `r` owns row slots `indptr[r]..indptr[r + 1]`, shape `[num_rels + 1]`.
    pub indptr: Array1<i32>,
    /// Shape `[row_slots]`.
    pub row_indices: Array1<i32>,
    /// Shape `[row_slots, col_width]`.
    pub col_indices: Array2<i32>,
    pub mask: Array2<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationalEll3dFlat {
    pub row_buckets: Vec<usize>,
    pub col_buckets: Vec<usize>,
    pub buckets: Vec<RelationalFlatBucket>,
}

//==================================================================================
// 2. Core Packing Logic
//==================================================================================

/// Pads a packed stream so its slot count is a multiple of `row_width`.
///
/// Row-id padding repeats the last row id: a duplicated row whose column slot is
/// entirely masked out contributes nothing to a kernel. Column and mask padding
/// is invalid.
fn pad_to_super_tiles(packed: &mut PackedSlots, row_width: usize) -> Result<usize, TesseraError> {
    let col_width = packed.width;
    let remainder = packed.row_indices.len() % row_width;
    if remainder != 0 {
        let last = *packed.row_indices.last().ok_or_else(|| {
            TesseraError::InternalInvariantViolation(
                "row padding requested on an empty stream".to_string(),
            )
        })?;
        packed
            .row_indices
            .extend(std::iter::repeat(last).take(row_width - remainder));
    }

    let tile_len = row_width * col_width;
    let col_remainder = packed.col_indices.len() % tile_len;
    if col_remainder != 0 {
        let pad = tile_len - col_remainder;
        packed.col_indices.extend(std::iter::repeat(PAD_COL).take(pad));
        packed.mask.extend(std::iter::repeat(0).take(pad));
    }

    let super_tiles = packed.row_indices.len() / row_width;
    if packed.row_indices.len() != super_tiles * row_width
        || packed.col_indices.len() != super_tiles * tile_len
        || packed.mask.len() != super_tiles * tile_len
    {
        return Err(TesseraError::InternalInvariantViolation(format!(
            "padding error: {} row slots, {} columns, {} mask entries for {} super tiles of {}x{}",
            packed.row_indices.len(),
            packed.col_indices.len(),
            packed.mask.len(),
            super_tiles,
            row_width,
            col_width
        )));
    }
    Ok(super_tiles)
}

/// Packs every (bucket, relation) stream and pads it to whole super tiles.
/// Returns the streams indexed `[bucket][relation]` with their super-tile counts.
fn pack_relations(
    csf: &CsfRelations<'_>,
    row_buckets: &[usize],
    col_buckets: &[usize],
) -> Result<Vec<Vec<(PackedSlots, usize)>>, TesseraError> {
    if row_buckets.len() != col_buckets.len() {
        return Err(TesseraError::InvalidArgument(format!(
            "row_buckets and col_buckets must have the same length, got {} and {}",
            row_buckets.len(),
            col_buckets.len()
        )));
    }
    validate_widths("row_buckets", row_buckets, false)?;
    validate_widths("col_buckets", col_buckets, true)?;

    let num_rels = csf.num_rels();
    let mut streams: Vec<Vec<SlotStream>> = col_buckets
        .iter()
        .map(|&w| (0..num_rels).map(|_| SlotStream::new(w)).collect())
        .collect();

    for rel in 0..num_rels {
        for (row, cols) in csf.rows_of(rel) {
            let bucket_id = assign_bucket(cols.len(), col_buckets)?;
            let stream = &mut streams[bucket_id][rel];
            for &col in cols {
                stream.push(row, col)?;
            }
        }
    }

    let mut out = Vec::with_capacity(col_buckets.len());
    for (bucket_id, bucket_streams) in streams.into_iter().enumerate() {
        let row_width = row_buckets[bucket_id];
        let mut rels = Vec::with_capacity(num_rels);
        for (rel, stream) in bucket_streams.into_iter().enumerate() {
            let mut packed = stream.finish()?;
            let super_tiles = pad_to_super_tiles(&mut packed, row_width)?;
            log_metric!(
                "event" = "csf_to_ell3d",
                "bucket" = bucket_id,
                "relation" = rel,
                "super_tiles" = super_tiles,
                "nnz" = packed.nnz()
            );
            rels.push((packed, super_tiles));
        }
        out.push(rels);
    }
    Ok(out)
}

//==================================================================================
// 3. Public API
//==================================================================================

/// Encodes a CSF relational structure as nested `[bucket][relation]` 3D ELL tiles.
///
/// # Errors
/// * `InvalidArgument` if the bucket lists differ in length, are empty, hold a
///   zero width, or `col_buckets` is not strictly ascending.
/// * `InternalInvariantViolation` if the padding bookkeeping is inconsistent.
pub fn csf_to_ell3d(
    csf: &CsfRelations<'_>,
    row_buckets: &[usize],
    col_buckets: &[usize],
) -> Result<RelationalEll3d, TesseraError> {
    let packed = pack_relations(csf, row_buckets, col_buckets)?;
    let mut buckets = Vec::with_capacity(packed.len());
    for (bucket_id, rels) in packed.into_iter().enumerate() {
        let row_width = row_buckets[bucket_id];
        let col_width = col_buckets[bucket_id];
        let tiles = rels
            .into_iter()
            .map(|(slots, super_tiles)| -> Result<RelationTiles, TesseraError> {
                Ok(RelationTiles {
                    row_indices: Array2::from_shape_vec(
                        (super_tiles, row_width),
                        slots.row_indices,
                    )?,
                    col_indices: Array3::from_shape_vec(
                        (super_tiles, row_width, col_width),
                        slots.col_indices,
                    )?,
                    mask: Array3::from_shape_vec((super_tiles, row_width, col_width), slots.mask)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        buckets.push(tiles);
    }

    log::debug!(
        "csf_to_ell3d: {} relations, {} nnz, row buckets {:?}, col buckets {:?}",
        csf.num_rels(),
        csf.nnz(),
        row_buckets,
        col_buckets
    );

    Ok(RelationalEll3d {
        row_buckets: row_buckets.to_vec(),
        col_buckets: col_buckets.to_vec(),
        buckets,
    })
}

/// Encodes a CSF relational structure with one concatenated array set per bucket.
pub fn csf_to_ell3d_flat(
    csf: &CsfRelations<'_>,
    row_buckets: &[usize],
    col_buckets: &[usize],
) -> Result<RelationalEll3dFlat, TesseraError> {
    let packed = pack_relations(csf, row_buckets, col_buckets)?;
    let mut buckets = Vec::with_capacity(packed.len());
    for (bucket_id, rels) in packed.into_iter().enumerate() {
        let col_width = col_buckets[bucket_id];
        let mut indptr = Vec::with_capacity(rels.len() + 1);
        let mut row_indices = Vec::new();
        let mut col_indices = Vec::new();
        let mut mask = Vec::new();
        indptr.push(0i32);
        for (slots, _) in rels {
            row_indices.extend(slots.row_indices);
            col_indices.extend(slots.col_indices);
            mask.extend(slots.mask);
            indptr.push(to_index(row_indices.len(), "bucket indptr offset")?);
        }
        let row_slots = row_indices.len();
        buckets.push(RelationalFlatBucket {
            row_width: row_buckets[bucket_id],
            col_width,
            indptr: Array1::from_vec(indptr),
            row_indices: Array1::from_vec(row_indices),
            col_indices: Array2::from_shape_vec((row_slots, col_width), col_indices)?,
            mask: Array2::from_shape_vec((row_slots, col_width), mask)?,
        });
    }

    Ok(RelationalEll3dFlat {
        row_buckets: row_buckets.to_vec(),
        col_buckets: col_buckets.to_vec(),
        buckets,
    })
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
