//! The fixed-width slot packer shared by the bucketed encoders.
//!
//! A `SlotStream` accumulates the nonzeros of one (partition, bucket) or
//! (bucket, relation) stream. Nonzeros are appended to the tail slot; a new slot
//! opens when the tail is exactly full or when the incoming nonzero belongs to a
//! different row than the partially filled tail, in which case the tail is first
//! padded with invalid entries. A row's id is recorded once per slot, at open time.

use crate::error::TesseraError;

/// Column id written into padding positions.
pub const PAD_COL: i32 = 0;

/// Narrows a count or offset into the `i32` index space of the outputs.
pub fn to_index(value: usize, what: &str) -> Result<i32, TesseraError> {
    i32::try_from(value).map_err(|_| {
        TesseraError::InternalInvariantViolation(format!(
            "{} {} exceeds the i32 index range",
            what, value
        ))
    })
}

//==================================================================================
// 1. Packed Output
//==================================================================================

/// The finished, flat contents of a slot stream.
///
/// `col_indices` and `mask` hold `row_indices.len() * width` entries in slot-major
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackedSlots {
    pub width: usize,
    pub row_indices: Vec<i32>,
    pub col_indices: Vec<i32>,
    pub mask: Vec<i32>,
}

impl PackedSlots {
    pub fn num_slots(&self) -> usize {
        self.row_indices.len()
    }

    /// Number of real nonzeros (mask = 1 entries).
    pub fn nnz(&self) -> usize {
        self.mask.iter().filter(|&&m| m != 0).count()
    }
}

//==================================================================================
// 2. Slot Stream
//==================================================================================

#[derive(Debug, Clone)]
pub struct SlotStream {
    width: usize,
    row_indices: Vec<i32>,
    col_indices: Vec<i32>,
    mask: Vec<i32>,
}

impl SlotStream {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            row_indices: Vec::new(),
            col_indices: Vec::new(),
            mask: Vec::new(),
        }
    }

    fn pad_tail(&mut self, remainder: usize) {
        let pad = self.width - remainder;
        self.col_indices.extend(std::iter::repeat(PAD_COL).take(pad));
        self.mask.extend(std::iter::repeat(0).take(pad));
    }

    /// Appends one nonzero `(row, col)` following the slot packing rule.
    pub fn push(&mut self, row: i32, col: i32) -> Result<(), TesseraError> {
        let remainder = self.col_indices.len() % self.width;
        let open_slot = if remainder != 0 {
            let tail_row = *self.row_indices.last().ok_or_else(|| {
                TesseraError::InternalInvariantViolation(
                    "partially filled slot has no row id".to_string(),
                )
            })?;
            if tail_row != row {
                self.pad_tail(remainder);
                true
            } else {
                false
            }
        } else {
            true
        };

        if open_slot {
            if self.col_indices.len() % self.width != 0 {
                return Err(TesseraError::InternalInvariantViolation(format!(
                    "opening a slot at offset {} which is not a multiple of width {}",
                    self.col_indices.len(),
                    self.width
                )));
            }
            self.row_indices.push(row);
        }
        self.col_indices.push(col);
        self.mask.push(1);
        Ok(())
    }

    /// Pads the tail slot and checks the final shape.
    pub fn finish(mut self) -> Result<PackedSlots, TesseraError> {
        let remainder = self.col_indices.len() % self.width;
        if remainder != 0 {
            self.pad_tail(remainder);
        }

        let expected = self.row_indices.len() * self.width;
        if self.col_indices.len() != expected || self.mask.len() != expected {
            return Err(TesseraError::InternalInvariantViolation(format!(
                "padding error: {} slots of width {} but {} columns and {} mask entries",
                self.row_indices.len(),
                self.width,
                self.col_indices.len(),
                self.mask.len()
            )));
        }

        Ok(PackedSlots {
            width: self.width,
            row_indices: self.row_indices,
            col_indices: self.col_indices,
            mask: self.mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(width: usize, entries: &[(i32, i32)]) -> PackedSlots {
        let mut stream = SlotStream::new(width);
        for &(r, c) in entries {
            stream.push(r, c).unwrap();
        }
        stream.finish().unwrap()
    }

    #[test]
    fn test_row_change_pads_partial_slot() {
        let packed = pack(4, &[(0, 1), (0, 2), (1, 7)]);
        assert_eq!(packed.row_indices, vec![0, 1]);
        assert_eq!(packed.col_indices, vec![1, 2, 0, 0, 7, 0, 0, 0]);
        assert_eq!(packed.mask, vec![1, 1, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_long_row_spans_full_slots() {
        let packed = pack(2, &[(3, 1), (3, 2), (3, 5), (3, 6), (3, 9)]);
        assert_eq!(packed.row_indices, vec![3, 3, 3]);
        assert_eq!(packed.col_indices, vec![1, 2, 5, 6, 9, 0]);
        assert_eq!(packed.nnz(), 5);
    }

    #[test]
    fn test_full_slot_opens_new_slot_for_same_row_run() {
        // Two different rows that exactly fill their slots never get padding.
        let packed = pack(2, &[(0, 1), (0, 2), (1, 3), (1, 4)]);
        assert_eq!(packed.row_indices, vec![0, 1]);
        assert_eq!(packed.mask, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_empty_stream() {
        let packed = pack(3, &[]);
        assert_eq!(packed.num_slots(), 0);
        assert!(packed.col_indices.is_empty());
    }

    #[test]
    fn test_to_index_rejects_values_past_i32() {
        assert_eq!(to_index(i32::MAX as usize, "offset").unwrap(), i32::MAX);
        assert!(matches!(
            to_index(i32::MAX as usize + 1, "offset"),
            Err(TesseraError::InternalInvariantViolation(_))
        ));
    }
}
