// In: src/bridge/arrow_impl.rs

//! Marshalling between Arrow arrays and the pure kernel types.
//!
//! Inbound, any primitive Arrow array becomes an `IndexArray` (sharing its buffer)
//! or a `ValueBuffer` (copying its bytes). Outbound, every shaped `ndarray` output
//! is flattened in row-major order into an `Int32Array` tagged with its shape.

use std::sync::Arc;

use arrow::array::{make_array, Array, ArrayData, ArrayRef, Int32Array};
use arrow::buffer::Buffer;
use ndarray::{ArrayBase, Data, Dimension};

use crate::bridge::format::NamedArray;
use crate::bridge::stateless_api::ConversionOutput;
use crate::error::TesseraError;
use crate::types::{IndexArray, TesseraDataType, ValueBuffer};

//==================================================================================
// 1. Inbound
//==================================================================================

pub fn index_array_from_arrow(array: &dyn Array) -> Result<IndexArray, TesseraError> {
    IndexArray::from_arrow(array)
}

/// Copies the values of a primitive Arrow array into an opaque `ValueBuffer`.
pub fn value_buffer_from_arrow(array: &dyn Array) -> Result<ValueBuffer, TesseraError> {
    let dtype = TesseraDataType::from_arrow_type(array.data_type())?;
    if dtype == TesseraDataType::Boolean {
        return Err(TesseraError::TypeMismatch(
            "boolean arrays cannot be repacked as value buffers".to_string(),
        ));
    }
    let data = array.to_data();
    let width = dtype.byte_width();
    let values = data.buffers().first().ok_or_else(|| {
        TesseraError::InvalidArgument("primitive array has no value buffer".to_string())
    })?;
    let start = data.offset() * width;
    let bytes = values.as_slice()[start..start + data.len() * width].to_vec();
    Ok(ValueBuffer { dtype, bytes })
}

//==================================================================================
// 2. Outbound
//==================================================================================

pub fn int32_array(values: Vec<i32>) -> ArrayRef {
    Arc::new(Int32Array::from(values))
}

/// Rebuilds a primitive Arrow array of the buffer's element type.
pub fn value_buffer_to_arrow(buf: ValueBuffer) -> Result<ArrayRef, TesseraError> {
    if buf.dtype == TesseraDataType::Boolean {
        return Err(TesseraError::TypeMismatch(
            "boolean value buffers have no byte-per-element Arrow layout".to_string(),
        ));
    }
    let len = buf.num_elements();
    // `build` checks element alignment, which a `Vec<u8>` does not guarantee.
    let data = ArrayData::builder(buf.dtype.to_arrow_type())
        .len(len)
        .add_buffer(Buffer::from_slice_ref(&buf.bytes))
        .build()?;
    Ok(make_array(data))
}

fn shaped<S, D>(name: String, values: &ArrayBase<S, D>) -> NamedArray
where
    S: Data<Elem = i32>,
    D: Dimension,
{
    NamedArray {
        name,
        shape: values.shape().to_vec(),
        array: int32_array(values.iter().copied().collect()),
    }
}

/// Flattens every array of a conversion output, in a stable order.
pub fn output_to_arrow(output: &ConversionOutput) -> Vec<NamedArray> {
    let mut out = Vec::new();
    match output {
        ConversionOutput::ColumnPartHyb(hyb) => {
            for (p, part) in hyb.parts.iter().enumerate() {
                for (b, slots) in part.iter().enumerate() {
                    let prefix = format!("part{}.bucket{}", p, b);
                    out.push(shaped(format!("{}.row_indices", prefix), &slots.row_indices));
                    out.push(shaped(format!("{}.col_indices", prefix), &slots.col_indices));
                    out.push(shaped(format!("{}.mask", prefix), &slots.mask));
                }
            }
        }
        ConversionOutput::ColumnPartHybFlat(flat) => {
            out.push(shaped("tile_pos".to_string(), &flat.tile_pos));
            for (b, fb) in flat.per_bucket.iter().enumerate() {
                let prefix = format!("bucket{}", b);
                out.push(shaped(format!("{}.tile_indices", prefix), &fb.tile_indices));
                out.push(shaped(format!("{}.row_pos", prefix), &fb.row_pos));
                out.push(shaped(format!("{}.row_indices", prefix), &fb.row_indices));
                out.push(shaped(format!("{}.col_indices", prefix), &fb.col_indices));
                out.push(shaped(format!("{}.mask", prefix), &fb.mask));
            }
        }
        ConversionOutput::Relational(ell) => {
            for (b, rels) in ell.buckets.iter().enumerate() {
                for (r, tiles) in rels.iter().enumerate() {
                    let prefix = format!("bucket{}.rel{}", b, r);
                    out.push(shaped(format!("{}.row_indices", prefix), &tiles.row_indices));
                    out.push(shaped(format!("{}.col_indices", prefix), &tiles.col_indices));
                    out.push(shaped(format!("{}.mask", prefix), &tiles.mask));
                }
            }
        }
        ConversionOutput::RelationalFlat(ell) => {
            for (b, fb) in ell.buckets.iter().enumerate() {
                let prefix = format!("bucket{}", b);
                out.push(shaped(format!("{}.indptr", prefix), &fb.indptr));
                out.push(shaped(format!("{}.row_indices", prefix), &fb.row_indices));
                out.push(shaped(format!("{}.col_indices", prefix), &fb.col_indices));
                out.push(shaped(format!("{}.mask", prefix), &fb.mask));
            }
        }
        ConversionOutput::Condensed(tiles) => {
            out.push(shaped("group_indptr".to_string(), &tiles.group_indptr));
            out.push(shaped("tile_indices".to_string(), &tiles.tile_indices));
            out.push(shaped("mask".to_string(), &tiles.mask));
            if let Some(rem) = &tiles.remainder {
                out.push(shaped("dcsr_row_indices".to_string(), &rem.row_indices));
                out.push(shaped("dcsr_indptr".to_string(), &rem.indptr));
                out.push(shaped("dcsr_col_indices".to_string(), &rem.col_indices));
            }
        }
        ConversionOutput::Reshaped(ell) => {
            out.push(shaped("row_indices".to_string(), &ell.row_indices));
            out.push(shaped("col_indices".to_string(), &ell.col_indices));
            out.push(shaped("row_padding_num".to_string(), &ell.row_padding_num));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float32Array, Float64Array, Int64Array};

    #[test]
    fn test_value_buffer_respects_slice_offset() {
        let array = Float32Array::from(vec![1.0, 2.0, 3.0, 4.0]);
        let sliced = array.slice(1, 2);
        let buf = value_buffer_from_arrow(&sliced).unwrap();
        assert_eq!(buf.dtype, TesseraDataType::Float32);
        assert_eq!(buf.to_vec::<f32>().unwrap(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_value_buffer_back_to_arrow() {
        let buf = ValueBuffer::from_slice(TesseraDataType::Int64, &[5i64, -6]);
        let array = value_buffer_to_arrow(buf).unwrap();
        let typed = array.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(typed.values().to_vec(), vec![5, -6]);
    }

    #[test]
    fn test_float64_buffer_from_byte_vec() {
        let mut bytes = Vec::new();
        for v in [1.5f64, -2.25, 4.0] {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }
        let buf = ValueBuffer {
            dtype: TesseraDataType::Float64,
            bytes,
        };
        let array = value_buffer_to_arrow(buf).unwrap();
        let typed = array.as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(typed.values().to_vec(), vec![1.5, -2.25, 4.0]);
    }

    #[test]
    fn test_shaped_array_is_row_major() {
        let grid = ndarray::array![[1, 2, 3], [4, 5, 6]];
        let named = shaped("grid".to_string(), &grid);
        assert_eq!(named.shape, vec![2, 3]);
        let typed = named.array.as_any().downcast_ref::<Int32Array>().unwrap();
        assert_eq!(typed.values().to_vec(), vec![1, 2, 3, 4, 5, 6]);
    }
}
