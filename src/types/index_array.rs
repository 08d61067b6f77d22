//! Owned array containers accepted at the library boundary.
//!
//! An `IndexArray` carries its element type and device tag alongside the raw
//! bytes so the common preconditions (32-bit integer elements, host residency)
//! can be checked before any kernel touches the data. Storage is an Arrow
//! `Buffer`, which is always allocated with sufficient alignment for a zero-copy
//! `&[i32]` view.

use arrow::array::Array;
use arrow::buffer::Buffer;
use bytemuck::Pod;

use crate::error::TesseraError;
use crate::types::{Device, TesseraDataType};

//==================================================================================
// 1. IndexArray
//==================================================================================

/// A typed, device-tagged, immutable array of index values.
#[derive(Debug, Clone)]
pub struct IndexArray {
    dtype: TesseraDataType,
    device: Device,
    buffer: Buffer,
}

impl IndexArray {
    /// Wraps an owned `Vec<i32>` as a host-resident `Int32` array without copying.
    pub fn from_vec_i32(values: Vec<i32>) -> Self {
        Self {
            dtype: TesseraDataType::Int32,
            device: Device::Cpu,
            buffer: Buffer::from_vec(values),
        }
    }

    /// Wraps a raw buffer with an explicit element type and device.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the buffer length is not a whole number of elements.
    pub fn from_raw(
        dtype: TesseraDataType,
        device: Device,
        buffer: Buffer,
    ) -> Result<Self, TesseraError> {
        if buffer.len() % dtype.byte_width() != 0 {
            return Err(TesseraError::InvalidArgument(format!(
                "buffer of {} bytes is not a whole number of {} elements",
                buffer.len(),
                dtype
            )));
        }
        Ok(Self {
            dtype,
            device,
            buffer,
        })
    }

    /// Builds an `IndexArray` from any primitive Arrow array, sharing its buffer.
    ///
    /// The element type is recorded as-is; the 32-bit requirement is enforced later
    /// by `as_i32`, so a wrongly typed array surfaces as a `TypeMismatch` naming
    /// the offending argument.
    pub fn from_arrow(array: &dyn Array) -> Result<Self, TesseraError> {
        let dtype = TesseraDataType::from_arrow_type(array.data_type())?;
        if dtype == TesseraDataType::Boolean {
            return Err(TesseraError::TypeMismatch(
                "boolean arrays cannot be used as index arrays".to_string(),
            ));
        }
        if array.null_count() > 0 {
            return Err(TesseraError::InvalidArgument(format!(
                "index arrays must not contain nulls, found {}",
                array.null_count()
            )));
        }

        let data = array.to_data();
        let width = dtype.byte_width();
        let buffer = data
            .buffers()
            .first()
            .ok_or_else(|| {
                TesseraError::InvalidArgument("primitive array has no value buffer".to_string())
            })?
            .slice_with_length(data.offset() * width, data.len() * width);

        Ok(Self {
            dtype,
            device: Device::Cpu,
            buffer,
        })
    }

    /// Re-tags the array with a different device.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn dtype(&self) -> TesseraDataType {
        self.dtype
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.buffer.len() / self.dtype.byte_width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a zero-copy `&[i32]` view after checking the common preconditions.
    ///
    /// `name` identifies the argument in error messages.
    ///
    /// # Errors
    /// * `TypeMismatch` if the elements are not 32-bit integers.
    /// * `UnsupportedDevice` if the array is not host-resident.
    pub fn as_i32(&self, name: &str) -> Result<&[i32], TesseraError> {
        if !self.dtype.is_integer() || self.dtype.bit_width() != 32 {
            return Err(TesseraError::TypeMismatch(format!(
                "only 32-bit integer index arrays are supported, got {} ({} bits) for {}",
                self.dtype,
                self.dtype.bit_width(),
                name
            )));
        }
        if !self.device.is_host() {
            return Err(TesseraError::UnsupportedDevice(format!(
                "{} resides on {}; conversions only run on host memory",
                name, self.device
            )));
        }
        Ok(bytemuck::try_cast_slice(self.buffer.as_slice())?)
    }
}

//==================================================================================
// 2. ValueBuffer
//==================================================================================

/// An opaque buffer of fixed-width numeric records.
///
/// The repacker never interprets the values; it only needs the element width to
/// move whole records between row spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueBuffer {
    pub dtype: TesseraDataType,
    pub bytes: Vec<u8>,
}

impl ValueBuffer {
    /// Copies a typed slice into a new buffer.
    pub fn from_slice<T: Pod>(dtype: TesseraDataType, values: &[T]) -> Self {
        Self {
            dtype,
            bytes: bytemuck::cast_slice(values).to_vec(),
        }
    }

    /// A zero-filled buffer holding `num_elements` elements.
    pub fn zeroed(dtype: TesseraDataType, num_elements: usize) -> Self {
        Self {
            dtype,
            bytes: vec![0u8; num_elements * dtype.byte_width()],
        }
    }

    /// Number of elements, assuming the declared element width.
    pub fn num_elements(&self) -> usize {
        self.bytes.len() / self.dtype.byte_width()
    }

    /// Copies the bytes out as a typed vector. The copy sidesteps the alignment
    /// requirements a borrowed cast would impose on a `Vec<u8>`.
    pub fn to_vec<T: Pod>(&self) -> Result<Vec<T>, TesseraError> {
        if std::mem::size_of::<T>() != self.dtype.byte_width() {
            return Err(TesseraError::InvalidArgument(format!(
                "cannot read {} elements as {}",
                self.dtype,
                std::any::type_name::<T>()
            )));
        }
        Ok(self
            .bytes
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, Int64Array};

    #[test]
    fn test_from_vec_view() {
        let arr = IndexArray::from_vec_i32(vec![0, 2, 5]);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.as_i32("indptr").unwrap(), &[0, 2, 5]);
    }

    #[test]
    fn test_from_arrow_respects_slice_offset() {
        let array = Int32Array::from(vec![9, 1, 2, 3]);
        let sliced = array.slice(1, 3);
        let arr = IndexArray::from_arrow(&sliced).unwrap();
        assert_eq!(arr.as_i32("indices").unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_64_bit_index_is_type_mismatch() {
        let array = Int64Array::from(vec![0i64, 1, 2]);
        let arr = IndexArray::from_arrow(&array).unwrap();
        let err = arr.as_i32("indptr").unwrap_err();
        match err {
            TesseraError::TypeMismatch(msg) => assert!(msg.contains("indptr")),
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_float32_is_type_mismatch() {
        let buffer = Buffer::from_vec(vec![1.0f32, 2.0]);
        let arr = IndexArray::from_raw(TesseraDataType::Float32, Device::Cpu, buffer).unwrap();
        assert!(matches!(arr.as_i32("indices"), Err(TesseraError::TypeMismatch(_))));
    }

    #[test]
    fn test_accelerator_is_unsupported_device() {
        let arr = IndexArray::from_vec_i32(vec![0, 1]).with_device(Device::Accelerator {
            kind: "cuda".to_string(),
            id: 0,
        });
        assert!(matches!(
            arr.as_i32("indptr"),
            Err(TesseraError::UnsupportedDevice(_))
        ));
    }

    #[test]
    fn test_nulls_rejected() {
        let array = Int32Array::from(vec![Some(0), None]);
        assert!(matches!(
            IndexArray::from_arrow(&array),
            Err(TesseraError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_value_buffer_roundtrip() {
        let buf = ValueBuffer::from_slice(TesseraDataType::Float32, &[1.5f32, -2.0]);
        assert_eq!(buf.num_elements(), 2);
        assert_eq!(buf.to_vec::<f32>().unwrap(), vec![1.5, -2.0]);
        assert!(buf.to_vec::<f64>().is_err());
    }

    #[test]
    fn test_value_buffer_reads_raw_bytes() {
        // Bytes assembled by hand, as value_buffer_from_arrow produces them.
        let mut bytes = Vec::new();
        for v in [3.25f64, -1.0, 8.0] {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }
        let buf = ValueBuffer {
            dtype: TesseraDataType::Float64,
            bytes,
        };
        assert_eq!(buf.to_vec::<f64>().unwrap(), vec![3.25, -1.0, 8.0]);
        assert!(buf.to_vec::<i32>().is_err());
    }
}
