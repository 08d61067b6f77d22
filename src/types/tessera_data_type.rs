//! This module defines the canonical, type-safe representation of element types
//! and memory placement used at the tessera library boundary.

use crate::error::TesseraError;
use arrow::datatypes::DataType as ArrowDataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The canonical, internal representation of an array element type.
///
/// Index arrays must be 32-bit integers; value buffers may use any numeric type
/// and are moved as opaque fixed-width records.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TesseraDataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Boolean,
}

impl TesseraDataType {
    /// Converts an Arrow `DataType` into a `TesseraDataType`.
    pub fn from_arrow_type(arrow_type: &ArrowDataType) -> Result<Self, TesseraError> {
        match arrow_type {
            ArrowDataType::Int8 => Ok(Self::Int8),
            ArrowDataType::Int16 => Ok(Self::Int16),
            ArrowDataType::Int32 => Ok(Self::Int32),
            ArrowDataType::Int64 => Ok(Self::Int64),
            ArrowDataType::UInt8 => Ok(Self::UInt8),
            ArrowDataType::UInt16 => Ok(Self::UInt16),
            ArrowDataType::UInt32 => Ok(Self::UInt32),
            ArrowDataType::UInt64 => Ok(Self::UInt64),
            ArrowDataType::Float16 => Ok(Self::Float16),
            ArrowDataType::Float32 => Ok(Self::Float32),
            ArrowDataType::Float64 => Ok(Self::Float64),
            ArrowDataType::Boolean => Ok(Self::Boolean),
            dt => Err(TesseraError::TypeMismatch(format!(
                "Cannot convert Arrow type {:?} to TesseraDataType",
                dt
            ))),
        }
    }

    /// Converts a `TesseraDataType` back into an Arrow `DataType`.
    pub fn to_arrow_type(&self) -> ArrowDataType {
        match self {
            Self::Int8 => ArrowDataType::Int8,
            Self::Int16 => ArrowDataType::Int16,
            Self::Int32 => ArrowDataType::Int32,
            Self::Int64 => ArrowDataType::Int64,
            Self::UInt8 => ArrowDataType::UInt8,
            Self::UInt16 => ArrowDataType::UInt16,
            Self::UInt32 => ArrowDataType::UInt32,
            Self::UInt64 => ArrowDataType::UInt64,
            Self::Float16 => ArrowDataType::Float16,
            Self::Float32 => ArrowDataType::Float32,
            Self::Float64 => ArrowDataType::Float64,
            Self::Boolean => ArrowDataType::Boolean,
        }
    }

    /// The width of one element in bytes. `Boolean` is stored one byte per flag.
    pub fn byte_width(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 | Self::Boolean => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    pub fn bit_width(&self) -> usize {
        self.byte_width() * 8
    }

    /// Returns `true` if the data type is a signed integer.
    pub fn is_signed_int(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Returns `true` for any signed or unsigned integer type.
    pub fn is_integer(&self) -> bool {
        self.is_signed_int()
            || matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    /// Returns `true` if the data type is a floating-point number.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// Parses a numpy-style name such as `"float32"` or `"uint8"`.
    pub fn from_name(name: &str) -> Result<Self, TesseraError> {
        match name.to_lowercase().as_str() {
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "uint8" => Ok(Self::UInt8),
            "uint16" => Ok(Self::UInt16),
            "uint32" => Ok(Self::UInt32),
            "uint64" => Ok(Self::UInt64),
            "float16" | "half" => Ok(Self::Float16),
            "float32" | "float" => Ok(Self::Float32),
            "float64" | "double" => Ok(Self::Float64),
            "bool" | "boolean" => Ok(Self::Boolean),
            other => Err(TesseraError::TypeMismatch(format!(
                "unknown element type '{}'",
                other
            ))),
        }
    }
}

/// Provides the canonical string representation for a `TesseraDataType`.
impl fmt::Display for TesseraDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Matches the Arrow `DataType` string representation.
        write!(f, "{:?}", self)
    }
}

/// Where an array's memory lives.
///
/// The encoders index into their inputs element by element, so only
/// host-addressable memory is accepted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
    /// Memory owned by an accelerator runtime, e.g. `kind = "cuda"`.
    Accelerator { kind: String, id: u32 },
}

impl Device {
    /// Maps a DLPack `(device_type, device_id)` pair onto a `Device`.
    /// Pinned host memory (`kDLCUDAHost`, `kDLROCMHost`) is still host-addressable.
    pub fn from_dlpack(device_type: i32, device_id: i32) -> Self {
        let kind = match device_type {
            1 | 3 | 11 => return Device::Cpu,
            2 => "cuda",
            4 => "opencl",
            7 => "vulkan",
            8 => "metal",
            10 => "rocm",
            _ => "unknown",
        };
        Device::Accelerator {
            kind: kind.to_string(),
            id: device_id.max(0) as u32,
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, Device::Cpu)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Accelerator { kind, id } => write!(f, "{}:{}", kind, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_type_roundtrip() {
        for dt in [
            TesseraDataType::Int32,
            TesseraDataType::UInt64,
            TesseraDataType::Float16,
            TesseraDataType::Boolean,
        ] {
            assert_eq!(TesseraDataType::from_arrow_type(&dt.to_arrow_type()).unwrap(), dt);
        }
    }

    #[test]
    fn test_unsupported_arrow_type() {
        let result = TesseraDataType::from_arrow_type(&ArrowDataType::Utf8);
        assert!(matches!(result, Err(TesseraError::TypeMismatch(_))));
    }

    #[test]
    fn test_widths() {
        assert_eq!(TesseraDataType::Int32.bit_width(), 32);
        assert_eq!(TesseraDataType::Float64.byte_width(), 8);
        assert_eq!(TesseraDataType::Float16.byte_width(), 2);
        assert!(TesseraDataType::UInt32.is_integer());
        assert!(!TesseraDataType::Float32.is_integer());
    }

    #[test]
    fn test_names() {
        assert_eq!(TesseraDataType::from_name("Float32").unwrap(), TesseraDataType::Float32);
        assert_eq!(TesseraDataType::from_name("uint16").unwrap(), TesseraDataType::UInt16);
        assert!(TesseraDataType::from_name("complex64").is_err());
    }

    #[test]
    fn test_dlpack_devices() {
        assert_eq!(Device::from_dlpack(1, 0), Device::Cpu);
        assert_eq!(Device::from_dlpack(3, 0), Device::Cpu);
        let cuda = Device::from_dlpack(2, 1);
        assert!(!cuda.is_host());
        assert_eq!(cuda.to_string(), "cuda:1");
    }
}
