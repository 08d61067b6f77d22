// In: src/error.rs

//! This module defines the single, unified error type for the entire tessera library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! The first four variants are the conversion taxonomy: the first three are caller
//! errors and are never retried, the fourth signals a defect in an encoder and must
//! abort the conversion instead of handing back a malformed array.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TesseraError {
    // =========================================================================
    // === Conversion Errors
    // =========================================================================
    /// An index array does not use a 32-bit integer element type.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// An array is not resident in ordinary host memory.
    #[error("Unsupported device: {0}")]
    UnsupportedDevice(String),

    /// Malformed parameters or a malformed index structure.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal invariant violation (this is a bug): {0}")]
    InternalInvariantViolation(String),

    // =========================================================================
    // === External Error Wrappers
    // =========================================================================
    /// An error originating from the Arrow library.
    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// An error from the Serde JSON library, typically while parsing a `ConversionConfig`.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// An error from a safe byte-casting operation failing.
    #[error("Byte slice casting error: {0}")]
    PodCast(String), // bytemuck::PodCastError doesn't impl Error

    /// An error for Python FFI operations.
    #[error("FFI operation failed: {0}")]
    FfiError(String),
}

impl TesseraError {
    /// Returns `true` for errors caused by the caller's inputs or parameters.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            TesseraError::TypeMismatch(_)
                | TesseraError::UnsupportedDevice(_)
                | TesseraError::InvalidArgument(_)
        )
    }
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<bytemuck::PodCastError> for TesseraError {
    fn from(err: bytemuck::PodCastError) -> Self {
        TesseraError::PodCast(err.to_string())
    }
}

/// Every output array is built from a buffer whose length was computed by the
/// encoder itself, so a shape error here means the padding bookkeeping is off.
impl From<ndarray::ShapeError> for TesseraError {
    fn from(err: ndarray::ShapeError) -> Self {
        TesseraError::InternalInvariantViolation(format!("output shape mismatch: {}", err))
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for TesseraError {
    fn from(err: pyo3::PyErr) -> Self {
        TesseraError::FfiError(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<TesseraError> for pyo3::PyErr {
    fn from(err: TesseraError) -> pyo3::PyErr {
        match err {
            TesseraError::TypeMismatch(_) => pyo3::exceptions::PyTypeError::new_err(err.to_string()),
            TesseraError::InternalInvariantViolation(_) => {
                pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
            }
            _ => pyo3::exceptions::PyValueError::new_err(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_error_classification() {
        assert!(TesseraError::TypeMismatch("x".into()).is_caller_error());
        assert!(TesseraError::UnsupportedDevice("x".into()).is_caller_error());
        assert!(TesseraError::InvalidArgument("x".into()).is_caller_error());
        assert!(!TesseraError::InternalInvariantViolation("x".into()).is_caller_error());
    }

    #[test]
    fn test_shape_error_maps_to_invariant_violation() {
        let shape_err = ndarray::Array2::<i32>::from_shape_vec((2, 2), vec![1, 2, 3]).unwrap_err();
        let err: TesseraError = shape_err.into();
        assert!(matches!(err, TesseraError::InternalInvariantViolation(_)));
    }
}
