//! This file is the root of the `tessera` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of our library (`kernels`, `bridge`, etc.)
//!     so the Rust compiler knows they exist.
//! 2.  Defining the `#[pymodule]` which acts as the main entry point when the
//!     compiled library is imported into Python (`python` feature only).

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
mod observability; // Make macros available throughout the crate

// Used by `log_metric!` from downstream crates.
#[doc(hidden)]
pub use log;

pub mod bridge;
pub mod config;
pub mod error;
pub mod kernels;
pub mod types;

#[cfg(feature = "python")]
mod ffi;

pub use error::TesseraError;

//==================================================================================
// 2. Python Module Definition
//==================================================================================
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The `tessera` Python module, containing all exposed Rust functions.
#[cfg(feature = "python")]
#[pymodule]
fn tessera(py: Python, m: &PyModule) -> PyResult<()> {
    // --- Encoders ---
    m.add_function(wrap_pyfunction!(ffi::column_part_hyb_py, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::column_part_hyb_flat_py, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::csf_to_ell3d_py, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::csf_to_ell3d_flat_py, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::condense_py, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::ell_row_reshape_py, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::ell_value_repack_py, m)?)?;

    // --- Config-driven entry point ---
    m.add_function(wrap_pyfunction!(ffi::convert_json_py, m)?)?;

    // --- Expose the custom error type ---
    m.add("TesseraError", py.get_type::<pyo3::exceptions::PyValueError>())?;

    m.add("__version__", VERSION)?;

    m.add_function(wrap_pyfunction!(ffi::enable_verbose_logging_py, m)?)?;

    Ok(())
}
