// In: src/ffi/mod.rs

//! Python bindings. Compiled only with the `python` feature.

pub mod python;

pub use python::{
    column_part_hyb_flat_py, column_part_hyb_py, condense_py, convert_json_py,
    csf_to_ell3d_flat_py, csf_to_ell3d_py, ell_row_reshape_py, ell_value_repack_py,
    enable_verbose_logging_py,
};
