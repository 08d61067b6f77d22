//! This module defines the core, strongly-typed data representations used
//! throughout the tessera encoders.
//!
//! It includes the canonical `TesseraDataType` enum, the device tag that guards
//! every conversion, the owned array containers accepted at the library boundary,
//! and the validated borrowed views (`CsrMatrix`, `CsfRelations`) the kernels
//! actually walk.

pub mod csr;
pub mod index_array;
pub mod tessera_data_type;

// Re-export the main types for easier access.
pub use csr::{CsfRelations, CsrMatrix};
pub use index_array::{IndexArray, ValueBuffer};
pub use tessera_data_type::{Device, TesseraDataType};
