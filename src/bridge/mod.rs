// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the public-facing API of the tessera library. It owns the boundary
// between the outside world (Arrow arrays, JSON configuration) and the pure kernels.
//
// Data Flow:
//
//   1. [Caller / FFI]                 -> pyarrow arrays + `ConversionConfig`
//         |
//         `-> `arrow_impl` turns each array into an `IndexArray` (zero-copy)
//
//   2. [Stateless API (convert)]      -> `ConversionInputs` (CSR or CSF)
//         |
//         `-> a. checks dtype/device and validates the structure into a view
//         |
//         `-> b. dispatches on `FormatSpec` to the matching kernel
//
//   3. [Kernels]                      -> `ConversionOutput` (shaped ndarrays)
//         |
//         `-> optional `analyze` pass -> `LayoutStats`
//
//   4. [arrow_impl::output_to_arrow]  -> flat `Int32Array`s tagged with shapes
//
// ====================================================================================
pub mod arrow_impl;
pub(crate) mod format;
pub mod stateless_api;

pub use format::{LayoutStats, NamedArray};
pub use stateless_api::{
    analyze, convert, ConversionInputs, ConversionOutput, ConversionResult, CsfInputs, CsrInputs,
};
