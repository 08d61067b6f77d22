// In: src/kernels/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Kernel Layer
// ====================================================================================
//
// Kernels are pure, synchronous functions over borrowed CSR/CSF index slices. They
// know nothing about Arrow, Python or configuration; the `bridge` marshals inputs
// into `CsrMatrix` / `CsfRelations` views and hands them here.
//
//   bucket        -> degree -> bucket id
//   slot_stream   -> fixed-width slot packing shared by the ELL encoders
//   column_part   -> column-partitioned hybrid ELL (nested and flat layouts)
//   relational    -> two-level CSF -> bucketed 3-D ELL (nested and flat layouts)
//   condense      -> t x 1 column tiles grouped g at a time, optional DCSR remainder
//   ell_reshape   -> split rows into fixed-width sub-rows
//   value_repack  -> move value records to match `ell_reshape`
//
// ====================================================================================
pub(crate) mod bucket;
pub(crate) mod slot_stream;

pub mod column_part;
pub mod condense;
pub mod ell_reshape;
pub mod relational;
pub mod value_repack;

pub use column_part::{column_part_hyb, column_part_hyb_flat, ColumnPartHyb, ColumnPartHybFlat};
pub use condense::{condense, CondensedTiles, DcsrRemainder};
pub use ell_reshape::{ell_row_reshape, EllReshaped};
pub use relational::{csf_to_ell3d, csf_to_ell3d_flat, RelationalEll3d, RelationalEll3dFlat};
pub use slot_stream::PAD_COL;
pub use value_repack::ell_value_repack;
