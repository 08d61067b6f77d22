// In: src/bridge/stateless_api.rs

use crate::bridge::format::LayoutStats;
use crate::config::{ConversionConfig, FormatSpec, Layout};
use crate::error::TesseraError;
use crate::kernels::{
    self, ColumnPartHyb, ColumnPartHybFlat, CondensedTiles, EllReshaped, RelationalEll3d,
    RelationalEll3dFlat,
};
use crate::types::{CsfRelations, CsrMatrix, IndexArray};

//==================================================================================
// 1. Inputs & Outputs
//==================================================================================

/// A CSR structure at the library boundary.
#[derive(Debug, Clone)]
pub struct CsrInputs {
    /// Column count; inferred as `max(indices) + 1` when absent.
    pub num_cols: Option<usize>,
    pub indptr: IndexArray,
    pub indices: IndexArray,
}

/// A two-level CSF structure at the library boundary.
#[derive(Debug, Clone)]
pub struct CsfInputs {
    pub indptr0: IndexArray,
    pub indices0: IndexArray,
    pub indptr1: IndexArray,
    pub indices1: IndexArray,
}

#[derive(Debug, Clone)]
pub enum ConversionInputs {
    Csr(CsrInputs),
    Csf(CsfInputs),
}

impl ConversionInputs {
    fn kind(&self) -> &'static str {
        match self {
            ConversionInputs::Csr(_) => "CSR",
            ConversionInputs::Csf(_) => "CSF",
        }
    }
}

impl CsrInputs {
    pub fn new(indptr: IndexArray, indices: IndexArray) -> Self {
        Self {
            num_cols: None,
            indptr,
            indices,
        }
    }

    /// Runs the common 32-bit/host checks and validates the CSR structure.
    pub fn view(&self) -> Result<CsrMatrix<'_>, TesseraError> {
        let indptr = self.indptr.as_i32("indptr")?;
        let indices = self.indices.as_i32("indices")?;
        match self.num_cols {
            Some(num_cols) => {
                CsrMatrix::new(indptr.len().saturating_sub(1), num_cols, indptr, indices)
            }
            None => CsrMatrix::from_indptr(indptr, indices),
        }
    }
}

impl CsfInputs {
    pub fn view(&self) -> Result<CsfRelations<'_>, TesseraError> {
        CsfRelations::new(
            self.indptr0.as_i32("indptr0")?,
            self.indices0.as_i32("indices0")?,
            self.indptr1.as_i32("indptr1")?,
            self.indices1.as_i32("indices1")?,
        )
    }
}

/// The encoded layout, one variant per kernel output shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutput {
    ColumnPartHyb(ColumnPartHyb),
    ColumnPartHybFlat(ColumnPartHybFlat),
    Relational(RelationalEll3d),
    RelationalFlat(RelationalEll3dFlat),
    Condensed(CondensedTiles),
    Reshaped(EllReshaped),
}

#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub output: ConversionOutput,
    /// Present when `collect_stats` was set.
    pub stats: Option<LayoutStats>,
}

//==================================================================================
// 2. Stateless API
//==================================================================================

/// Converts one sparse structure into the format named by `config`.
///
/// # Errors
/// `InvalidArgument` if the config is malformed or the input kind does not match
/// the format (CSF for the relational encoder, CSR for everything else), plus
/// whatever the selected kernel reports.
pub fn convert(
    config: &ConversionConfig,
    inputs: &ConversionInputs,
) -> Result<ConversionResult, TesseraError> {
    config.validate()?;

    let output = match (&config.format, inputs) {
        (
            FormatSpec::ColumnPartHyb {
                num_col_parts,
                buckets,
                layout,
            },
            ConversionInputs::Csr(csr),
        ) => {
            let csr = csr.view()?;
            match layout {
                Layout::Nested => ConversionOutput::ColumnPartHyb(kernels::column_part_hyb(
                    &csr,
                    *num_col_parts,
                    buckets,
                )?),
                Layout::Flat => ConversionOutput::ColumnPartHybFlat(
                    kernels::column_part_hyb_flat(&csr, *num_col_parts, buckets)?,
                ),
            }
        }
        (
            FormatSpec::RelationalBucketed {
                row_buckets,
                col_buckets,
                layout,
            },
            ConversionInputs::Csf(csf),
        ) => {
            let csf = csf.view()?;
            match layout {
                Layout::Nested => ConversionOutput::Relational(kernels::csf_to_ell3d(
                    &csf,
                    row_buckets,
                    col_buckets,
                )?),
                Layout::Flat => ConversionOutput::RelationalFlat(kernels::csf_to_ell3d_flat(
                    &csf,
                    row_buckets,
                    col_buckets,
                )?),
            }
        }
        (
            FormatSpec::TileGroupCondense {
                tile_size,
                group_size,
                threshold,
            },
            ConversionInputs::Csr(csr),
        ) => ConversionOutput::Condensed(kernels::condense(
            &csr.view()?,
            *tile_size,
            *group_size,
            *threshold,
        )?),
        (FormatSpec::EllRowReshape { col_size }, ConversionInputs::Csr(csr)) => {
            let view = csr.view()?;
            ConversionOutput::Reshaped(kernels::ell_row_reshape(
                view.num_rows(),
                view.nnz(),
                *col_size,
                view.indptr(),
                view.indices(),
            )?)
        }
        (format, inputs) => {
            return Err(TesseraError::InvalidArgument(format!(
                "format '{}' expects {} inputs, got {}",
                format.name(),
                if format.expects_csf() { "CSF" } else { "CSR" },
                inputs.kind()
            )));
        }
    };

    let stats = config.collect_stats.then(|| analyze(&output));
    match &stats {
        Some(stats) => log::info!(
            "converted {} input to {}: {} nnz in {} slots ({:.1}% padding)",
            inputs.kind(),
            config.format.name(),
            stats.nnz,
            stats.capacity,
            stats.padding_ratio * 100.0
        ),
        None => log::info!(
            "converted {} input to {}",
            inputs.kind(),
            config.format.name()
        ),
    }

    Ok(ConversionResult { output, stats })
}

fn count_ones<'a>(masks: impl IntoIterator<Item = &'a i32>) -> usize {
    masks.into_iter().filter(|&&m| m != 0).count()
}

/// Measures how much padding a produced layout carries.
pub fn analyze(output: &ConversionOutput) -> LayoutStats {
    match output {
        ConversionOutput::ColumnPartHyb(hyb) => {
            let mut bucket_slots = vec![0usize; hyb.buckets.len()];
            let (mut nnz, mut capacity) = (0, 0);
            for part in &hyb.parts {
                for (b, slots) in part.iter().enumerate() {
                    bucket_slots[b] += slots.num_slots();
                    nnz += count_ones(&slots.mask);
                    capacity += slots.mask.len();
                }
            }
            LayoutStats::new("column_part_hyb", nnz, capacity, bucket_slots)
        }
        ConversionOutput::ColumnPartHybFlat(flat) => {
            let nnz = flat.per_bucket.iter().map(|b| count_ones(&b.mask)).sum();
            let capacity = flat.per_bucket.iter().map(|b| b.mask.len()).sum();
            let bucket_slots = flat.per_bucket.iter().map(|b| b.nnz_row).collect();
            LayoutStats::new("column_part_hyb", nnz, capacity, bucket_slots)
        }
        ConversionOutput::Relational(ell) => {
            let (mut nnz, mut capacity) = (0, 0);
            let mut bucket_slots = Vec::with_capacity(ell.buckets.len());
            for rels in &ell.buckets {
                let mut row_slots = 0;
                for tiles in rels {
                    row_slots += tiles.row_indices.len();
                    nnz += count_ones(&tiles.mask);
                    capacity += tiles.mask.len();
                }
                bucket_slots.push(row_slots);
            }
            LayoutStats::new("relational_bucketed", nnz, capacity, bucket_slots)
        }
        ConversionOutput::RelationalFlat(ell) => {
            let nnz = ell.buckets.iter().map(|b| count_ones(&b.mask)).sum();
            let capacity = ell.buckets.iter().map(|b| b.mask.len()).sum();
            let bucket_slots = ell.buckets.iter().map(|b| b.row_indices.len()).collect();
            LayoutStats::new("relational_bucketed", nnz, capacity, bucket_slots)
        }
        ConversionOutput::Condensed(tiles) => {
            let diverted = tiles.remainder.as_ref().map_or(0, |r| r.nnz());
            LayoutStats::new(
                "tile_group_condense",
                count_ones(&tiles.mask) + diverted,
                tiles.mask.len() + diverted,
                vec![tiles.num_groups()],
            )
        }
        ConversionOutput::Reshaped(ell) => {
            let capacity = ell.col_indices.len();
            let padding: i32 = ell.row_padding_num.sum();
            LayoutStats::new(
                "ell_row_reshape",
                capacity - padding as usize,
                capacity,
                vec![ell.num_sub_rows()],
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_inputs() -> ConversionInputs {
        ConversionInputs::Csr(CsrInputs::new(
            IndexArray::from_vec_i32(vec![0, 2, 5, 5, 6]),
            IndexArray::from_vec_i32(vec![1, 3, 0, 2, 4, 1]),
        ))
    }

    #[test]
    fn test_analyze_after_column_part_conversion() {
        // 1. Arrange: the 4-row scenario with buckets [2, 4] and stats enabled.
        let mut config = ConversionConfig::new(FormatSpec::ColumnPartHyb {
            num_col_parts: 1,
            buckets: vec![2, 4],
            layout: Layout::Nested,
        });
        config.collect_stats = true;

        // 2. Act
        let result = convert(&config, &scenario_inputs()).unwrap();
        let stats = result.stats.unwrap();

        // 3. Assert: two width-2 slots and one width-4 slot hold the 6 nonzeros.
        assert_eq!(stats.format, "column_part_hyb");
        assert_eq!(stats.nnz, 6);
        assert_eq!(stats.capacity, 8);
        assert_eq!(stats.padding(), 2);
        assert_eq!(stats.bucket_slots, vec![2, 1]);
        assert!((stats.padding_ratio - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_stats_absent_unless_requested() {
        let config = ConversionConfig::new(FormatSpec::EllRowReshape { col_size: 2 });
        let result = convert(&config, &scenario_inputs()).unwrap();
        assert!(result.stats.is_none());
        match result.output {
            ConversionOutput::Reshaped(ell) => assert_eq!(ell.num_sub_rows(), 4),
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_input_kind_mismatch_rejected() {
        let config = ConversionConfig::new(FormatSpec::RelationalBucketed {
            row_buckets: vec![1],
            col_buckets: vec![2],
            layout: Layout::Nested,
        });
        let err = convert(&config, &scenario_inputs()).unwrap_err();
        assert!(matches!(err, TesseraError::InvalidArgument(_)));
    }
}
