// In: src/config.rs

//! The single source of truth for all Tessera conversion configuration.
//!
//! A `ConversionConfig` is built once at the application boundary (typically
//! from a JSON string handed over by Python) and passed by reference to the
//! `bridge`, which dispatches on its `FormatSpec` to the matching kernel.

use serde::{Deserialize, Serialize};

use crate::error::TesseraError;
use crate::kernels::bucket::validate_widths;

//==================================================================================
// I. Format Selection
//==================================================================================

/// Which serialization an encoder with two output shapes should produce.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// **Default:** one array set per (partition or relation, bucket).
    #[default]
    Nested,
    /// One concatenated array set per bucket.
    Flat,
}

/// The target sparse format and its parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatSpec {
    /// Column-partitioned hybrid ELL.
    ColumnPartHyb {
        #[serde(default = "default_num_col_parts")]
        num_col_parts: usize,
        buckets: Vec<usize>,
        #[serde(default)]
        layout: Layout,
    },

    /// Two-level (relation -> row -> column) bucketed 3-D ELL.
    RelationalBucketed {
        row_buckets: Vec<usize>,
        col_buckets: Vec<usize>,
        #[serde(default)]
        layout: Layout,
    },

    /// `t x 1` column tiles grouped `g` at a time. With a `threshold`, column
    /// tiles below it are diverted into a DCSR remainder.
    TileGroupCondense {
        tile_size: usize,
        group_size: usize,
        #[serde(default)]
        threshold: Option<usize>,
    },

    /// Fixed-width row splitting.
    EllRowReshape { col_size: usize },
}

impl FormatSpec {
    /// A short, stable name used in logs and statistics.
    pub fn name(&self) -> &'static str {
        match self {
            FormatSpec::ColumnPartHyb { .. } => "column_part_hyb",
            FormatSpec::RelationalBucketed { .. } => "relational_bucketed",
            FormatSpec::TileGroupCondense { .. } => "tile_group_condense",
            FormatSpec::EllRowReshape { .. } => "ell_row_reshape",
        }
    }

    /// True if this format consumes a two-level CSF structure rather than CSR.
    pub fn expects_csf(&self) -> bool {
        matches!(self, FormatSpec::RelationalBucketed { .. })
    }
}

fn default_num_col_parts() -> usize {
    1
}

//==================================================================================
// II. The Unified ConversionConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ConversionConfig {
    pub format: FormatSpec,

    /// If true, `convert` also returns padding statistics for the produced layout.
    #[serde(default)]
    pub collect_stats: bool,
}

impl ConversionConfig {
    pub fn new(format: FormatSpec) -> Self {
        Self {
            format,
            collect_stats: false,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, TesseraError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, TesseraError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Checks parameter sanity without touching any input data.
    ///
    /// # Errors
    /// `InvalidArgument` for empty or zero-width bucket lists, mismatched
    /// relational bucket lists, non-ascending column buckets, or zero
    /// partition/tile/group/column sizes.
    pub fn validate(&self) -> Result<(), TesseraError> {
        match &self.format {
            FormatSpec::ColumnPartHyb {
                num_col_parts,
                buckets,
                ..
            } => {
                require_positive("num_col_parts", *num_col_parts)?;
                validate_widths("buckets", buckets, false)?;
            }
            FormatSpec::RelationalBucketed {
                row_buckets,
                col_buckets,
                ..
            } => {
                validate_widths("row_buckets", row_buckets, false)?;
                validate_widths("col_buckets", col_buckets, true)?;
                if row_buckets.len() != col_buckets.len() {
                    return Err(TesseraError::InvalidArgument(format!(
                        "row_buckets has {} entries but col_buckets has {}",
                        row_buckets.len(),
                        col_buckets.len()
                    )));
                }
            }
            FormatSpec::TileGroupCondense {
                tile_size,
                group_size,
                ..
            } => {
                require_positive("tile_size", *tile_size)?;
                require_positive("group_size", *group_size)?;
            }
            FormatSpec::EllRowReshape { col_size } => {
                require_positive("col_size", *col_size)?;
            }
        }
        Ok(())
    }
}

fn require_positive(name: &str, value: usize) -> Result<(), TesseraError> {
    if value == 0 {
        return Err(TesseraError::InvalidArgument(format!(
            "{} must be positive",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_part_with_defaults() {
        let config =
            ConversionConfig::from_json(r#"{"format": {"kind": "column_part_hyb", "buckets": [2, 4]}}"#)
                .unwrap();
        assert_eq!(
            config.format,
            FormatSpec::ColumnPartHyb {
                num_col_parts: 1,
                buckets: vec![2, 4],
                layout: Layout::Nested,
            }
        );
        assert!(!config.collect_stats);
    }

    #[test]
    fn test_parse_condense_with_threshold() {
        let json = r#"{
            "format": {"kind": "tile_group_condense", "tile_size": 16, "group_size": 8, "threshold": 2},
            "collect_stats": true
        }"#;
        let config = ConversionConfig::from_json(json).unwrap();
        assert_eq!(config.format.name(), "tile_group_condense");
        assert!(config.collect_stats);
        match config.format {
            FormatSpec::TileGroupCondense { threshold, .. } => assert_eq!(threshold, Some(2)),
            other => panic!("unexpected format {:?}", other),
        }
    }

    #[test]
    fn test_json_survives_serialization() {
        let config = ConversionConfig::new(FormatSpec::RelationalBucketed {
            row_buckets: vec![4, 2],
            col_buckets: vec![1, 8],
            layout: Layout::Flat,
        });
        let json = config.to_json().unwrap();
        assert!(json.contains("\"kind\":\"relational_bucketed\""));
        assert!(json.contains("\"layout\":\"flat\""));
        assert_eq!(ConversionConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let bad = [
            FormatSpec::ColumnPartHyb {
                num_col_parts: 0,
                buckets: vec![2],
                layout: Layout::Nested,
            },
            FormatSpec::ColumnPartHyb {
                num_col_parts: 1,
                buckets: vec![],
                layout: Layout::Nested,
            },
            FormatSpec::RelationalBucketed {
                row_buckets: vec![1],
                col_buckets: vec![1, 2],
                layout: Layout::Nested,
            },
            FormatSpec::RelationalBucketed {
                row_buckets: vec![1, 1],
                col_buckets: vec![4, 2],
                layout: Layout::Nested,
            },
            FormatSpec::TileGroupCondense {
                tile_size: 0,
                group_size: 4,
                threshold: None,
            },
            FormatSpec::EllRowReshape { col_size: 0 },
        ];
        for format in bad {
            let err = ConversionConfig::new(format.clone()).validate().unwrap_err();
            assert!(
                matches!(err, TesseraError::InvalidArgument(_)),
                "{:?} should be rejected",
                format
            );
        }
    }

    #[test]
    fn test_width_errors_match_the_kernels() {
        let format = FormatSpec::RelationalBucketed {
            row_buckets: vec![1, 1],
            col_buckets: vec![4, 2],
            layout: Layout::Nested,
        };
        let from_config = ConversionConfig::new(format).validate().unwrap_err();
        let from_kernel = validate_widths("col_buckets", &[4, 2], true).unwrap_err();
        assert_eq!(from_config.to_string(), from_kernel.to_string());

        let format = FormatSpec::ColumnPartHyb {
            num_col_parts: 1,
            buckets: vec![2, 0],
            layout: Layout::Nested,
        };
        let err = ConversionConfig::new(format).validate().unwrap_err();
        assert!(err.to_string().contains("buckets[1] is zero"));
    }

    #[test]
    fn test_unknown_kind_is_a_serde_error() {
        let err = ConversionConfig::from_json(r#"{"format": {"kind": "coo"}}"#).unwrap_err();
        assert!(matches!(err, TesseraError::SerdeJson(_)));
    }
}
