//! This module contains the pure bucket-assignment function shared by every
//! bucketed encoder.
//!
//! A bucket list is an ascending sequence of slot widths. A row of degree `d` is
//! assigned to the narrowest bucket whose width can hold it; rows wider than the
//! widest bucket are clamped to the last ("overflow") bucket and later span
//! several slots of that width.

use crate::error::TesseraError;

/// Returns the smallest index `i` such that `widths[i] >= degree`, or the last
/// index if no width is large enough.
///
/// This is a binary search for the first width strictly greater than
/// `degree - 1`, so a degree exactly equal to a width maps to that bucket.
///
/// # Errors
/// Returns `InvalidArgument` if `widths` is empty.
pub fn assign_bucket(degree: usize, widths: &[usize]) -> Result<usize, TesseraError> {
    if widths.is_empty() {
        return Err(TesseraError::InvalidArgument(
            "bucket width list must not be empty".to_string(),
        ));
    }
    let idx = widths.partition_point(|&w| w < degree);
    Ok(idx.min(widths.len() - 1))
}

/// Checks a bucket width list before any packing happens.
///
/// Every width must be positive. When `strict` is set the list must also be
/// strictly ascending; otherwise ordering is the caller's responsibility.
pub fn validate_widths(name: &str, widths: &[usize], strict: bool) -> Result<(), TesseraError> {
    if widths.is_empty() {
        return Err(TesseraError::InvalidArgument(format!(
            "{} must not be empty",
            name
        )));
    }
    if let Some(pos) = widths.iter().position(|&w| w == 0) {
        return Err(TesseraError::InvalidArgument(format!(
            "{}[{}] is zero; bucket widths must be positive",
            name, pos
        )));
    }
    if strict {
        if let Some(pos) = widths.windows(2).position(|w| w[0] >= w[1]) {
            return Err(TesseraError::InvalidArgument(format!(
                "{} must be strictly ascending, got {} then {}",
                name,
                widths[pos],
                widths[pos + 1]
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_width_maps_to_that_bucket() {
        let widths = [2, 4, 8];
        assert_eq!(assign_bucket(2, &widths).unwrap(), 0);
        assert_eq!(assign_bucket(4, &widths).unwrap(), 1);
        assert_eq!(assign_bucket(8, &widths).unwrap(), 2);
    }

    #[test]
    fn test_between_widths_rounds_up() {
        let widths = [2, 4, 8];
        assert_eq!(assign_bucket(1, &widths).unwrap(), 0);
        assert_eq!(assign_bucket(3, &widths).unwrap(), 1);
        assert_eq!(assign_bucket(5, &widths).unwrap(), 2);
    }

    #[test]
    fn test_zero_degree_is_first_bucket() {
        assert_eq!(assign_bucket(0, &[1, 2]).unwrap(), 0);
    }

    #[test]
    fn test_overflow_clamps_to_last_bucket() {
        assert_eq!(assign_bucket(100, &[2, 4]).unwrap(), 1);
        assert_eq!(assign_bucket(5, &[4]).unwrap(), 0);
    }

    #[test]
    fn test_monotonic_over_degrees() {
        let widths = [1, 3, 7, 16, 32];
        let mut prev = 0;
        for degree in 0..64 {
            let b = assign_bucket(degree, &widths).unwrap();
            assert!(b >= prev, "bucket decreased at degree {}", degree);
            prev = b;
        }
    }

    #[test]
    fn test_empty_widths_error() {
        assert!(matches!(
            assign_bucket(1, &[]),
            Err(TesseraError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_widths() {
        assert!(validate_widths("buckets", &[1, 2, 4], true).is_ok());
        assert!(validate_widths("buckets", &[4, 2], false).is_ok());
        assert!(validate_widths("buckets", &[2, 2], true).is_err());
        assert!(validate_widths("buckets", &[0, 2], false).is_err());
        assert!(validate_widths("buckets", &[], false).is_err());
    }
}
