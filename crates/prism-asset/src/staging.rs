//! Staging buffer batch planning.
//!
//! Upload batching reserves one contiguous byte range per payload
//! (vertex data, index data, image pixels) and packs the ranges, in
//! order, into as few staging buffers as the platform's maximum buffer
//! size allows. A buffer is closed only when the next range would not
//! fit, so the sum of planned buffer sizes always equals the sum of the
//! reserved ranges.

use crate::error::{AssetError, Result};
use prism_core::checked;

/// Alignment every reserved range is rounded up to.
///
/// Buffer-to-image copies require 4-byte-aligned source offsets; texel
/// blocks here are RGBA8, so 4 covers every payload kind.
pub const RANGE_ALIGNMENT: u64 = 4;

/// Round a payload size up to the reservation granularity.
pub fn reserve_size(size: u64) -> Result<u64> {
    let aligned = checked::add(size, RANGE_ALIGNMENT - 1)
        .ok_or(AssetError::TooMany("staging bytes"))?;
    Ok(aligned - (aligned % RANGE_ALIGNMENT))
}

/// Where one reserved range landed in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedRange {
    /// Which staging buffer holds the range.
    pub buffer: usize,
    /// Byte offset inside that buffer.
    pub offset: u64,
    /// Reserved size in bytes.
    pub size: u64,
}

/// A complete staging layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPlan {
    /// Exact size of each staging buffer to create.
    pub buffer_sizes: Vec<u64>,
    /// One entry per input range, in input order.
    pub ranges: Vec<PlannedRange>,
}

impl StagingPlan {
    /// Total bytes across all planned buffers.
    pub fn total_bytes(&self) -> u64 {
        self.buffer_sizes.iter().sum()
    }
}

/// Pack reserved ranges into staging buffers of at most `max_buffer_size`.
///
/// Ranges must be non-zero, pre-aligned (see [`reserve_size`]), and no
/// larger than the cap; a larger range cannot be staged because the copy
/// source must be contiguous in one buffer.
pub fn plan_staging(ranges: &[u64], max_buffer_size: u64) -> Result<StagingPlan> {
    if max_buffer_size == 0 {
        return Err(AssetError::Invalid("maximum buffer size is zero".into()));
    }

    let mut buffer_sizes: Vec<u64> = Vec::new();
    let mut planned = Vec::with_capacity(ranges.len());

    for &size in ranges {
        if size == 0 {
            return Err(AssetError::Invalid("empty transfer range".into()));
        }
        if size > max_buffer_size {
            return Err(AssetError::Invalid(format!(
                "transfer range of {size} bytes exceeds the maximum buffer size {max_buffer_size}"
            )));
        }

        // Open a new buffer when the range does not fit the current one
        let fits_current = buffer_sizes
            .last()
            .and_then(|&used| checked::add(used, size))
            .is_some_and(|end| end <= max_buffer_size);

        if !fits_current {
            buffer_sizes.push(0);
        }

        let buffer = buffer_sizes.len() - 1;
        let offset = buffer_sizes[buffer];
        buffer_sizes[buffer] = checked::add(offset, size)
            .ok_or(AssetError::TooMany("staging bytes"))?;

        planned.push(PlannedRange {
            buffer,
            offset,
            size,
        });
    }

    Ok(StagingPlan {
        buffer_sizes,
        ranges: planned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_rounds_to_alignment() {
        assert_eq!(reserve_size(6).unwrap(), 8);
        assert_eq!(reserve_size(8).unwrap(), 8);
        assert_eq!(reserve_size(1).unwrap(), 4);
    }

    #[test]
    fn single_buffer_when_everything_fits() {
        let plan = plan_staging(&[16, 32, 8], 256).unwrap();
        assert_eq!(plan.buffer_sizes, vec![56]);
        assert_eq!(
            plan.ranges,
            vec![
                PlannedRange {
                    buffer: 0,
                    offset: 0,
                    size: 16
                },
                PlannedRange {
                    buffer: 0,
                    offset: 16,
                    size: 32
                },
                PlannedRange {
                    buffer: 0,
                    offset: 48,
                    size: 8
                },
            ]
        );
    }

    #[test]
    fn splits_at_the_size_cap() {
        let plan = plan_staging(&[60, 60, 60], 128).unwrap();
        assert_eq!(plan.buffer_sizes, vec![120, 60]);
        assert_eq!(plan.ranges[2].buffer, 1);
        assert_eq!(plan.ranges[2].offset, 0);
    }

    #[test]
    fn total_bytes_equal_reserved_ranges() {
        let ranges = [100, 200, 44, 4, 96];
        let plan = plan_staging(&ranges, 256).unwrap();
        assert_eq!(plan.total_bytes(), ranges.iter().sum::<u64>());
        assert!(plan.buffer_sizes.iter().all(|&s| s <= 256));
    }

    #[test]
    fn uniform_ranges_use_minimal_buffer_count() {
        // 10 ranges of 64 bytes under a 256-byte cap: exactly
        // ceil(640 / 256) = 3 buffers
        let ranges = [64u64; 10];
        let plan = plan_staging(&ranges, 256).unwrap();
        assert_eq!(plan.buffer_sizes.len(), 3);
    }

    #[test]
    fn rejects_oversized_range() {
        let err = plan_staging(&[512], 256).unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum buffer size"));
    }

    #[test]
    fn rejects_empty_range() {
        assert!(plan_staging(&[0], 256).is_err());
    }
}
