//! Payload layout planning

use crate::container::SECTOR_SIZE;
use crate::error::{Error, Result};

/// Slot granularities in sectors, tried in order. 0 packs slots back to back.
pub const ALIGNMENTS: [u64; 6] = [16, 8, 4, 2, 1, 0];

/// Slot positions of a planned payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Granularity in sectors, 0 for byte packing
    pub alignment: u64,
    /// Byte offset of every slot, in the order the sizes were given
    pub offsets: Vec<u64>,
    /// Bytes covered by all slots
    pub total: u64,
}

impl Layout {
    /// Sector of every slot, or `None` if a slot does not start on a
    /// sector boundary.
    #[must_use]
    pub fn sectors(&self) -> Option<Vec<u64>> {
        self.offsets
            .iter()
            .map(|&offset| (offset % SECTOR_SIZE == 0).then_some(offset / SECTOR_SIZE))
            .collect()
    }

    /// End of the slot at `position`: the next slot's start, or the layout
    /// total for the last slot.
    #[must_use]
    pub fn slot_end(&self, position: usize) -> u64 {
        self.offsets.get(position + 1).copied().unwrap_or(self.total)
    }
}

/// Lay out slots of the given sizes, back to back, at one granularity.
#[must_use]
pub fn layout_with_alignment(sizes: &[u64], alignment: u64) -> Layout {
    let unit = alignment * SECTOR_SIZE;
    let mut offsets = Vec::with_capacity(sizes.len());
    let mut cursor = 0u64;

    for &size in sizes {
        offsets.push(cursor);
        cursor += if unit == 0 {
            size
        } else {
            size.div_ceil(unit) * unit
        };
    }

    Layout {
        alignment,
        offsets,
        total: cursor,
    }
}

/// Pick the coarsest granularity whose layout fits `capacity`.
///
/// # Errors
/// Returns [`Error::CapacityExceeded`] when no granularity fits, or when
/// only byte packing fits but leaves a slot off a sector boundary.
pub fn plan_layout(sizes: &[u64], capacity: u64) -> Result<Layout> {
    let mut required = 0;

    for alignment in ALIGNMENTS {
        let layout = layout_with_alignment(sizes, alignment);
        if layout.total > capacity {
            required = layout.total;
            continue;
        }
        if layout.sectors().is_none() {
            tracing::warn!("Byte-packed layout fits but is not sector aligned");
            break;
        }

        tracing::info!(
            "Planned layout at {} sector alignment: {} of {} bytes",
            alignment,
            layout.total,
            capacity
        );
        return Ok(layout);
    }

    Err(Error::CapacityExceeded { required, capacity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SIZES: [u64; 3] = [2048, 5000, 1];

    #[test]
    fn test_sixteen_sector_slots() {
        let layout = layout_with_alignment(&SIZES, 16);
        assert_eq!(layout.sectors().unwrap(), vec![0, 16, 32]);
        assert_eq!(layout.total, 48 * SECTOR_SIZE);
        assert!(layout.offsets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_picks_coarsest_fitting_alignment() {
        let cases = [
            (48 * SECTOR_SIZE, 16),
            (24 * SECTOR_SIZE, 8),
            (12 * SECTOR_SIZE, 4),
            (8 * SECTOR_SIZE, 2),
            (5 * SECTOR_SIZE, 1),
        ];
        for (capacity, alignment) in cases {
            assert_eq!(plan_layout(&SIZES, capacity).unwrap().alignment, alignment);
        }
    }

    #[test]
    fn test_byte_packing_on_sector_boundaries() {
        let layout = plan_layout(&[2048, 4096, 1], 6145).unwrap();
        assert_eq!(layout.alignment, 0);
        assert_eq!(layout.sectors().unwrap(), vec![0, 1, 3]);
        assert_eq!(layout.slot_end(2), 6145);
    }

    #[test]
    fn test_overflow() {
        let err = plan_layout(&SIZES, 7000).unwrap_err();
        assert!(matches!(
            err,
            Error::CapacityExceeded {
                required: 7049,
                capacity: 7000
            }
        ));
    }

    #[test]
    fn test_unaligned_byte_packing_is_rejected() {
        // Fits in bytes, but the second slot would start at byte 2048 + 5000
        let err = plan_layout(&SIZES, 8000).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { .. }));
    }
}
