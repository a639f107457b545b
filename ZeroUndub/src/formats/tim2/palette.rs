//! CLUT layout conversion
//!
//! 256-color CLUTs are stored in the GS "CSM1" order: within every group of
//! 32 entries, entries 8..16 and 16..24 are swapped. Arithmetic on colors
//! needs the linear order, so palettes are de-interleaved after reading and
//! re-interleaved before writing. The permutation is its own inverse.

/// Entries per interleave group
const GROUP: usize = 32;
const BLOCKS: usize = 2;
const STRIPES: usize = 2;
const COLORS: usize = 8;

/// Source position of every linear palette entry.
///
/// Entries past the last whole group map to themselves.
#[must_use]
pub fn interleave_map(len: usize) -> Vec<usize> {
    let mut map = Vec::with_capacity(len);

    for part in 0..len / GROUP {
        for block in 0..BLOCKS {
            for stripe in 0..STRIPES {
                for color in 0..COLORS {
                    map.push(part * GROUP + block * COLORS + stripe * STRIPES * COLORS + color);
                }
            }
        }
    }
    map.extend(map.len()..len);
    map
}

/// Convert a stored palette to linear order
#[must_use]
pub fn deinterleave<T: Copy>(palette: &[T]) -> Vec<T> {
    interleave_map(palette.len())
        .into_iter()
        .map(|source| palette[source])
        .collect()
}

/// Convert a linear palette back to stored order
#[must_use]
pub fn reinterleave<T: Copy>(palette: &[T]) -> Vec<T> {
    let mut out = palette.to_vec();
    for (index, target) in interleave_map(palette.len()).into_iter().enumerate() {
        out[target] = palette[index];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_swaps_middle_stripes() {
        let palette: Vec<usize> = (0..32).collect();
        let linear = deinterleave(&palette);

        assert_eq!(&linear[0..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(&linear[8..16], &[16, 17, 18, 19, 20, 21, 22, 23]);
        assert_eq!(&linear[16..24], &[8, 9, 10, 11, 12, 13, 14, 15]);
        assert_eq!(&linear[24..32], &[24, 25, 26, 27, 28, 29, 30, 31]);
    }

    #[test]
    fn test_reinterleave_inverts_deinterleave() {
        let palette: Vec<u16> = (0..256).map(|i| (i * 7 + 3) % 1000).collect();
        assert_eq!(reinterleave(&deinterleave(&palette)), palette);
        assert_eq!(deinterleave(&reinterleave(&palette)), palette);
    }

    #[test]
    fn test_short_palette_is_untouched() {
        let palette: Vec<u8> = (0..16).collect();
        assert_eq!(deinterleave(&palette), palette);
    }
}
