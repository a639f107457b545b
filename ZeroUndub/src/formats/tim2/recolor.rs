//! Recoloring a region of one indexed picture from another
//!
//! The recipient keeps its palette layout and buffer sizes, but the pixels
//! inside the region take the donor's look. Both pictures are expanded to
//! RGBA, the region is matched color by color against the recipient's
//! remaining colors, and any palette slots left free are spent on the donor
//! colors that matched worst. The merged palette is ordered by luminance.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::{Rgba, Roi, TITLE_ROI, Tim2Image, reinterleave};
use crate::error::{Error, Result};

/// Entries in an 8-bit CLUT
const PALETTE_ENTRIES: usize = 256;

/// What a recolor run did, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecolorStats {
    /// Pixels inside the region
    pub region_pixels: usize,
    /// Distinct colors after nearest-color matching
    pub matched_colors: usize,
    /// Donor colors given their own palette slot
    pub promoted_colors: usize,
    /// Distinct colors in the final palette
    pub final_colors: usize,
}

/// Per donor color: worst match distance and the pixels it covers
#[derive(Debug)]
struct DonorColor {
    color: Rgba,
    worst_distance: u32,
    pixels: Vec<usize>,
}

fn distance(a: Rgba, b: Rgba) -> u32 {
    a[..3]
        .iter()
        .zip(&b[..3])
        .map(|(&x, &y)| {
            let d = i32::from(x) - i32::from(y);
            (d * d) as u32
        })
        .sum()
}

fn luminance(color: Rgba) -> f64 {
    0.299 * f64::from(color[0]) + 0.587 * f64::from(color[1]) + 0.114 * f64::from(color[2])
}

/// Merges a donor picture's region into a recipient picture.
#[derive(Debug, Clone, Copy)]
pub struct PaletteRecolorer<'a> {
    roi: Roi<'a>,
}

impl Default for PaletteRecolorer<'static> {
    fn default() -> Self {
        Self::new(TITLE_ROI)
    }
}

impl<'a> PaletteRecolorer<'a> {
    #[must_use]
    pub fn new(roi: Roi<'a>) -> Self {
        Self { roi }
    }

    fn validate(&self, recipient: &Tim2Image, donor: &Tim2Image) -> Result<Vec<usize>> {
        for (role, image) in [("recipient", recipient), ("donor", donor)] {
            let header = &image.header;
            if header.bpp != 8 {
                return Err(Error::invalid_texture(format!(
                    "{role} has {} bits per pixel, expected 8",
                    header.bpp
                )));
            }
            if image.palette.len() != PALETTE_ENTRIES * 4 {
                return Err(Error::invalid_texture(format!(
                    "{role} CLUT holds {} bytes, expected {}",
                    image.palette.len(),
                    PALETTE_ENTRIES * 4
                )));
            }
            if image.pixels.len() != header.pixel_count() {
                return Err(Error::invalid_texture(format!(
                    "{role} pixel data holds {} bytes for {} pixels",
                    image.pixels.len(),
                    header.pixel_count()
                )));
            }
        }

        if (recipient.width(), recipient.height()) != (donor.width(), donor.height()) {
            return Err(Error::invalid_texture(format!(
                "recipient is {}x{} but donor is {}x{}",
                recipient.width(),
                recipient.height(),
                donor.width(),
                donor.height()
            )));
        }

        let region = self.roi.pixels(recipient.width());
        if region.last().is_some_and(|&p| p >= recipient.header.pixel_count()) {
            return Err(Error::invalid_texture("recolor region lies outside the picture"));
        }
        Ok(region)
    }

    /// Recolor serialized TIM2 pictures, returning the new recipient bytes.
    pub fn recolor_bytes(&self, recipient: &[u8], donor: &[u8]) -> Result<Vec<u8>> {
        let recipient = Tim2Image::parse(recipient)?;
        let donor = Tim2Image::parse(donor)?;
        let (recolored, _) = self.recolor(&recipient, &donor)?;
        recolored.to_bytes()
    }

    /// Recolor the region of `recipient` from `donor`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTexture`] unless both pictures are 8-bit
    /// indexed with a 256-entry CLUT and share dimensions, or
    /// [`Error::PaletteOverflow`] if a pixel ends up without a palette slot.
    pub fn recolor(&self, recipient: &Tim2Image, donor: &Tim2Image) -> Result<(Tim2Image, RecolorStats)> {
        let region = self.validate(recipient, donor)?;
        let mut stats = RecolorStats {
            region_pixels: region.len(),
            ..RecolorStats::default()
        };

        let mut image = recipient.rgba_pixels()?;
        let donor_image = donor.rgba_pixels()?;

        let Some(&placeholder) = image.last() else {
            return Err(Error::invalid_texture("recipient has no pixels"));
        };
        for &p in &region {
            image[p] = placeholder;
        }

        let candidates: Vec<Rgba> = image.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

        let mut donors: Vec<DonorColor> = Vec::new();
        let mut donor_slots: HashMap<Rgba, usize> = HashMap::new();

        for &p in &region {
            let wanted = donor_image[p];
            let (nearest, dist) = candidates
                .iter()
                .map(|&c| (c, distance(c, wanted)))
                .min_by_key(|&(_, d)| d)
                .unwrap_or((placeholder, 0));

            let slot = *donor_slots.entry(wanted).or_insert_with(|| {
                donors.push(DonorColor {
                    color: wanted,
                    worst_distance: 0,
                    pixels: Vec::new(),
                });
                donors.len() - 1
            });
            let entry = &mut donors[slot];
            entry.worst_distance = entry.worst_distance.max(dist);
            entry.pixels.push(p);

            image[p] = nearest;
        }

        let mut present: HashSet<Rgba> = image.iter().copied().collect();
        stats.matched_colors = present.len();

        // Stable sort keeps first-seen order among equal distances
        donors.sort_by(|a, b| b.worst_distance.cmp(&a.worst_distance));
        let free = PALETTE_ENTRIES.saturating_sub(present.len());
        for donor_color in donors.iter().filter(|d| d.worst_distance > 0) {
            if stats.promoted_colors == free {
                break;
            }
            if !present.insert(donor_color.color) {
                continue;
            }
            for &p in &donor_color.pixels {
                image[p] = donor_color.color;
            }
            stats.promoted_colors += 1;
        }

        let mut palette: Vec<Rgba> = image.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        stats.final_colors = palette.len();
        if palette.len() > PALETTE_ENTRIES {
            return Err(Error::PaletteOverflow {
                color: palette[PALETTE_ENTRIES],
            });
        }
        palette.sort_by(|a, b| luminance(*a).total_cmp(&luminance(*b)));
        palette.resize(PALETTE_ENTRIES, [0, 0, 0, 0]);

        let mut lookup: HashMap<Rgba, u8> = HashMap::with_capacity(PALETTE_ENTRIES);
        for (index, &color) in palette.iter().enumerate().rev() {
            lookup.insert(color, index as u8);
        }
        let pixels = image
            .iter()
            .map(|color| {
                lookup
                    .get(color)
                    .copied()
                    .ok_or_else(|| Error::PaletteOverflow { color: *color })
            })
            .collect::<Result<Vec<u8>>>()?;

        if !recipient.header.linear_palette {
            palette = reinterleave(&palette);
        }
        let palette: Vec<u8> = palette.into_iter().flatten().collect();

        if palette.len() != recipient.palette.len() || pixels.len() != recipient.pixels.len() {
            return Err(Error::invalid_texture("recolored buffers changed size"));
        }

        tracing::debug!(
            "Recolored {} region pixels: {} matched colors, {} promoted, {} in palette",
            stats.region_pixels,
            stats.matched_colors,
            stats.promoted_colors,
            stats.final_colors
        );

        let mut recolored = recipient.clone();
        recolored.pixels = pixels;
        recolored.palette = palette;
        Ok((recolored, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::tim2::tests::indexed_tim2;
    use pretty_assertions::assert_eq;

    const SMALL_ROI: Roi<'static> = Roi {
        first_row: 1,
        runs: &[(1, 1), (1, 1)],
    };

    fn gray(level: u8) -> Rgba {
        [level, level, level, 0x80]
    }

    #[test]
    fn test_spare_slots_reproduce_donor_colors() {
        // 4x4 recipient: black border, region at (1..=2, 1..=2)
        let recipient = indexed_tim2(4, 4, &[0; 16], &[gray(0)], false);
        let donor_pixels = [0, 0, 0, 0, 0, 1, 2, 0, 0, 3, 1, 0, 0, 0, 0, 0];
        let donor = indexed_tim2(
            4,
            4,
            &donor_pixels,
            &[gray(0), [200, 10, 10, 0x80], [10, 200, 10, 0x80], [10, 10, 200, 0x80]],
            false,
        );

        let recolorer = PaletteRecolorer::new(SMALL_ROI);
        let (out, stats) = recolorer
            .recolor(&Tim2Image::parse(&recipient).unwrap(), &Tim2Image::parse(&donor).unwrap())
            .unwrap();

        assert_eq!(stats.region_pixels, 4);
        assert_eq!(stats.promoted_colors, 3);
        assert_eq!(
            out.rgba_pixels().unwrap(),
            Tim2Image::parse(&donor).unwrap().rgba_pixels().unwrap()
        );
    }

    #[test]
    fn test_buffers_keep_their_size_and_palette_is_sorted() {
        let recipient_palette: Vec<Rgba> = (0..16).map(|i| gray(i * 16)).collect();
        let recipient_pixels: Vec<u8> = (0..16).collect();
        let recipient = indexed_tim2(4, 4, &recipient_pixels, &recipient_palette, false);
        let donor = indexed_tim2(4, 4, &[1; 16], &[gray(0), [255, 255, 0, 0x80]], true);

        let recipient = Tim2Image::parse(&recipient).unwrap();
        let (out, _) = PaletteRecolorer::new(SMALL_ROI)
            .recolor(&recipient, &Tim2Image::parse(&donor).unwrap())
            .unwrap();

        assert_eq!(out.palette.len(), 1024);
        assert_eq!(out.pixels.len(), recipient.pixels.len());
        assert!(!out.header.linear_palette);

        let palette = out.linear_palette();
        let used: Vec<f64> = palette[..out.pixels.iter().copied().max().unwrap() as usize + 1]
            .iter()
            .map(|&c| luminance(c))
            .collect();
        assert!(used.windows(2).all(|w| w[0] <= w[1]));

        // Pixels outside the region are untouched
        let before = recipient.rgba_pixels().unwrap();
        let after = out.rgba_pixels().unwrap();
        for p in [0, 3, 4, 7, 12, 15] {
            assert_eq!(after[p], before[p]);
        }
        assert_eq!(after[5], [255, 255, 0, 0x80]);
    }

    #[test]
    fn test_full_palette_falls_back_to_nearest_color() {
        // 32x16 recipient using all 256 colors outside a 2x2 region
        let palette: Vec<Rgba> = (0..=255u8).map(|i| [i, 255 - i, 0, 0x80]).collect();
        let pixels: Vec<u8> = (0..512).map(|i| (i % 256) as u8).collect();
        let recipient = Tim2Image::parse(&indexed_tim2(32, 16, &pixels, &palette, true)).unwrap();
        let donor = Tim2Image::parse(&indexed_tim2(
            32,
            16,
            &[1; 512],
            &[gray(0), [0, 0, 255, 0x80]],
            true,
        ))
        .unwrap();

        let roi = Roi {
            first_row: 10,
            runs: &[(4, 1), (4, 1)],
        };
        let (out, stats) = PaletteRecolorer::new(roi).recolor(&recipient, &donor).unwrap();

        assert_eq!(stats.promoted_colors, 0);
        assert_eq!(stats.final_colors, 256);
        let after = out.rgba_pixels().unwrap();
        for p in roi.pixels(32) {
            assert!(palette.contains(&after[p]));
        }
    }

    #[test]
    fn test_mismatched_dimensions_are_rejected() {
        let recipient = Tim2Image::parse(&indexed_tim2(4, 4, &[0; 16], &[gray(0)], true)).unwrap();
        let donor = Tim2Image::parse(&indexed_tim2(2, 8, &[0; 16], &[gray(0)], true)).unwrap();

        let err = PaletteRecolorer::new(SMALL_ROI)
            .recolor(&recipient, &donor)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTexture { .. }));
    }
}
