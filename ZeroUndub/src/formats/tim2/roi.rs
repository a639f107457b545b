//! Pixel regions that need palette-aware recoloring

/// A block of rows, each covering one horizontal run of pixels.
///
/// Row `i` covers columns `start..=start + length` of image row
/// `first_row + i`.
#[derive(Debug, Clone, Copy)]
pub struct Roi<'a> {
    pub first_row: usize,
    /// `(start column, run length)` per row
    pub runs: &'a [(usize, usize)],
}

impl Roi<'_> {
    /// Linear pixel positions covered by the region, row by row.
    #[must_use]
    pub fn pixels(&self, width: usize) -> Vec<usize> {
        let mut pixels = Vec::new();
        for (i, &(start, length)) in self.runs.iter().enumerate() {
            let row = (self.first_row + i) * width;
            pixels.extend(row + start..=row + start + length);
        }
        pixels
    }
}

/// The lettering on the `PL_MTOP` title picture
pub const TITLE_ROI: Roi<'static> = Roi {
    first_row: 60,
    runs: &TITLE_RUNS,
};

const TITLE_RUNS: [(usize, usize); 52] = [
    (192, 15),
    (192, 15),
    (189, 21),
    (187, 25),
    (185, 29),
    (183, 33),
    (182, 35),
    (181, 37),
    (180, 39),
    (179, 41),
    (178, 43),
    (177, 45),
    (176, 47),
    (176, 47),
    (175, 49),
    (175, 49),
    (174, 51),
    (174, 51),
    (174, 51),
    (172, 55),
    (172, 55),
    (172, 55),
    (172, 55),
    (172, 55),
    (172, 55),
    (172, 55),
    (172, 55),
    (172, 55),
    (172, 55),
    (172, 55),
    (172, 55),
    (172, 55),
    (172, 55),
    (174, 51),
    (174, 51),
    (174, 51),
    (175, 49),
    (175, 49),
    (176, 47),
    (176, 47),
    (177, 45),
    (178, 43),
    (179, 41),
    (180, 39),
    (181, 37),
    (182, 35),
    (183, 33),
    (185, 29),
    (187, 25),
    (189, 21),
    (192, 15),
    (192, 15),
];
