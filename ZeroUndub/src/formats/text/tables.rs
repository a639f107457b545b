//! Glyph tables
//!
//! Every table holds 210 glyphs, one per byte value `0x00..=0xD1`. A glyph
//! is a single character or a `{...}` token naming a special symbol. Slots
//! without a glyph decode to a `{0xNN}` token so they survive a round trip.

use std::sync::LazyLock;

use regex::Regex;

use super::LAST_GLYPH;

/// Glyphs per table
pub const GLYPHS_PER_TABLE: usize = LAST_GLYPH as usize + 1;

/// Marks a slot without a glyph in the table sources below
const EMPTY_SLOT: &str = "#";

static GLYPH_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{.*?\}|.").expect("valid glyph token pattern"));

const DEFAULT_GLYPHS: [&str; 10] = [
    r#" ABCDEFGHIJKLMNOPQRST"#,
    r#"UVWXYZabcdefghijklmno"#,
    r#"pqrstuvwxyz0123456789"#,
    r#"{0}{1}{2}{3}{4}{5}{6}{7}{8}{9}{!?}ÀÂÇÈÉÊÎÔàè"#,
    r#"éêîôùûÄẞËÏÖÜäëïü¡¿Á{É1}Í"#,
    r#"ÑÓÚá{é1}íñóú{À}{È}{É2}ÌÒÙ{à}{è}{é}ìò{ù}"#,
    r#"{Ë}{Ï}Œ{Ch}{LI}{rr}{Rune1}{Rune2}~{Rune3}{Rune4}{Rune5}"'()-?/⸴⹁"#,
    r#";:,.!「」✓✗{pts}âç°#◯‷=ö#{○}{✕}"#,
    r#"{△}{□}壱弐参肆伍陸漆捌玖œ#########"#,
    r#"#####################"#,
];

const EXTENDED_GLYPHS_F0: [&str; 10] = [
    r#" ABCDEFGHIJKLMNOPQRST"#,
    r#"UVWXYZabcdefghijklmno"#,
    r#"pqrstuvwxyz0123456789"#,
    r#"0123456789{!?}ÀÂÇÈÉÊÎÔàè"#,
    r#"éêîôùûÄẞËÏÖÜäëïü¡¿ÁÉÍ"#,
    r#"ÑÓÚáéíñóúÀÈÉÌÒÙàèéìòù"#,
    r#"ËÏŒ{Ch}{LI}{rr}{Rune1}{Rune2}~{Rune3}{Rune4}{Rune5}"'()-?/⸴⹁"#,
    r#";:,.!「」✓✗{pts}âç°#◯‷=ö#{○}{✕}"#,
    r#"{△}{□}#########œ#########"#,
    r#"#####################"#,
];

const EXTENDED_GLYPHS_F1: [&str; 10] = [
    r#" ABCDEFGHIJKLMNOPQRST"#,
    r#"UVWXYZabcdefghijklmno"#,
    r#"pqrstuvwxyz0123456789"#,
    r#"0123456789{!?}ÀÂÇÈÉÊÎÔàè"#,
    r#"éêîôùûÄẞËÏÖÜäëïü¡¿ÁÉÍ"#,
    r#"ÑÓÚáéíñóúÀÈÉÌÒÙàèéìòù"#,
    r#"ËÏŒ{Ch}{LI}{rr}###############"#,
    r#"#####################"#,
    r#"#####################"#,
    r#"#####################"#,
];

fn make_table(rows: &[&str]) -> Vec<String> {
    let mut table: Vec<String> = rows
        .iter()
        .flat_map(|row| GLYPH_TOKEN.find_iter(row).map(|m| m.as_str().to_string()))
        .collect();

    for (index, glyph) in table.iter_mut().enumerate() {
        if glyph == EMPTY_SLOT {
            *glyph = format!("{{0x{index:02X}}}");
        }
    }
    table
}

/// A default glyph table plus extended tables reached through a selector
/// byte.
#[derive(Debug, Clone)]
pub struct CharacterTables {
    /// Table for single-byte glyphs
    pub default: Vec<String>,
    /// `(selector byte, table)` pairs, searched in order when encoding
    pub extended: Vec<(u8, Vec<String>)>,
    /// Decode `selector, index` pairs as extended glyphs. When off, selector
    /// bytes decode to `{0xNN}` tokens.
    pub decode_extended: bool,
}

static EUROPEAN: LazyLock<CharacterTables> = LazyLock::new(|| CharacterTables {
    default: make_table(&DEFAULT_GLYPHS),
    extended: vec![
        (0xF0, make_table(&EXTENDED_GLYPHS_F0)),
        (0xF1, make_table(&EXTENDED_GLYPHS_F1)),
    ],
    decode_extended: false,
});

impl CharacterTables {
    /// Tables used by the European release
    #[must_use]
    pub fn european() -> &'static CharacterTables {
        &EUROPEAN
    }

    /// Extended table behind a selector byte
    #[must_use]
    pub fn extended_table(&self, selector: u8) -> Option<&[String]> {
        self.extended
            .iter()
            .find(|(s, _)| *s == selector)
            .map(|(_, table)| table.as_slice())
    }

    /// Encoding of one glyph token: its default-table index, or selector
    /// and index for an extended table.
    #[must_use]
    pub fn encode_glyph(&self, glyph: &str) -> Option<Vec<u8>> {
        if let Some(index) = self.default.iter().position(|g| g == glyph) {
            return Some(vec![index as u8]);
        }
        self.extended.iter().find_map(|(selector, table)| {
            table
                .iter()
                .position(|g| g == glyph)
                .map(|index| vec![*selector, index as u8])
        })
    }
}
