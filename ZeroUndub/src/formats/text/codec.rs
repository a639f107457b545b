//! Message text codec
//!
//! A message is a byte string of glyph indices with a few control bytes,
//! followed by a terminator run (an optional end byte and pad bytes). The
//! terminator is kept apart from the text and written back verbatim.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use super::tables::CharacterTables;
use super::{COLOR, END_MARKER, LAST_GLYPH, NEWLINE, PAD};
use crate::error::{Error, Result};

/// Tokens of a decoded message, in priority order
static MESSAGE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\{Color#([0-9A-F]{2})([0-9A-F]{2})([0-9A-F]{2})\}|\{Color\}|\n|\{0x([0-9A-F]{2})\}|\{.*?\}|.",
    )
    .expect("valid message token pattern")
});

/// Split a raw message into text bytes and its terminator run.
#[must_use]
pub fn split_suffix(data: &[u8]) -> (&[u8], &[u8]) {
    let mut end = data.len();
    while end > 0 && data[end - 1] == PAD {
        end -= 1;
    }
    if end > 0 && data[end - 1] == END_MARKER {
        end -= 1;
    }
    data.split_at(end)
}

/// Decode text bytes (without terminator) to a string.
#[must_use]
pub fn decode_text(data: &[u8], tables: &CharacterTables) -> String {
    let mut text = String::new();
    let mut pos = 0;

    while pos < data.len() {
        let byte = data[pos];

        if byte == COLOR {
            if data.len() - 1 - pos >= 3 {
                let _ = write!(
                    text,
                    "{{Color#{:02X}{:02X}{:02X}}}",
                    data[pos + 1],
                    data[pos + 2],
                    data[pos + 3]
                );
                pos += 3;
            } else {
                text.push_str("{Color}");
            }
        } else if byte == NEWLINE {
            text.push('\n');
        } else if let Some(table) = tables
            .decode_extended
            .then(|| tables.extended_table(byte))
            .flatten()
            .filter(|_| pos + 1 < data.len())
        {
            pos += 1;
            match table.get(usize::from(data[pos])) {
                Some(glyph) => text.push_str(glyph),
                None => {
                    let _ = write!(text, "{{0x{byte:02X}}}{{0x{:02X}}}", data[pos]);
                }
            }
        } else if byte <= LAST_GLYPH {
            match tables.default.get(usize::from(byte)) {
                Some(glyph) => text.push_str(glyph),
                None => {
                    let _ = write!(text, "{{0x{byte:02X}}}");
                }
            }
        } else {
            let _ = write!(text, "{{0x{byte:02X}}}");
        }

        pos += 1;
    }

    text
}

/// Encode a string to text bytes (without terminator).
///
/// # Errors
/// Returns [`Error::UnencodableGlyph`] for a token found in no table.
pub fn encode_text(text: &str, tables: &CharacterTables) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());

    for captures in MESSAGE_TOKEN.captures_iter(text) {
        let token = &captures[0];

        if let (Some(r), Some(g), Some(b)) = (captures.get(1), captures.get(2), captures.get(3)) {
            out.push(COLOR);
            for component in [r, g, b] {
                out.push(parse_hex_byte(component.as_str())?);
            }
        } else if token == "{Color}" {
            out.push(COLOR);
        } else if token == "\n" {
            out.push(NEWLINE);
        } else if let Some(raw) = captures.get(4) {
            out.push(parse_hex_byte(raw.as_str())?);
        } else {
            let encoded = tables
                .encode_glyph(token)
                .ok_or_else(|| Error::UnencodableGlyph {
                    glyph: token.to_string(),
                })?;
            out.extend_from_slice(&encoded);
        }
    }

    Ok(out)
}

fn parse_hex_byte(digits: &str) -> Result<u8> {
    u8::from_str_radix(digits, 16).map_err(|_| Error::UnencodableGlyph {
        glyph: digits.to_string(),
    })
}

/// One leaf message of a message table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Position within its table
    pub index: usize,
    /// Byte offset inside the decoded file
    pub offset: usize,
    /// Decoded text
    pub text: String,
    /// Text bytes as matched in the file
    pub raw: Vec<u8>,
    /// Terminator run
    pub suffix: Vec<u8>,
}

impl Message {
    /// Decode a message from its full byte range.
    #[must_use]
    pub fn decode(index: usize, offset: usize, data: &[u8], tables: &CharacterTables) -> Self {
        let (raw, suffix) = split_suffix(data);
        Self {
            index,
            offset,
            text: decode_text(raw, tables),
            raw: raw.to_vec(),
            suffix: suffix.to_vec(),
        }
    }

    /// Build a message from text, encoding it immediately.
    pub fn from_text(
        index: usize,
        text: impl Into<String>,
        suffix: &[u8],
        tables: &CharacterTables,
    ) -> Result<Self> {
        let text = text.into();
        let raw = encode_text(&text, tables)?;
        Ok(Self {
            index,
            offset: 0,
            text,
            raw,
            suffix: suffix.to_vec(),
        })
    }

    /// Encoded length including the terminator
    #[must_use]
    pub fn size(&self) -> usize {
        self.raw.len() + self.suffix.len()
    }

    /// Encode the text and append the terminator.
    pub fn encode(&self, tables: &CharacterTables) -> Result<Vec<u8>> {
        let mut out = encode_text(&self.text, tables)?;
        out.extend_from_slice(&self.suffix);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tables() -> &'static CharacterTables {
        CharacterTables::european()
    }

    #[test]
    fn test_split_suffix() {
        assert_eq!(
            split_suffix(&[1, 2, 0xFA, 0xFF, 0xFF]),
            (&[1u8, 2][..], &[0xFAu8, 0xFF, 0xFF][..])
        );
        assert_eq!(
            split_suffix(&[1, 0xFF, 0xFA, 0xFF]),
            (&[1u8, 0xFF][..], &[0xFAu8, 0xFF][..])
        );
        assert_eq!(split_suffix(&[1, 2]), (&[1u8, 2][..], &[][..]));
        assert_eq!(split_suffix(&[0xFA]), (&[][..], &[0xFAu8][..]));
    }

    #[test]
    fn test_decode_controls() {
        let data = [
            0x08, 0x05, NEWLINE, COLOR, 0x12, 0xAB, 0xFF, 0x01, 0xF0, 0x01, COLOR, 0x01,
        ];
        assert_eq!(
            decode_text(&data, tables()),
            "HE\n{Color#12ABFF}A{0xF0}A{Color}A"
        );
    }

    #[test]
    fn test_encode_is_inverse_of_decode() {
        let data: Vec<u8> = (0..=0xF9u8).filter(|&b| b != COLOR).collect();
        let text = decode_text(&data, tables());
        assert_eq!(encode_text(&text, tables()).unwrap(), data);
    }

    #[test]
    fn test_encode_prefers_default_table() {
        assert_eq!(encode_text("É", tables()).unwrap(), vec![0x4E]);
        assert_eq!(encode_text("{É1}", tables()).unwrap(), vec![0x67]);
    }

    #[test]
    fn test_extended_glyphs() {
        let mut custom = tables().clone();
        custom.extended = vec![(0xF0, vec!["{Kanji}".to_string(); 2])];

        assert_eq!(encode_text("A{Kanji}", &custom).unwrap(), vec![0x01, 0xF0, 0x00]);
        assert_eq!(decode_text(&[0x01, 0xF0, 0x01], &custom), "A{0xF0}A");

        custom.decode_extended = true;
        assert_eq!(decode_text(&[0x01, 0xF0, 0x01], &custom), "A{Kanji}");
        assert_eq!(decode_text(&[0xF0, 0x05], &custom), "{0xF0}{0x05}");
    }

    #[test]
    fn test_unencodable_glyph() {
        let err = encode_text("A{Nope}", tables()).unwrap_err();
        assert!(matches!(err, Error::UnencodableGlyph { glyph } if glyph == "{Nope}"));
    }

    #[test]
    fn test_message_keeps_suffix() {
        let message = Message::decode(0, 0, &[0x01, 0x02, 0xFA, 0xFF], tables());
        assert_eq!(message.text, "AB");
        assert_eq!(message.suffix, vec![0xFA, 0xFF]);
        assert_eq!(message.encode(tables()).unwrap(), vec![0x01, 0x02, 0xFA, 0xFF]);
        assert_eq!(message.size(), 4);
    }
}
