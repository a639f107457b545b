//! Message file support
//!
//! Message files (`*_MSG_*.OBJ`) hold a tree of offset tables whose leaves
//! are encoded text strings. Nothing tags a node as table or message; a
//! node is a table when its leading words read as a plausible offset list.

mod codec;
mod subtitles;
mod tables;
mod tree;

pub use codec::{Message, decode_text, encode_text, split_suffix};
pub use subtitles::{SUBTITLE_ENTRY, SUBTITLE_NODE, SubtitleMap, inject_subtitles, load_subtitles};
pub use tables::{CharacterTables, GLYPHS_PER_TABLE};
pub use tree::{MessageTable, MessageTree, TableBody};

/// Highest byte value that indexes a glyph table
pub const LAST_GLYPH: u8 = 0xD1;
/// Opens a color tag, followed by three RGB bytes
pub const COLOR: u8 = 0xFB;
pub const NEWLINE: u8 = 0xFC;
/// Optional first byte of a message terminator
pub const END_MARKER: u8 = 0xFA;
/// Terminator and padding byte
pub const PAD: u8 = 0xFF;
