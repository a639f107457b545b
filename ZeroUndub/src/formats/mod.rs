//! File format handlers for Project Zero resources

pub mod pk2;
pub mod text;
pub mod tim2;

pub use pk2::{EntryFormat, Pk2Layout, SubArchive, SubArchiveEntry, parse_pk2, read_pk2};
pub use text::{CharacterTables, Message, MessageTable, MessageTree, inject_subtitles};
pub use tim2::{PaletteRecolorer, RecolorStats, Tim2Image, convert_tim2_to_png};
