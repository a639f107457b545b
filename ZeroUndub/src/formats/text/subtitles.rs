//! Subtitle injection into the in-game message file

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::codec::Message;
use super::tables::CharacterTables;
use super::tree::{MessageTree, TableBody};
use super::PAD;
use crate::error::{Error, Result};

/// Container entry holding the in-game messages
pub const SUBTITLE_ENTRY: &str = "IG_MSG_E.OBJ";

/// Root child whose messages are the cutscene subtitles
pub const SUBTITLE_NODE: usize = 53;

/// Subtitle text by message index
pub type SubtitleMap = BTreeMap<u32, String>;

/// Load a subtitle map from a JSON object such as `{"0": "Hello"}`.
pub fn load_subtitles(path: &Path) -> Result<SubtitleMap> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Rewrite a message file, replacing the subtitle node's messages.
///
/// Without a map the file is decoded and re-encoded unchanged.
///
/// # Errors
/// Fails when the file has no subtitle node or a subtitle contains a glyph
/// the tables cannot encode.
pub fn inject_subtitles(
    data: &[u8],
    subtitles: Option<&SubtitleMap>,
    tables: &CharacterTables,
) -> Result<Vec<u8>> {
    let mut tree = MessageTree::parse(data, tables)?;

    if let Some(subtitles) = subtitles {
        let node = match &mut tree.root.body {
            TableBody::Tables(children) => children.get_mut(SUBTITLE_NODE),
            TableBody::Messages(_) => None,
        }
        .ok_or_else(|| Error::CorruptMessageTable {
            offset: 0,
            message: format!("no subtitle table at root index {SUBTITLE_NODE}"),
        })?;

        let messages = subtitles
            .iter()
            .map(|(&index, text)| {
                Message::from_text(index as usize, text.as_str(), &[PAD], tables)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            "Injecting {} subtitles into message table {SUBTITLE_NODE}",
            messages.len()
        );
        node.body = TableBody::Messages(messages);
    }

    tree.encode(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tables() -> &'static CharacterTables {
        CharacterTables::european()
    }

    /// A root of `SUBTITLE_NODE + 1` tables, each holding one message
    fn message_file() -> Vec<u8> {
        let count = SUBTITLE_NODE + 1;
        let mut data = Vec::new();
        let mut tables_start = count * 4;
        for _ in 0..count {
            data.extend((tables_start as u32).to_le_bytes());
            tables_start += 8;
        }
        for i in 0..count {
            let table = count * 4 + i * 8;
            data.extend(((table + 4) as u32).to_le_bytes());
            data.extend([0x01 + (i % 26) as u8, 0x02, 0x03, 0xFF]);
        }
        data
    }

    #[test]
    fn test_identity_without_map() {
        let data = message_file();
        assert_eq!(inject_subtitles(&data, None, tables()).unwrap(), data);
    }

    #[test]
    fn test_replaces_subtitle_node() {
        let data = message_file();
        let subtitles = SubtitleMap::from([(1, "HELLO".to_string()), (0, "Hi".to_string())]);

        let patched = inject_subtitles(&data, Some(&subtitles), tables()).unwrap();
        let tree = MessageTree::parse(&patched, tables()).unwrap();

        let node = &tree.root.tables()[SUBTITLE_NODE];
        let texts: Vec<_> = node.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Hi", "HELLO"]);
        assert_eq!(node.messages()[1].suffix, vec![0xFF]);

        // Other nodes are untouched
        assert_eq!(tree.root.tables()[0].messages()[0].text, "ABC");
    }

    #[test]
    fn test_missing_node() {
        let mut data = 8u32.to_le_bytes().to_vec();
        data.extend(12u32.to_le_bytes());
        data.extend([0x01, 0xFF, 0xFF, 0xFF, 0x02, 0xFF]);
        let subtitles = SubtitleMap::from([(0, "A".to_string())]);

        let err = inject_subtitles(&data, Some(&subtitles), tables()).unwrap_err();
        assert!(matches!(err, Error::CorruptMessageTable { .. }));
    }

    #[test]
    fn test_load_subtitles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.json");
        fs::write(&path, r#"{"2": "Two", "0": "Zero"}"#).unwrap();

        let map = load_subtitles(&path).unwrap();
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(map[&2], "Two");
    }
}
