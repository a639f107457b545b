//! Embedded directory parser
//!
//! The executable carries the container's name list as a single ASCII
//! record:
//!
//! ```text
//! CD_FILE_DAT:T...=eNAME_EXT:NUMBER,NAME_EXT:NUMBER,...,;
//! ```
//!
//! A literal comma inside the record is escaped as `,\<NUL>`.

use std::sync::LazyLock;

use regex::Regex;

use super::types::DirectoryEntry;
use crate::error::{Error, Result};

const MARKER: &[u8] = b"CD_FILE_DAT:T";
const TERMINATOR: &[u8] = b",;";
const ESCAPED_COMMA: &[u8] = b",\\\0";
const LIST_START: &str = "=e";

static ENTRY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z0-9_]+)_([A-Z0-9]+):([0-9]+)").expect("valid directory entry pattern")
});

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn unescape(record: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(record.len());
    let mut pos = 0;
    while pos < record.len() {
        if record[pos..].starts_with(ESCAPED_COMMA) {
            out.push(b',');
            pos += ESCAPED_COMMA.len();
        } else {
            out.push(record[pos]);
            pos += 1;
        }
    }
    out
}

/// Extract the directory from an executable image.
///
/// # Errors
/// Returns [`Error::CorruptContainer`] if the marker or terminator is
/// missing, the record is not ASCII, or any item is malformed.
pub fn parse_directory(executable: &[u8]) -> Result<Vec<DirectoryEntry>> {
    let start = find_subslice(executable, MARKER, 0)
        .ok_or_else(|| Error::corrupt_container("directory marker not found in executable"))?;
    let end = find_subslice(executable, TERMINATOR, start)
        .ok_or_else(|| Error::corrupt_container("directory record is not terminated"))?;

    let record = unescape(&executable[start..end]);
    if !record.is_ascii() {
        return Err(Error::corrupt_container("directory record is not ASCII"));
    }
    let record = String::from_utf8_lossy(&record);

    let (_, list) = record
        .split_once(LIST_START)
        .ok_or_else(|| Error::corrupt_container("directory record has no file list"))?;

    list.trim_end_matches(',')
        .split(',')
        .map(parse_item)
        .collect()
}

fn parse_item(item: &str) -> Result<DirectoryEntry> {
    let captures = ENTRY_PATTERN
        .captures(item)
        .ok_or_else(|| Error::corrupt_container(format!("malformed directory item {item:?}")))?;

    let sequence = captures[3]
        .parse()
        .map_err(|_| Error::corrupt_container(format!("bad sequence number in {item:?}")))?;

    Ok(DirectoryEntry {
        name: format!("{}.{}", &captures[1], &captures[2]),
        sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn executable(record: &[u8]) -> Vec<u8> {
        let mut exe = b"\x7fELF padding".to_vec();
        exe.extend_from_slice(record);
        exe.extend_from_slice(b"\0\0trailer");
        exe
    }

    #[test]
    fn test_parse_directory() {
        let exe = executable(b"CD_FILE_DAT:T=eIMG_HD_BIN:0,M000_MIKU_MDL:1,SCENE01_STR:2,,;");
        let entries = parse_directory(&exe).unwrap();

        assert_eq!(
            entries,
            vec![
                DirectoryEntry { name: "IMG_HD.BIN".into(), sequence: 0 },
                DirectoryEntry { name: "M000_MIKU.MDL".into(), sequence: 1 },
                DirectoryEntry { name: "SCENE01.STR".into(), sequence: 2 },
            ]
        );
    }

    #[test]
    fn test_escaped_comma_is_unescaped() {
        let exe = executable(b"CD_FILE_DAT:T,\\\0X=eA_BIN:0,B_BIN:1,;");
        let entries = parse_directory(&exe).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name, "B.BIN");
    }

    #[test]
    fn test_missing_marker_is_corrupt() {
        let err = parse_directory(b"no directory here").unwrap_err();
        assert!(matches!(err, Error::CorruptContainer { .. }));
    }

    #[test]
    fn test_malformed_item_is_corrupt() {
        let exe = executable(b"CD_FILE_DAT:T=eA_BIN:0,lowercase:1,;");
        let err = parse_directory(&exe).unwrap_err();
        assert!(matches!(err, Error::CorruptContainer { .. }));
    }
}
