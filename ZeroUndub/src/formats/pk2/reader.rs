//! PK2 parsing

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use super::{EntryFormat, Pk2Layout, SubArchive, SubArchiveEntry};
use crate::error::{Error, Result};

const HEADER_SIZE: usize = 16;
const ENTRY_HEADER_SIZE: usize = 16;

/// Read a PK2 archive from disk
pub fn read_pk2<P: AsRef<Path>>(path: P) -> Result<SubArchive> {
    let mut buffer = Vec::new();
    File::open(path)?.read_to_end(&mut buffer)?;
    parse_pk2(buffer)
}

/// Parse a PK2 archive, taking ownership of its bytes.
///
/// # Errors
/// Returns [`Error::CorruptArchive`] if the header is truncated, an offset
/// points outside the archive, or a sequential archive holds a different
/// number of entries than its header declares.
pub fn parse_pk2(data: Vec<u8>) -> Result<SubArchive> {
    if data.len() < HEADER_SIZE {
        return Err(Error::corrupt_archive(format!(
            "archive is {} bytes, shorter than its header",
            data.len()
        )));
    }

    let declared = word_at(&data, 0) as usize;
    let table_len = declared.div_ceil(4) * 4 * 4;
    if HEADER_SIZE + table_len > data.len() {
        return Err(Error::corrupt_archive(format!(
            "offset table for {declared} entries overruns the archive"
        )));
    }

    let mut cursor = Cursor::new(&data[HEADER_SIZE..HEADER_SIZE + declared * 4]);
    let mut offsets = Vec::with_capacity(declared);
    for _ in 0..declared {
        offsets.push(cursor.read_u32::<LittleEndian>()? as usize);
    }

    let sequential = offsets.len() > 1 && offsets[1] == 0;
    let (entries, layout) = if sequential {
        (sequential_entries(&data, declared)?, Pk2Layout::Sequential)
    } else {
        (offset_table_entries(&data, &offsets)?, Pk2Layout::OffsetTable)
    };

    tracing::debug!("Parsed PK2 with {} entries ({layout:?})", entries.len());
    Ok(SubArchive::from_parts(data, entries, layout))
}

fn entry_at(data: &[u8], offset: usize, length: usize) -> SubArchiveEntry {
    let magic = data.get(offset..offset + 4.min(length)).unwrap_or_default();
    SubArchiveEntry {
        offset,
        length,
        format: EntryFormat::from_magic(magic),
    }
}

fn offset_table_entries(data: &[u8], offsets: &[usize]) -> Result<Vec<SubArchiveEntry>> {
    let mut entries = Vec::with_capacity(offsets.len());

    for (index, &offset) in offsets.iter().enumerate() {
        let end = offsets.get(index + 1).copied().unwrap_or(data.len());
        if offset > end || end > data.len() {
            return Err(Error::corrupt_archive(format!(
                "entry {index} spans 0x{offset:X}..0x{end:X} in a {} byte archive",
                data.len()
            )));
        }
        entries.push(entry_at(data, offset, end - offset));
    }

    Ok(entries)
}

fn sequential_entries(data: &[u8], declared: usize) -> Result<Vec<SubArchiveEntry>> {
    let mut entries = Vec::with_capacity(declared);
    let mut next = 0usize;

    while next + 2 * ENTRY_HEADER_SIZE < data.len() {
        next += ENTRY_HEADER_SIZE;
        let length = word_at(data, next) as usize;
        let offset = next + ENTRY_HEADER_SIZE;
        if offset + length > data.len() {
            return Err(Error::corrupt_archive(format!(
                "sequential entry at 0x{offset:X} overruns the archive"
            )));
        }
        entries.push(entry_at(data, offset, length));
        next += length;
    }

    if entries.len() != declared {
        return Err(Error::corrupt_archive(format!(
            "header declares {declared} entries but {} were found",
            entries.len()
        )));
    }
    Ok(entries)
}

/// Little-endian word at an already bounds-checked offset
fn word_at(data: &[u8], offset: usize) -> u32 {
    LittleEndian::read_u32(&data[offset..offset + 4])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::pk2::tests::{offset_table_archive, sequential_archive};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_offset_table_layout_sizes_last_entry_from_archive_end() {
        let data = offset_table_archive(&[b"TIM2xxxxxxxx", b"yyyy", b"zzzzzz"]);
        let total = data.len();
        let archive = parse_pk2(data).unwrap();

        assert_eq!(archive.layout(), Pk2Layout::OffsetTable);
        assert_eq!(archive.len(), 3);
        let last = archive.entries()[2];
        assert_eq!(last.length, total - last.offset);
        assert_eq!(archive.get(2).unwrap(), b"zzzzzz");
        assert_eq!(archive.entries()[0].format, EntryFormat::Tim2);
    }

    #[test]
    fn test_sequential_layout_recovers_declared_count() {
        let archive = parse_pk2(sequential_archive(&[b"TIM2abcd", b"0123456789", b"xy"])).unwrap();

        assert_eq!(archive.layout(), Pk2Layout::Sequential);
        assert_eq!(archive.len(), 3);
        assert_eq!(archive.get(0).unwrap(), b"TIM2abcd");
        assert_eq!(archive.get(1).unwrap(), b"0123456789");
        assert_eq!(archive.get(2).unwrap(), b"xy");
    }

    #[test]
    fn test_sequential_count_mismatch_is_corrupt() {
        let mut data = sequential_archive(&[b"aaaa", b"bbbb"]);
        data[0] = 3;

        let err = parse_pk2(data).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive { .. }));
    }

    #[test]
    fn test_truncated_header_is_corrupt() {
        assert!(matches!(
            parse_pk2(vec![1, 0, 0]),
            Err(Error::CorruptArchive { .. })
        ));
    }
}
