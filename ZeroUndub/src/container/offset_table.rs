//! `IMG_HD.BIN` offset table codec
//!
//! A flat little-endian array of `(sector offset, byte size)` u32 pairs, one
//! per directory entry, in directory order.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use super::types::OffsetRecord;
use crate::error::{Error, Result};

/// Bytes per record
pub const RECORD_SIZE: usize = 8;

/// Parse an offset table.
///
/// # Errors
/// Returns [`Error::CorruptContainer`] if the table length is not a whole
/// number of records.
pub fn parse_offset_table(data: &[u8]) -> Result<Vec<OffsetRecord>> {
    if data.len() % RECORD_SIZE != 0 {
        return Err(Error::corrupt_container(format!(
            "offset table length {} is not a multiple of {RECORD_SIZE}",
            data.len()
        )));
    }

    let mut cursor = Cursor::new(data);
    let mut records = Vec::with_capacity(data.len() / RECORD_SIZE);
    for _ in 0..data.len() / RECORD_SIZE {
        let sector = cursor.read_u32::<LittleEndian>()?;
        let size = cursor.read_u32::<LittleEndian>()?;
        records.push(OffsetRecord { sector, size });
    }
    Ok(records)
}

/// Serialize an offset table.
#[must_use]
pub fn write_offset_table(records: &[OffsetRecord]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * RECORD_SIZE);
    for record in records {
        out.extend_from_slice(&record.sector.to_le_bytes());
        out.extend_from_slice(&record.size.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_offset_table() {
        let data = [1u8, 0, 0, 0, 100, 0, 0, 0, 16, 0, 0, 0, 0, 8, 0, 0];
        let records = parse_offset_table(&data).unwrap();
        assert_eq!(
            records,
            vec![
                OffsetRecord { sector: 1, size: 100 },
                OffsetRecord { sector: 16, size: 2048 },
            ]
        );
        assert_eq!(records[1].byte_offset(), 16 * 2048);
        assert_eq!(write_offset_table(&records), data);
    }

    #[test]
    fn test_write_offset_table_layout() {
        let records = [
            OffsetRecord { sector: 0x0102_0304, size: 7 },
            OffsetRecord { sector: 32, size: 0xFFFF_FFFF },
        ];
        let data = write_offset_table(&records);
        assert_eq!(data.len(), records.len() * RECORD_SIZE);
        assert_eq!(&data[..8], &[4u8, 3, 2, 1, 7, 0, 0, 0]);
        assert_eq!(&data[8..], &[32u8, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(parse_offset_table(&data).unwrap(), records);
    }

    #[test]
    fn test_truncated_table_is_corrupt() {
        let err = parse_offset_table(&[0u8; 12]).unwrap_err();
        assert!(matches!(err, Error::CorruptContainer { .. }));
    }
}
