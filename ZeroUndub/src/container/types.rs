//! Container table-of-contents types

use serde::Serialize;

/// Size of one addressing unit of the offset table
pub const SECTOR_SIZE: u64 = 2048;

/// Recipient (European) executable holding the embedded directory
pub const RECIPIENT_EXECUTABLE: &str = "SLES_508.21";
/// Donor (Japanese) executable holding the embedded directory
pub const DONOR_EXECUTABLE: &str = "SLPS_250.74";
/// Offset/size table of the container
pub const OFFSET_TABLE: &str = "IMG_HD.BIN";
/// Container payload
pub const PAYLOAD: &str = "IMG_BD.BIN";

/// One named resource of the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// Resource name, `NAME.EXT`
    pub name: String,
    /// Position of the resource in the physical payload order
    pub sequence: u32,
    /// Byte offset inside the payload
    pub offset: u64,
    /// Byte length
    pub size: u64,
}

impl TocEntry {
    /// End of the entry inside the payload
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// One name from the embedded directory, before it is joined with the
/// offset table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub sequence: u32,
}

/// One `(sector offset, byte size)` pair of the offset table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetRecord {
    pub sector: u32,
    pub size: u32,
}

impl OffsetRecord {
    /// Byte offset of the record inside the payload
    #[must_use]
    pub fn byte_offset(&self) -> u64 {
        u64::from(self.sector) * SECTOR_SIZE
    }
}
