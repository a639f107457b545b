//! PK2 sub-archives
//!
//! A PK2 is a small container nested inside one container entry, holding
//! TIM2 textures and other fixed-size blobs. Two layouts exist:
//!
//! - **Offset table**: a 16-byte header (entry count first), then one u32
//!   absolute offset per entry padded to a multiple of four words. Each
//!   entry runs up to the next offset, the last one to the end of the
//!   archive.
//! - **Sequential**: the second offset word is zero. Entries are preceded
//!   by a 16-byte header whose first word is the body length.
//!
//! Slots never change size. Only their contents may be replaced.

mod reader;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

pub use reader::{parse_pk2, read_pk2};

/// Entry format, from the first four bytes of its body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryFormat {
    Tim2,
    Sgd,
    Binary,
}

impl EntryFormat {
    pub(crate) fn from_magic(magic: &[u8]) -> Self {
        match magic {
            b"TIM2" => Self::Tim2,
            [0x50, 0x10, 0x00, 0x00] => Self::Sgd,
            _ => Self::Binary,
        }
    }

    /// File extension used when dumping an entry
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Tim2 => "tm2",
            Self::Sgd => "sgd",
            Self::Binary => "bin",
        }
    }
}

/// Which of the two layouts an archive uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pk2Layout {
    OffsetTable,
    Sequential,
}

/// One slot of a sub-archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubArchiveEntry {
    /// Byte offset of the body inside the archive
    pub offset: usize,
    /// Body length in bytes
    pub length: usize,
    pub format: EntryFormat,
}

impl SubArchiveEntry {
    fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.length
    }
}

/// An owned, parsed PK2 archive
#[derive(Debug, Clone)]
pub struct SubArchive {
    data: Vec<u8>,
    entries: Vec<SubArchiveEntry>,
    layout: Pk2Layout,
}

impl SubArchive {
    pub(crate) fn from_parts(data: Vec<u8>, entries: Vec<SubArchiveEntry>, layout: Pk2Layout) -> Self {
        Self {
            data,
            entries,
            layout,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn layout(&self) -> Pk2Layout {
        self.layout
    }

    #[must_use]
    pub fn entries(&self) -> &[SubArchiveEntry] {
        &self.entries
    }

    fn slot(&self, index: usize) -> Result<&SubArchiveEntry> {
        self.entries.get(index).ok_or_else(|| {
            Error::corrupt_archive(format!(
                "slot {index} out of range ({} slots)",
                self.entries.len()
            ))
        })
    }

    /// Body of one slot.
    ///
    /// # Errors
    /// Returns [`Error::CorruptArchive`] if the slot does not exist.
    pub fn get(&self, index: usize) -> Result<&[u8]> {
        let entry = self.slot(index)?;
        Ok(&self.data[entry.range()])
    }

    /// Replace the body of one slot.
    ///
    /// # Errors
    /// Returns [`Error::FixedSizeViolation`] if `data` differs in length
    /// from the slot; the archive is left unchanged.
    pub fn set(&mut self, index: usize, data: &[u8]) -> Result<()> {
        let entry = *self.slot(index)?;
        if data.len() != entry.length {
            return Err(Error::FixedSizeViolation {
                index,
                expected: entry.length,
                actual: data.len(),
            });
        }
        self.data[entry.range()].copy_from_slice(data);
        Ok(())
    }

    /// Overwrite the first `count` slots with the donor's.
    ///
    /// Every slot is checked before any is written, so a size mismatch
    /// leaves the archive unchanged.
    pub fn copy_slots_from(&mut self, donor: &SubArchive, count: usize) -> Result<()> {
        for index in 0..count {
            let expected = self.slot(index)?.length;
            let actual = donor.get(index)?.len();
            if expected != actual {
                return Err(Error::FixedSizeViolation {
                    index,
                    expected,
                    actual,
                });
            }
        }
        for index in 0..count {
            let entry = self.entries[index];
            self.data[entry.range()].copy_from_slice(donor.get(index)?);
        }
        Ok(())
    }

    /// The whole archive, including any substitutions
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Write every slot to `dir` as `fileNNNN.<ext>`.
    pub fn extract(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            let path = dir.join(format!("file{index:04}.{}", entry.format.extension()));
            fs::write(&path, &self.data[entry.range()])?;
            written.push(path);
        }

        tracing::info!("Extracted {} entries to {}", written.len(), dir.display());
        Ok(written)
    }
}
