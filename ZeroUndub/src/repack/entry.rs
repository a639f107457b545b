//! Entries of the repacked container

use std::io::{Cursor, Read};

use crate::container::{ContainerIndex, TocEntry};
use crate::error::Result;

/// One entry of the output container.
///
/// The slot reserved for an entry (`new_size`) is never smaller than its
/// data; the difference is written as zeros.
#[derive(Debug)]
pub enum UndubEntry<'a> {
    /// Bytes read lazily from an existing container entry
    ContainerBacked {
        index: &'a ContainerIndex,
        /// Entry name inside `index`
        source: String,
        /// Name in the output container
        name: String,
        sequence: u32,
        data_size: u64,
        new_size: u64,
    },
    /// Bytes produced during the run
    Synthesized {
        name: String,
        sequence: u32,
        data: Vec<u8>,
    },
}

impl<'a> UndubEntry<'a> {
    /// Keep a recipient entry as it is.
    #[must_use]
    pub fn unchanged(index: &'a ContainerIndex, entry: &TocEntry) -> Self {
        Self::container_backed(index, entry, entry, 0)
    }

    /// Fill the slot of `target` with the bytes of `source` from `index`.
    ///
    /// The slot is at least `min_slot` bytes and never smaller than the
    /// source data.
    #[must_use]
    pub fn container_backed(
        index: &'a ContainerIndex,
        source: &TocEntry,
        target: &TocEntry,
        min_slot: u64,
    ) -> Self {
        Self::ContainerBacked {
            index,
            source: source.name.clone(),
            name: target.name.clone(),
            sequence: target.sequence,
            data_size: source.size,
            new_size: min_slot.max(source.size),
        }
    }

    /// Fill the slot of `target` with produced bytes.
    #[must_use]
    pub fn synthesized(target: &TocEntry, data: Vec<u8>) -> Self {
        Self::Synthesized {
            name: target.name.clone(),
            sequence: target.sequence,
            data,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::ContainerBacked { name, .. } | Self::Synthesized { name, .. } => name,
        }
    }

    /// Position in the physical payload order
    #[must_use]
    pub fn sequence(&self) -> u32 {
        match self {
            Self::ContainerBacked { sequence, .. } | Self::Synthesized { sequence, .. } => {
                *sequence
            }
        }
    }

    /// Bytes of real data
    #[must_use]
    pub fn data_size(&self) -> u64 {
        match self {
            Self::ContainerBacked { data_size, .. } => *data_size,
            Self::Synthesized { data, .. } => data.len() as u64,
        }
    }

    /// Bytes reserved for the entry
    #[must_use]
    pub fn new_size(&self) -> u64 {
        match self {
            Self::ContainerBacked { new_size, .. } => *new_size,
            Self::Synthesized { data, .. } => data.len() as u64,
        }
    }

    /// Whether the entry is the recipient's own, unmodified data
    #[must_use]
    pub fn is_unchanged(&self, recipient: &ContainerIndex) -> bool {
        match self {
            Self::ContainerBacked {
                index,
                source,
                name,
                ..
            } => std::ptr::eq(*index, recipient) && source == name,
            Self::Synthesized { .. } => false,
        }
    }

    /// Open the entry's data for one sequential read.
    pub fn open(&self) -> Result<Box<dyn Read + '_>> {
        match self {
            Self::ContainerBacked { index, source, .. } => Ok(Box::new(index.open_entry(source)?)),
            Self::Synthesized { data, .. } => Ok(Box::new(Cursor::new(data.as_slice()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::test_support::{ContainerFixture, write_container};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slots_only_grow() {
        let dir = tempfile::tempdir().unwrap();
        write_container(
            dir.path(),
            &ContainerFixture::new()
                .entry("A.STR", vec![1u8; 300])
                .entry("B.STR", vec![2u8; 100]),
        );
        let index = ContainerIndex::open_path(dir.path()).unwrap();
        let a = index.find("A.STR").unwrap();
        let b = index.find("B.STR").unwrap();

        let padded = UndubEntry::container_backed(&index, b, a, a.size);
        assert_eq!(padded.name(), "A.STR");
        assert_eq!(padded.sequence(), 0);
        assert_eq!(padded.data_size(), 100);
        assert_eq!(padded.new_size(), 300);
        assert!(!padded.is_unchanged(&index));

        let grown = UndubEntry::container_backed(&index, a, b, b.size);
        assert_eq!(grown.new_size(), 300);

        let kept = UndubEntry::unchanged(&index, a);
        assert!(kept.is_unchanged(&index));
        assert_eq!(kept.new_size(), 300);

        let mut data = Vec::new();
        padded.open().unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, vec![2u8; 100]);
    }

    #[test]
    fn test_synthesized_entry() {
        let target = TocEntry {
            name: "IG_MSG_E.OBJ".to_string(),
            sequence: 7,
            offset: 0,
            size: 10,
        };
        let entry = UndubEntry::synthesized(&target, vec![9u8; 12]);
        assert_eq!(entry.sequence(), 7);
        assert_eq!(entry.data_size(), 12);
        assert_eq!(entry.new_size(), 12);

        let mut data = Vec::new();
        entry.open().unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data.len(), 12);
    }
}
