//! Container table of contents

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::directory::parse_directory;
use super::offset_table::parse_offset_table;
use super::types::{DONOR_EXECUTABLE, OFFSET_TABLE, PAYLOAD, RECIPIENT_EXECUTABLE, TocEntry};
use crate::error::{Error, Result};
use crate::storage::{BackingRange, BoundedStream, StorageAdapter, open_source};

/// Index of every named resource in a game image's container.
///
/// Entries are kept in directory order; the name map points into that
/// vector. The index is immutable once built.
#[derive(Debug)]
pub struct ContainerIndex {
    storage: Box<dyn StorageAdapter>,
    executable: String,
    entries: Vec<TocEntry>,
    by_name: HashMap<String, usize>,
    capacity: u64,
}

impl ContainerIndex {
    /// Open the game image at `path` (an `.iso` file or a directory).
    ///
    /// # Errors
    /// Fails with [`Error::UnsupportedSource`] for other paths, or as
    /// [`ContainerIndex::open`] does.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(open_source(path)?)
    }

    /// Build the index from a storage backend.
    ///
    /// # Errors
    /// Returns [`Error::CorruptContainer`] if the executable, offset table or
    /// payload is missing, if the directory and offset table disagree on the
    /// entry count, or if an entry extends past the payload.
    pub fn open(storage: Box<dyn StorageAdapter>) -> Result<Self> {
        let executable = storage
            .find(RECIPIENT_EXECUTABLE)
            .or_else(|| storage.find(DONOR_EXECUTABLE))
            .ok_or_else(|| Error::corrupt_container("no game executable found"))?;
        let table = storage
            .find(OFFSET_TABLE)
            .ok_or_else(|| Error::corrupt_container(format!("{OFFSET_TABLE} not found")))?;
        let payload = storage
            .find(PAYLOAD)
            .ok_or_else(|| Error::corrupt_container(format!("{PAYLOAD} not found")))?;

        let directory = parse_directory(&storage.read(&executable, None, 0)?)?;
        let records = parse_offset_table(&storage.read(&table, None, 0)?)?;

        if directory.len() != records.len() {
            return Err(Error::corrupt_container(format!(
                "directory lists {} entries but the offset table has {}",
                directory.len(),
                records.len()
            )));
        }

        let entries: Vec<TocEntry> = directory
            .into_iter()
            .zip(records)
            .map(|(dir, record)| TocEntry {
                name: dir.name,
                sequence: dir.sequence,
                offset: record.byte_offset(),
                size: u64::from(record.size),
            })
            .collect();

        let capacity = storage.size(&payload)?;
        let used = entries.iter().map(TocEntry::end).max().unwrap_or(0);
        if used > capacity {
            return Err(Error::corrupt_container(format!(
                "entries extend to {used} bytes but {PAYLOAD} holds {capacity}"
            )));
        }

        let by_name = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.name.to_ascii_uppercase(), index))
            .collect();

        tracing::info!(
            "Opened container in {}: {} entries, {} byte capacity",
            storage.load_path().display(),
            entries.len(),
            capacity
        );

        Ok(Self {
            storage,
            executable,
            entries,
            by_name,
            capacity,
        })
    }

    /// Look up an entry by name, ignoring case.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&TocEntry> {
        self.position(name).map(|index| &self.entries[index])
    }

    /// Directory index of an entry, ignoring case.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_uppercase()).copied()
    }

    /// Entry at a directory index
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&TocEntry> {
        self.entries.get(index)
    }

    /// All entries in directory order
    #[must_use]
    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    /// Entry names in directory order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Physical size of the payload
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Stored name of the executable the directory was read from
    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// The backing store
    #[must_use]
    pub fn storage(&self) -> &dyn StorageAdapter {
        self.storage.as_ref()
    }

    /// Location of the offset table inside its backing file
    pub fn offset_table_range(&self) -> Result<BackingRange> {
        self.storage.locate(OFFSET_TABLE)
    }

    /// Location of the payload inside its backing file
    pub fn payload_range(&self) -> Result<BackingRange> {
        self.storage.locate(PAYLOAD)
    }

    fn require(&self, name: &str) -> Result<&TocEntry> {
        self.find(name)
            .ok_or_else(|| Error::MissingResource(name.to_string()))
    }

    /// Open an entry as a stream bounded to `[offset, offset + size)`.
    ///
    /// # Errors
    /// Returns [`Error::MissingResource`] if no entry has that name.
    pub fn open_entry(&self, name: &str) -> Result<BoundedStream<File>> {
        let entry = self.require(name)?;
        let payload = self.payload_range()?;
        let file = File::open(&payload.path)?;
        Ok(BoundedStream::new(
            file,
            payload.offset + entry.offset,
            entry.size,
        ))
    }

    /// Read up to `size` bytes of an entry starting at `offset`.
    ///
    /// `None` reads to the end of the entry; reads are truncated at the
    /// entry boundary.
    pub fn read(&self, name: &str, size: Option<u64>, offset: u64) -> Result<Vec<u8>> {
        let mut stream = self.open_entry(name)?;
        let available = stream.len().saturating_sub(offset);
        let size = size.map_or(available, |s| s.min(available));

        stream.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; size as usize];
        stream.read_exact(&mut data)?;
        Ok(data)
    }

    /// Read a whole entry
    pub fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        self.read(name, None, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SECTOR_SIZE;
    use crate::container::test_support::{ContainerFixture, write_container};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_open_and_read_entries() {
        let dir = tempfile::tempdir().unwrap();
        write_container(
            dir.path(),
            &ContainerFixture::new()
                .entry("A.BIN", vec![1u8; 100])
                .entry("SCENE01.STR", vec![2u8; 3000]),
        );

        let index = ContainerIndex::open_path(dir.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["A.BIN", "SCENE01.STR"]);

        let scene = index.find("scene01.str").unwrap();
        assert_eq!(scene.sequence, 1);
        assert_eq!(scene.offset, 2048);
        assert_eq!(scene.size, 3000);

        assert_eq!(index.read("A.BIN", Some(4), 98).unwrap(), vec![1, 1]);
        assert_eq!(index.read_entry("SCENE01.STR").unwrap(), vec![2u8; 3000]);
        assert!(matches!(
            index.read_entry("NOPE.BIN"),
            Err(Error::MissingResource(_))
        ));
    }

    #[test]
    fn test_capacity_counts_spare_payload() {
        let dir = tempfile::tempdir().unwrap();
        write_container(
            dir.path(),
            &ContainerFixture::new()
                .entry("A.BIN", vec![1u8; 10])
                .spare(2 * SECTOR_SIZE),
        );

        let index = ContainerIndex::open_path(dir.path()).unwrap();
        assert_eq!(index.capacity(), 3 * SECTOR_SIZE);
        assert_eq!(index.payload_range().unwrap().len, 3 * SECTOR_SIZE);
    }

    #[test]
    fn test_count_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        write_container(dir.path(), &ContainerFixture::new().entry("A.BIN", vec![0u8; 10]));
        std::fs::write(dir.path().join("IMG_HD.BIN"), [0u8; 16]).unwrap();

        let err = ContainerIndex::open_path(dir.path()).unwrap_err();
        assert!(matches!(err, Error::CorruptContainer { .. }));
    }

    #[test]
    fn test_entry_past_payload_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        write_container(dir.path(), &ContainerFixture::new().entry("A.BIN", vec![0u8; 10]));
        std::fs::write(dir.path().join("IMG_BD.BIN"), [0u8; 4]).unwrap();

        let err = ContainerIndex::open_path(dir.path()).unwrap_err();
        assert!(matches!(err, Error::CorruptContainer { .. }));
    }

    #[test]
    fn test_missing_executable_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        write_container(dir.path(), &ContainerFixture::new().entry("A.BIN", vec![0u8; 10]));
        std::fs::remove_file(dir.path().join("SLES_508.21")).unwrap();

        let err = ContainerIndex::open_path(dir.path()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CorruptContainer);
    }
}
