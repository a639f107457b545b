//! `IMG_BD.BIN` container: embedded directory, offset table and index
//!
//! The container is the flat payload holding every named game resource.
//! Names come from a directory record embedded in the game executable,
//! positions from the `IMG_HD.BIN` offset table; the two are joined by
//! position into a [`ContainerIndex`].

mod directory;
mod index;
mod offset_table;
mod types;

pub use directory::parse_directory;
pub use index::ContainerIndex;
pub use offset_table::{RECORD_SIZE, parse_offset_table, write_offset_table};
pub use types::{
    DONOR_EXECUTABLE, DirectoryEntry, OFFSET_TABLE, OffsetRecord, PAYLOAD, RECIPIENT_EXECUTABLE,
    SECTOR_SIZE, TocEntry,
};

#[cfg(test)]
pub(crate) mod test_support {
    //! Synthetic containers for unit tests

    use std::path::Path;

    use super::{OffsetRecord, SECTOR_SIZE, write_offset_table};

    pub(crate) struct ContainerFixture {
        pub executable: &'static str,
        pub entries: Vec<(String, Vec<u8>)>,
        pub spare_bytes: u64,
    }

    impl ContainerFixture {
        pub fn new() -> Self {
            Self {
                executable: super::RECIPIENT_EXECUTABLE,
                entries: Vec::new(),
                spare_bytes: 0,
            }
        }

        pub fn donor() -> Self {
            Self {
                executable: super::DONOR_EXECUTABLE,
                ..Self::new()
            }
        }

        pub fn entry(mut self, name: &str, data: Vec<u8>) -> Self {
            self.entries.push((name.to_string(), data));
            self
        }

        pub fn spare(mut self, bytes: u64) -> Self {
            self.spare_bytes = bytes;
            self
        }
    }

    /// Write executable, offset table and payload into `dir`, each entry
    /// starting on its own sector.
    pub(crate) fn write_container(dir: &Path, fixture: &ContainerFixture) {
        let items: Vec<String> = fixture
            .entries
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{}:{i}", name.replacen('.', "_", 1)))
            .collect();
        let mut exe = b"\x7fELF\0\0\0\0".to_vec();
        exe.extend_from_slice(format!("CD_FILE_DAT:T=e{},;", items.join(",")).as_bytes());
        exe.extend_from_slice(&[0u8; 16]);

        let mut records = Vec::new();
        let mut payload = Vec::new();
        for (_, data) in &fixture.entries {
            records.push(OffsetRecord {
                sector: (payload.len() as u64 / SECTOR_SIZE) as u32,
                size: data.len() as u32,
            });
            payload.extend_from_slice(data);
            let padded = (data.len() as u64).div_ceil(SECTOR_SIZE).max(1) * SECTOR_SIZE;
            payload.resize(payload.len() + (padded as usize - data.len()), 0);
        }
        payload.resize(payload.len() + fixture.spare_bytes as usize, 0);

        std::fs::write(dir.join(fixture.executable), exe).unwrap();
        std::fs::write(dir.join("IMG_HD.BIN"), write_offset_table(&records)).unwrap();
        std::fs::write(dir.join("IMG_BD.BIN"), payload).unwrap();
    }
}
