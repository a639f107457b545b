//! Output image writing

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::entry::UndubEntry;
use super::layout::Layout;
use super::types::{ProgressCallback, RepackPhase, RepackProgress};
use crate::container::{OffsetRecord, SECTOR_SIZE, write_offset_table};
use crate::error::{Error, Result};
use crate::storage::StorageAdapter;

/// Entry data is streamed in chunks of this size
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Image copies are done in blocks of this size
pub const COPY_BLOCK_SIZE: usize = 1024 * 1024;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Copies files block by block, reporting one progress unit per block.
struct BlockCopier<'a> {
    done: usize,
    total: usize,
    progress: ProgressCallback<'a>,
}

impl BlockCopier<'_> {
    fn blocks(len: u64) -> usize {
        len.div_ceil(COPY_BLOCK_SIZE as u64) as usize
    }

    fn copy(&mut self, src: &Path, dst: &Path) -> Result<u64> {
        let mut reader = File::open(src)?;
        let mut writer = OpenOptions::new().write(true).create_new(true).open(dst)?;
        let mut buffer = vec![0u8; COPY_BLOCK_SIZE];
        let mut copied = 0u64;
        let name = file_name(src);

        loop {
            let read = read_full(&mut reader, &mut buffer)?;
            if read == 0 {
                break;
            }
            writer.write_all(&buffer[..read])?;
            copied += read as u64;
            self.done += 1;
            (self.progress)(&RepackProgress::with_file(
                RepackPhase::Copying,
                self.done,
                self.total,
                name.as_str(),
            ));
        }

        writer.flush()?;
        Ok(copied)
    }
}

/// Fill `buffer` as far as the reader allows.
fn read_full(reader: &mut impl Read, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let read = reader.read(&mut buffer[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

/// Copy a file in 1 MiB blocks.
///
/// # Errors
/// Fails if `dst` already exists.
pub fn copy_file(src: &Path, dst: &Path, progress: ProgressCallback) -> Result<u64> {
    let total = BlockCopier::blocks(fs::metadata(src)?.len());
    progress(&RepackProgress::with_file(
        RepackPhase::Copying,
        0,
        total,
        file_name(src),
    ));

    BlockCopier {
        done: 0,
        total,
        progress,
    }
    .copy(src, dst)
}

/// Copy a game image to `dst`: an image file as a whole, or the root files
/// of an extracted directory into a new directory.
///
/// # Errors
/// Fails if `dst` already exists.
pub fn copy_source(src: &Path, dst: &Path, progress: ProgressCallback) -> Result<u64> {
    if !src.is_dir() {
        return copy_file(src, dst, progress);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push((entry.path(), entry.metadata()?.len()));
        }
    }
    files.sort();

    fs::create_dir(dst)?;
    let total = files.iter().map(|(_, len)| BlockCopier::blocks(*len)).sum();
    progress(&RepackProgress::new(RepackPhase::Copying, 0, total));

    let mut copier = BlockCopier {
        done: 0,
        total,
        progress,
    };
    let mut copied = 0;
    for (path, _) in &files {
        copied += copier.copy(path, &dst.join(file_name(path)))?;
    }

    tracing::info!(
        "Copied {} files ({} bytes) to {}",
        files.len(),
        copied,
        dst.display()
    );
    Ok(copied)
}

/// Entry positions sorted by physical order
fn physical_order(entries: &[UndubEntry]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by_key(|&i| (entries[i].sequence(), i));
    order
}

/// Slot sizes in physical order, the input to layout planning.
#[must_use]
pub fn slot_sizes(entries: &[UndubEntry]) -> Vec<u64> {
    physical_order(entries)
        .into_iter()
        .map(|i| entries[i].new_size())
        .collect()
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::corrupt_container(format!("{what} {value} does not fit 32 bits")))
}

/// Rewrites the offset table and payload of an output image in place.
pub struct ContainerWriter<'a> {
    storage: &'a dyn StorageAdapter,
    table: String,
    payload: String,
}

impl<'a> ContainerWriter<'a> {
    /// Resolve the offset table and payload of an output image.
    ///
    /// # Errors
    /// Returns [`Error::CorruptContainer`] if either is missing.
    pub fn new(storage: &'a dyn StorageAdapter) -> Result<Self> {
        let find = |name: &str| {
            storage
                .find(name)
                .ok_or_else(|| Error::corrupt_container(format!("{name} not found in output")))
        };

        Ok(Self {
            storage,
            table: find(crate::container::OFFSET_TABLE)?,
            payload: find(crate::container::PAYLOAD)?,
        })
    }

    /// Write `entries` (in directory order) at the slots of `layout`
    /// (in physical order).
    ///
    /// Reports `entries + 1` units: the offset table, then every entry.
    pub fn write(
        &self,
        entries: &[UndubEntry],
        layout: &Layout,
        progress: ProgressCallback,
    ) -> Result<()> {
        let total = entries.len() + 1;
        progress(&RepackProgress::new(RepackPhase::WritingTable, 0, total));

        let order = physical_order(entries);
        let mut slots = vec![0u64; entries.len()];
        for (position, &index) in order.iter().enumerate() {
            slots[index] = layout.offsets[position];
        }

        self.write_table(entries, &slots)?;
        progress(&RepackProgress::with_file(
            RepackPhase::WritingTable,
            1,
            total,
            self.table.as_str(),
        ));

        let range = self.storage.locate(&self.payload)?;
        if layout.total > range.len {
            return Err(Error::CapacityExceeded {
                required: layout.total,
                capacity: range.len,
            });
        }

        let mut file = OpenOptions::new().write(true).open(&range.path)?;
        let mut buffer = vec![0u8; CHUNK_SIZE];

        for (position, &index) in order.iter().enumerate() {
            let entry = &entries[index];
            let start = layout.offsets[position];
            let end = layout.slot_end(position);

            file.seek(SeekFrom::Start(range.offset + start))?;
            let written = Self::stream_entry(entry, &mut file, &mut buffer)?;
            if written != entry.data_size() {
                return Err(Error::corrupt_container(format!(
                    "{} yielded {written} bytes, expected {}",
                    entry.name(),
                    entry.data_size()
                )));
            }
            Self::zero_fill(&mut file, end.saturating_sub(start + written))?;

            progress(&RepackProgress::with_file(
                RepackPhase::WritingEntries,
                position + 2,
                total,
                entry.name(),
            ));
        }

        file.flush()?;
        tracing::info!(
            "Wrote {} entries, {} payload bytes",
            entries.len(),
            layout.total
        );
        Ok(())
    }

    fn write_table(&self, entries: &[UndubEntry], slots: &[u64]) -> Result<()> {
        let records = entries
            .iter()
            .zip(slots)
            .map(|(entry, &offset)| {
                Ok(OffsetRecord {
                    sector: to_u32(offset / SECTOR_SIZE, "sector")?,
                    size: to_u32(entry.new_size(), "entry size")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let table = write_offset_table(&records);

        let range = self.storage.locate(&self.table)?;
        if table.len() as u64 != range.len {
            return Err(Error::corrupt_container(format!(
                "offset table is {} bytes, output holds {}",
                table.len(),
                range.len
            )));
        }

        let mut file = OpenOptions::new().write(true).open(&range.path)?;
        file.seek(SeekFrom::Start(range.offset))?;
        file.write_all(&table)?;
        file.flush()?;
        Ok(())
    }

    fn stream_entry(entry: &UndubEntry, out: &mut File, buffer: &mut [u8]) -> Result<u64> {
        let mut reader = entry.open()?;
        let mut written = 0u64;
        loop {
            let read = reader.read(buffer)?;
            if read == 0 {
                break;
            }
            out.write_all(&buffer[..read])?;
            written += read as u64;
        }
        Ok(written)
    }

    fn zero_fill(out: &mut File, mut len: u64) -> Result<()> {
        let zeros = [0u8; CHUNK_SIZE];
        while len > 0 {
            let chunk = len.min(CHUNK_SIZE as u64) as usize;
            out.write_all(&zeros[..chunk])?;
            len -= chunk as u64;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_copy_file_refuses_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.iso");
        let dst = dir.path().join("out.iso");
        fs::write(&src, vec![7u8; COPY_BLOCK_SIZE + 10]).unwrap();

        let calls = RefCell::new(Vec::new());
        let copied = copy_file(&src, &dst, &|p| calls.borrow_mut().push((p.current, p.total)))
            .unwrap();
        assert_eq!(copied, COPY_BLOCK_SIZE as u64 + 10);
        assert_eq!(fs::read(&dst).unwrap(), fs::read(&src).unwrap());
        assert_eq!(calls.into_inner(), vec![(0, 2), (1, 2), (2, 2)]);

        let err = copy_file(&src, &dst, &|_| {}).unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == std::io::ErrorKind::AlreadyExists));
    }

    #[test]
    fn test_copy_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("image");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("A.BIN"), [1u8; 3]).unwrap();
        fs::write(src.join("B.BIN"), [2u8; 5]).unwrap();
        fs::create_dir(src.join("MOVIE")).unwrap();

        let dst = dir.path().join("copy");
        assert_eq!(copy_source(&src, &dst, &|_| {}).unwrap(), 8);
        assert_eq!(fs::read(dst.join("B.BIN")).unwrap(), vec![2u8; 5]);
        assert!(!dst.join("MOVIE").exists());
    }
}
