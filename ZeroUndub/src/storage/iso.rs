//! Storage backed by an ISO 9660 disc image
//!
//! Only the root directory is indexed. Each file is a contiguous extent, so
//! a resource maps to a single byte range of the image file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};

use super::{BackingRange, StorageAdapter};
use crate::error::{Error, Result};

/// Size of a volume descriptor / raw data sector
const SECTOR_SIZE: u64 = 2048;
/// Volume descriptors start at sector 16
const DESCRIPTOR_START: u64 = 16;
const DESCRIPTOR_MAGIC: &[u8; 5] = b"CD001";
const DESCRIPTOR_PRIMARY: u8 = 1;
const DESCRIPTOR_TERMINATOR: u8 = 255;

const FLAG_DIRECTORY: u8 = 0x02;

/// Extent of one root-level file
#[derive(Debug, Clone, Copy)]
struct IsoExtent {
    offset: u64,
    len: u64,
}

/// Root-level files of an ISO 9660 image.
#[derive(Debug)]
pub struct IsoAdapter {
    path: PathBuf,
    /// Uppercased name -> (name as recorded, extent)
    files: HashMap<String, (String, IsoExtent)>,
}

impl IsoAdapter {
    /// Parse the primary volume descriptor and index the root directory.
    ///
    /// # Errors
    /// Returns [`Error::CorruptContainer`] if the image has no primary volume
    /// descriptor or its root directory is malformed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);

        let pvd = read_primary_descriptor(&mut reader)?;
        let block_size = u64::from(LittleEndian::read_u16(&pvd[128..130]));
        if block_size == 0 {
            return Err(Error::corrupt_container("ISO logical block size is zero"));
        }

        let root = &pvd[156..190];
        let root_extent = u64::from(LittleEndian::read_u32(&root[2..6]));
        let root_size = u64::from(LittleEndian::read_u32(&root[10..14]));

        let mut dir = vec![0u8; root_size as usize];
        reader.seek(SeekFrom::Start(root_extent * block_size))?;
        reader.read_exact(&mut dir)?;

        let files = parse_directory(&dir, block_size)?;
        tracing::debug!("Indexed {} root files in {}", files.len(), path.display());

        Ok(Self { path, files })
    }
}

/// Scan volume descriptors until the primary one is found.
fn read_primary_descriptor<R: Read + Seek>(reader: &mut R) -> Result<[u8; 2048]> {
    let mut sector = DESCRIPTOR_START;
    let mut buf = [0u8; SECTOR_SIZE as usize];

    loop {
        reader.seek(SeekFrom::Start(sector * SECTOR_SIZE))?;
        if reader.read_exact(&mut buf).is_err() {
            return Err(Error::corrupt_container("no primary volume descriptor"));
        }
        if &buf[1..6] != DESCRIPTOR_MAGIC {
            return Err(Error::corrupt_container(format!(
                "bad volume descriptor signature at sector {sector}"
            )));
        }
        match buf[0] {
            DESCRIPTOR_PRIMARY => return Ok(buf),
            DESCRIPTOR_TERMINATOR => {
                return Err(Error::corrupt_container("no primary volume descriptor"));
            }
            _ => sector += 1,
        }
    }
}

/// Parse the records of a directory extent.
///
/// A zero length byte pads to the end of the current logical block.
fn parse_directory(dir: &[u8], block_size: u64) -> Result<HashMap<String, (String, IsoExtent)>> {
    let block_size = block_size as usize;
    let mut files = HashMap::new();
    let mut pos = 0usize;

    while pos < dir.len() {
        let record_len = dir[pos] as usize;
        if record_len == 0 {
            pos = (pos / block_size + 1) * block_size;
            continue;
        }
        if record_len < 34 || pos + record_len > dir.len() {
            return Err(Error::corrupt_container(format!(
                "malformed directory record at 0x{pos:X}"
            )));
        }

        let record = &dir[pos..pos + record_len];
        pos += record_len;

        let name_len = record[32] as usize;
        if 33 + name_len > record.len() {
            return Err(Error::corrupt_container("directory record name overflows"));
        }
        if record[25] & FLAG_DIRECTORY != 0 {
            continue;
        }

        let raw_name = &record[33..33 + name_len];
        if raw_name == [0] || raw_name == [1] {
            continue;
        }

        let name = String::from_utf8_lossy(raw_name);
        let name = name.split(';').next().unwrap_or_default().to_string();
        let extent = IsoExtent {
            offset: u64::from(LittleEndian::read_u32(&record[2..6])) * block_size as u64,
            len: u64::from(LittleEndian::read_u32(&record[10..14])),
        };
        files.insert(name.to_ascii_uppercase(), (name, extent));
    }

    Ok(files)
}

impl StorageAdapter for IsoAdapter {
    fn find(&self, name: &str) -> Option<String> {
        self.files
            .get(&name.to_ascii_uppercase())
            .map(|(stored, _)| stored.clone())
    }

    fn locate(&self, name: &str) -> Result<BackingRange> {
        let (_, extent) = self
            .files
            .get(&name.to_ascii_uppercase())
            .ok_or_else(|| Error::MissingResource(name.to_string()))?;

        Ok(BackingRange {
            path: self.path.clone(),
            offset: extent.offset,
            len: extent.len,
        })
    }

    fn load_path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn dir_record(name: &[u8], extent: u32, size: u32, flags: u8) -> Vec<u8> {
        let len = 33 + name.len() + (1 - name.len() % 2);
        let mut record = vec![0u8; len];
        record[0] = len as u8;
        LittleEndian::write_u32(&mut record[2..6], extent);
        LittleEndian::write_u32(&mut record[10..14], size);
        record[25] = flags;
        record[32] = name.len() as u8;
        record[33..33 + name.len()].copy_from_slice(name);
        record
    }

    /// Build a tiny ISO image holding the given root files
    pub(crate) fn build_iso(files: &[(&str, &[u8])]) -> Vec<u8> {
        let root_sector = 18u32;
        let first_data = 19u32;

        let mut dir = Vec::new();
        dir.extend(dir_record(&[0], root_sector, 2048, FLAG_DIRECTORY));
        dir.extend(dir_record(&[1], root_sector, 2048, FLAG_DIRECTORY));

        let mut data_sector = first_data;
        let mut data = Vec::new();
        for (name, content) in files {
            let recorded = format!("{name};1");
            dir.extend(dir_record(recorded.as_bytes(), data_sector, content.len() as u32, 0));
            let mut padded = content.to_vec();
            padded.resize(content.len().div_ceil(2048).max(1) * 2048, 0);
            data_sector += (padded.len() / 2048) as u32;
            data.extend(padded);
        }
        dir.resize(2048, 0);

        let mut image = vec![0u8; 16 * 2048];

        let mut pvd = vec![0u8; 2048];
        pvd[0] = DESCRIPTOR_PRIMARY;
        pvd[1..6].copy_from_slice(DESCRIPTOR_MAGIC);
        LittleEndian::write_u16(&mut pvd[128..130], 2048);
        pvd[156..190].copy_from_slice(&dir_record(&[0], root_sector, 2048, FLAG_DIRECTORY));
        image.extend(pvd);

        let mut terminator = vec![0u8; 2048];
        terminator[0] = DESCRIPTOR_TERMINATOR;
        terminator[1..6].copy_from_slice(DESCRIPTOR_MAGIC);
        image.extend(terminator);

        image.extend(dir);
        image.extend(data);
        image
    }

    #[test]
    fn test_root_files_are_located() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.iso");
        std::fs::write(&path, build_iso(&[("IMG_HD.BIN", b"header"), ("IMG_BD.BIN", b"body!")]))
            .unwrap();

        let adapter = IsoAdapter::open(&path).unwrap();
        assert_eq!(adapter.find("img_bd.bin").as_deref(), Some("IMG_BD.BIN"));

        let range = adapter.locate("IMG_HD.BIN").unwrap();
        assert_eq!(range.offset, 19 * 2048);
        assert_eq!(range.len, 6);

        assert_eq!(adapter.read("IMG_BD.BIN", None, 0).unwrap(), b"body!");
    }

    #[test]
    fn test_image_without_descriptor_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.iso");
        std::fs::write(&path, vec![0u8; 20 * 2048]).unwrap();

        let err = IsoAdapter::open(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptContainer { .. }));
    }
}
