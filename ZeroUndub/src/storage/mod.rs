//! Byte-range access over a backing store
//!
//! A game image is either an ISO 9660 disc image or a directory holding the
//! extracted root files. Both expose their resources by case-insensitive
//! name and can report where a resource lives inside its backing file, which
//! is what the repack writer needs to rewrite it in place.

mod bounded;
mod directory;
mod iso;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub use bounded::BoundedStream;
pub use directory::DirectoryAdapter;
pub use iso::IsoAdapter;

/// Absolute location of a resource inside its backing file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackingRange {
    /// File that physically holds the resource
    pub path: PathBuf,
    /// Byte offset of the resource inside `path`
    pub offset: u64,
    /// Resource length in bytes
    pub len: u64,
}

/// Read access to the named resources of one backing store.
///
/// Implementors only resolve names; reading goes through the backing file
/// reported by [`StorageAdapter::locate`].
pub trait StorageAdapter: std::fmt::Debug {
    /// Resolve a resource name (case-insensitive) to its stored name.
    fn find(&self, name: &str) -> Option<String>;

    /// Locate a resource inside its backing file.
    fn locate(&self, name: &str) -> Result<BackingRange>;

    /// Path this store was opened from.
    fn load_path(&self) -> &Path;

    /// Size of a resource in bytes.
    fn size(&self, name: &str) -> Result<u64> {
        Ok(self.locate(name)?.len)
    }

    /// Open a resource as a stream bounded to its byte range.
    fn open(&self, name: &str) -> Result<BoundedStream<File>> {
        let range = self.locate(name)?;
        let file = File::open(&range.path)?;
        Ok(BoundedStream::new(file, range.offset, range.len))
    }

    /// Read up to `size` bytes of a resource starting at `offset`.
    ///
    /// `None` reads to the end of the resource. Reads past the end are
    /// truncated rather than failing.
    fn read(&self, name: &str, size: Option<u64>, offset: u64) -> Result<Vec<u8>> {
        let mut stream = self.open(name)?;
        let available = stream.len().saturating_sub(offset);
        let size = size.map_or(available, |s| s.min(available));

        stream.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; usize::try_from(size).unwrap_or(usize::MAX)];
        stream.read_exact(&mut data)?;
        Ok(data)
    }
}

/// Returns true if the path is an existing file with an `.iso` extension
fn is_iso_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("iso"))
}

/// Open a game image as a storage backend.
///
/// An `.iso` file opens as a disc image, a directory as an extracted file
/// tree.
///
/// # Errors
///
/// Returns [`Error::UnsupportedSource`] for any other kind of path, or
/// [`Error::Io`] / [`Error::CorruptContainer`] if the backend cannot be read.
pub fn open_source(path: impl AsRef<Path>) -> Result<Box<dyn StorageAdapter>> {
    let path = path.as_ref();

    if is_iso_file(path) {
        tracing::debug!("Opening disc image {}", path.display());
        Ok(Box::new(IsoAdapter::open(path)?))
    } else if path.is_dir() {
        tracing::debug!("Opening directory {}", path.display());
        Ok(Box::new(DirectoryAdapter::open(path)?))
    } else {
        Err(Error::UnsupportedSource(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_source_rejects_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.bin");
        std::fs::write(&path, b"data").unwrap();

        let err = open_source(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSource(_)));
    }

    #[test]
    fn test_directory_read_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("IMG_HD.BIN"), b"0123456789").unwrap();

        let storage = open_source(dir.path()).unwrap();
        assert_eq!(storage.read("img_hd.bin", Some(4), 2).unwrap(), b"2345");
        assert_eq!(storage.read("IMG_HD.BIN", Some(100), 8).unwrap(), b"89");
        assert_eq!(storage.read("IMG_HD.BIN", None, 12).unwrap(), b"");
        assert_eq!(storage.size("Img_Hd.Bin").unwrap(), 10);
    }
}
