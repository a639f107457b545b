//! Storage backed by a directory of extracted disc files

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{BackingRange, StorageAdapter};
use crate::error::{Error, Result};

/// Root-level files of a directory, looked up case-insensitively.
///
/// Subdirectories are not descended into; the game keeps everything the
/// undub touches at the disc root.
#[derive(Debug)]
pub struct DirectoryAdapter {
    root: PathBuf,
    /// Uppercased name -> name as stored on disk
    files: HashMap<String, String>,
}

impl DirectoryAdapter {
    /// Index the files directly under `root`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be listed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut files = HashMap::new();

        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            files.insert(name.to_ascii_uppercase(), name);
        }

        tracing::debug!("Indexed {} files in {}", files.len(), root.display());
        Ok(Self { root, files })
    }
}

impl StorageAdapter for DirectoryAdapter {
    fn find(&self, name: &str) -> Option<String> {
        self.files.get(&name.to_ascii_uppercase()).cloned()
    }

    fn locate(&self, name: &str) -> Result<BackingRange> {
        let stored = self
            .find(name)
            .ok_or_else(|| Error::MissingResource(name.to_string()))?;
        let path = self.root.join(stored);
        let len = fs::metadata(&path)?.len();

        Ok(BackingRange {
            path,
            offset: 0,
            len,
        })
    }

    fn load_path(&self) -> &Path {
        &self.root
    }
}
