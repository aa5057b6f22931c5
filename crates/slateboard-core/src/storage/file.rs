//! Filesystem snapshot backend.
//!
//! Each snapshot is a `{id}.json` file under a root directory. Ids map
//! directly to file stems, so the backend rejects ids that would escape
//! the root via path separators.

use super::{Storage, StorageError, StorageResult};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Snapshot storage backed by a directory of JSON files.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> StorageResult<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid snapshot id {id:?}"),
            )));
        }
        Ok(self.root.join(format!("{id}.json")))
    }
}

impl Storage for FileStorage {
    fn save(&mut self, id: &str, blob: &[u8]) -> StorageResult<()> {
        let path = self.path_for(id)?;
        fs::write(&path, blob)?;
        debug!("saved snapshot {id} ({} bytes)", blob.len());
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&mut self, id: &str) -> StorageResult<()> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn exists(&self, id: &str) -> bool {
        self.path_for(id).is_ok_and(|path| path.exists())
    }
}
