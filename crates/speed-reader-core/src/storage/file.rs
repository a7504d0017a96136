use super::{KeyValueStore, check_quota};
use crate::error::{ReaderError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// One file per key under `root`; file names are the SHA-256 of the key so
/// any key is a safe file name.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>, quota_bytes: Option<u64>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| ReaderError::storage(root.display().to_string(), err))?;
        debug!(root = %root.display(), quota_bytes, "Opened file store");
        Ok(Self { root, quota_bytes })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.root.join(format!("{:x}.json", hasher.finalize()))
    }

    pub fn used_bytes(&self) -> Result<u64> {
        let entries =
            fs::read_dir(&self.root).map_err(|err| ReaderError::storage("<root>", err))?;
        let mut total = 0u64;
        for entry in entries.flatten() {
            if let Ok(meta) = entry.metadata() {
                if meta.is_file() {
                    total += meta.len();
                }
            }
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ReaderError::storage(key, err)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        if self.quota_bytes.is_some() {
            let existing = fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);
            let used = self.used_bytes()?.saturating_sub(existing);
            check_quota(key, used, value.len() as u64, self.quota_bytes)?;
        }
        // Write beside the target and rename so a failed write never leaves
        // a truncated value behind.
        let staging = path.with_extension("json.tmp");
        let written = fs::write(&staging, value).and_then(|_| fs::rename(&staging, &path));
        match written {
            Ok(()) => {
                trace!(key, bytes = value.len(), "Stored value");
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_file(&staging);
                if err.kind() == ErrorKind::StorageFull {
                    Err(ReaderError::StorageQuotaExceeded {
                        what: key.to_string(),
                    })
                } else {
                    Err(ReaderError::storage(key, err))
                }
            }
        }
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ReaderError::storage(key, err)),
        }
    }
}
