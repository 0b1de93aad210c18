//! File-backed key-value storage.
//!
//! One file per key under a state directory. Writes go through a temp file
//! plus rename so a crash mid-write leaves either the old value or the new
//! one, never a torn file. All I/O failures are logged and swallowed; the
//! caller sees absence instead of an error.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::KeyValueStore;

/// Durable storage rooted at a directory on disk.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        if let Err(error) = fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), %error, "failed to create state directory");
        }
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are fixed identifiers (see `storage::keys`); replace anything
        // path-like defensively so a key can never escape the state dir.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(safe)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(error) if error.kind() == ErrorKind::NotFound => None,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to read persisted value");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        let result = fs::write(&tmp, value).and_then(|()| fs::rename(&tmp, &path));
        if let Err(error) = result {
            tracing::warn!(path = %path.display(), %error, "failed to persist value");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.path_for(key);
        if let Err(error) = fs::remove_file(&path)
            && error.kind() != ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), %error, "failed to remove persisted value");
        }
    }
}
