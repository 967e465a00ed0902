//! `KvStore` implementations: in-memory for tests and embedding, one file
//! per key for the CLI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pacer_traits::{BoxError, KvStore};

use crate::atomic::write_atomic;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw access for tests that need to tamper with a stored record.
    pub fn raw(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn insert_raw(&mut self, key: &str, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.to_string(), value.into());
    }
}

impl KvStore for MemoryStore {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), BoxError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), BoxError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileStore {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), BoxError> {
        write_atomic(&self.path_for(key), value)?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), BoxError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Box::new(e)),
        }
    }
}

/// Store that fails every operation; used to exercise I/O error paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

impl KvStore for FailingStore {
    fn get(&mut self, _key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        Err(Box::new(std::io::Error::other("failing store")))
    }

    fn put(&mut self, _key: &str, _value: &[u8]) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("failing store")))
    }

    fn delete(&mut self, _key: &str) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("failing store")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trip_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = FileStore::open(dir.path().join("state")).unwrap();
        assert_eq!(s.get("finish_times").unwrap(), None);
        s.put("finish_times", b"{}").unwrap();
        assert_eq!(s.get("finish_times").unwrap().as_deref(), Some(&b"{}"[..]));
        s.delete("finish_times").unwrap();
        assert_eq!(s.get("finish_times").unwrap(), None);
        // deleting a missing key is fine
        s.delete("finish_times").unwrap();
    }

    #[test]
    fn memory_store_basics() {
        let mut s = MemoryStore::new();
        s.put("k", b"v").unwrap();
        assert_eq!(s.raw("k"), Some(&b"v"[..]));
        s.delete("k").unwrap();
        assert_eq!(s.get("k").unwrap(), None);
    }
}
