//! Durable token storage

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Flat key/value store for tokens
pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local storage, lost on exit
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Tokens kept in a JSON object on disk
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash never leaves a half-written file behind. On Unix the
/// file is readable by its owner only.
#[derive(Debug)]
pub struct FileTokenStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStorage {
    /// Use `path` as the backing file; it is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Default location inside a state directory
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("tokens.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        // Unique sibling so concurrent writers never share a temp file
        let mut tmp = NamedTempFile::new_in(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        serde_json::to_writer_pretty(&mut tmp, entries)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries()?;
        if f(&mut entries) {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

impl TokenStorage for FileTokenStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryTokenStorage::new();
        assert_eq!(storage.get("accessToken").unwrap(), None);

        storage.set("accessToken", "A1").unwrap();
        assert_eq!(storage.get("accessToken").unwrap().as_deref(), Some("A1"));

        storage.remove("accessToken").unwrap();
        storage.remove("accessToken").unwrap();
        assert_eq!(storage.get("accessToken").unwrap(), None);
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let storage = FileTokenStorage::in_dir(dir.path());
        storage.set("admin_token", "T1").unwrap();
        storage.set("accessToken", "A1").unwrap();

        let reopened = FileTokenStorage::in_dir(dir.path());
        assert_eq!(reopened.get("admin_token").unwrap().as_deref(), Some("T1"));
        assert_eq!(reopened.get("accessToken").unwrap().as_deref(), Some("A1"));

        reopened.remove("admin_token").unwrap();
        assert_eq!(storage.get("admin_token").unwrap(), None);
        assert_eq!(storage.get("accessToken").unwrap().as_deref(), Some("A1"));
    }

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("nested").join("tokens.json"));

        assert_eq!(storage.get("refreshToken").unwrap(), None);
        storage.remove("refreshToken").unwrap();
        assert!(!storage.path().exists());

        storage.set("refreshToken", "R1").unwrap();
        assert!(storage.path().exists());
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::in_dir(dir.path());
        std::fs::write(storage.path(), "not json").unwrap();

        assert!(matches!(
            storage.get("accessToken"),
            Err(Error::Serialization(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::in_dir(dir.path());
        storage.set("refreshToken", "R1").unwrap();

        let mode = std::fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_storage_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::in_dir(dir.path());
        storage.set("accessToken", "A1").unwrap();
        storage.set("refreshToken", "R1").unwrap();
        storage.remove("accessToken").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("tokens.json")]);
    }

    #[test]
    fn test_file_storage_parallel_writers_keep_file_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        std::thread::scope(|scope| {
            for writer in 0..4 {
                let path = path.clone();
                scope.spawn(move || {
                    let storage = FileTokenStorage::new(path);
                    for round in 0..20 {
                        storage
                            .set("accessToken", &format!("A{writer}-{round}"))
                            .unwrap();
                    }
                });
            }
        });

        let storage = FileTokenStorage::new(path);
        assert!(storage.get("accessToken").unwrap().is_some());
    }
}
