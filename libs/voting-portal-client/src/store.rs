//! Persistent key/value storage for session tokens.

use std::{
    collections::BTreeMap,
    fmt::Debug,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::result::{Error, Result};

pub type DynTokenStore = Arc<dyn TokenStore + Send + Sync>;

/// A single change to a store: `Some` writes the value, `None` removes the key.
pub type Change<'a> = (&'a str, Option<&'a str>);

/// Key/value storage that outlives a single request. Values are strings, and
/// an empty value is never handed back.
pub trait TokenStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Applies every change or none of them.
    fn apply(&self, changes: &[Change<'_>]) -> Result<()>;

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.apply(&[(key, Some(value))])
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.apply(&[(key, None)])
    }
}

fn apply_changes(values: &mut BTreeMap<String, String>, changes: &[Change<'_>]) {
    for (key, value) in changes {
        match value {
            Some(value) => {
                values.insert((*key).to_owned(), (*value).to_owned());
            }
            None => {
                values.remove(*key);
            }
        }
    }
}

/// A store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.values
            .lock()
            .map_err(|e| Error::Storage(format!("token store lock poisoned: {e}")))
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).filter(|v| !v.is_empty()).cloned())
    }

    fn apply(&self, changes: &[Change<'_>]) -> Result<()> {
        apply_changes(&mut *self.lock()?, changes);
        Ok(())
    }
}

/// A store kept as a JSON object in a file. The file is read on every access
/// and replaced on every change, so several processes see each other's
/// writes (last writer wins). On unix the file is readable by its owner only.
pub struct FileTokenStore {
    path: PathBuf,

    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl Debug for FileTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTokenStore")
            .field("path", &self.path)
            .finish()
    }
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read(&self.path) {
            Ok(contents) if contents.is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_slice(&contents).map_err(|e| {
                Error::Storage(format!("invalid token file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the file in one rename so readers never see a partial write.
    fn write(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let contents = serde_json::to_vec_pretty(values)
            .map_err(|e| Error::Storage(format!("failed to serialize tokens: {e}")))?;
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(&contents)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| Error::from(e.error))?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.remove(key).filter(|v| !v.is_empty()))
    }

    fn apply(&self, changes: &[Change<'_>]) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| Error::Storage(format!("token store lock poisoned: {e}")))?;

        let mut values = match self.read() {
            Ok(values) => values,
            // nothing worth keeping in an unreadable file when only clearing keys
            Err(e @ Error::Storage(_)) if changes.iter().all(|(_, value)| value.is_none()) => {
                tracing::warn!("discarding unreadable token file: {e}");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        apply_changes(&mut values, changes);

        tracing::debug!("updating {} key(s) in {}", changes.len(), self.path.display());
        self.write(&values)
    }
}
