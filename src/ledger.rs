use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::LedgerError;
use crate::types::DedupKey;

/// Durable set of already-delivered `(number, code)` keys.
///
/// Stored on disk as a JSON array of `"<number>|<code>"` strings. The set
/// only grows: entries are never evicted, and every [`persist`](Self::persist)
/// overwrites the file with the complete set.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    keys: BTreeSet<DedupKey>,
}

impl Ledger {
    /// Empty ledger that will persist to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            keys: BTreeSet::new(),
        }
    }

    /// Load the ledger stored at `path`.
    ///
    /// A missing file yields an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the file exists but cannot be read, or
    /// [`LedgerError::Json`] if it is not a JSON array of strings.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No ledger on disk, starting empty");
                return Ok(Self::new(path));
            }
            Err(source) => return Err(LedgerError::Io { path, source }),
        };

        let keys: BTreeSet<DedupKey> = serde_json::from_slice(&bytes)?;
        tracing::info!(path = %path.display(), entries = keys.len(), "Ledger loaded");
        Ok(Self { path, keys })
    }

    #[must_use]
    pub fn contains(&self, key: &DedupKey) -> bool {
        self.keys.contains(key)
    }

    /// Record `key` as delivered. Returns `false` if it was already present.
    pub fn commit(&mut self, key: DedupKey) -> bool {
        self.keys.insert(key)
    }

    /// Write the full key set to disk, replacing the previous snapshot.
    ///
    /// The snapshot is written to a sibling temp file and renamed into
    /// place, so a crash mid-write leaves the old snapshot intact.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if serialization or any filesystem step fails.
    pub fn persist(&self) -> Result<(), LedgerError> {
        let json = serde_json::to_vec(&self.keys)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| self.io_error(source))?;
        }

        let tmp = self.tmp_path();
        std::fs::write(&tmp, json).map_err(|source| LedgerError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))?;

        tracing::debug!(path = %self.path.display(), entries = self.keys.len(), "Ledger persisted");
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
