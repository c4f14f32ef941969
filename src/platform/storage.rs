//! Origin-scoped key-value storage
//!
//! Provides the synchronous string storage used by persistent state. Two
//! implementations are available: an in-memory store with an optional byte
//! quota, and a file-backed store that keeps one JSON document per origin in
//! an XDG-compliant data directory.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::PathBuf;

use directories::ProjectDirs;
use parking_lot::Mutex;
use thiserror::Error;

/// Errors that can occur when reading or writing storage
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying file access failed
    #[error("Storage I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Stored document could not be parsed
    #[error("Storage is corrupt: {0}")]
    Corrupt(String),

    /// Writing the value would exceed the storage quota
    #[error("Quota exceeded writing key '{key}': {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    /// Storage access is not permitted or the location is unusable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous string key-value storage scoped to a single origin
pub trait Storage: Send + Sync {
    /// Returns the value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any existing value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the value stored under `key`
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage, optionally limited to a total number of bytes
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Creates an empty, unlimited store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that rejects writes beyond `quota` bytes
    ///
    /// Keys and values both count towards the quota.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock();

        if let Some(quota) = self.quota {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.lock().remove(key);
        Ok(())
    }
}

/// File-backed storage holding one JSON document per origin
///
/// Documents live in the XDG data directory (`~/.local/share/frontkit/` on
/// Linux). Every operation reads the document from disk, so several
/// `FileStorage` instances for the same origin observe each other's writes.
#[derive(Debug)]
pub struct FileStorage {
    /// Directory where origin documents are stored
    data_dir: PathBuf,
    /// Origin this store is scoped to
    origin: String,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Creates storage for `origin` in the XDG-compliant data directory
    ///
    /// # Arguments
    /// * `origin` - Origin the stored values belong to, e.g. `https://example.com`
    ///
    /// # Returns
    /// * `Some(FileStorage)` rooted at the platform data directory, created on
    ///   the first write
    /// * `None` if the data directory cannot be determined (e.g., no home
    ///   directory)
    pub fn new(origin: impl Into<String>) -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "frontkit")?;
        let data_dir = project_dirs.data_dir().to_path_buf();
        Some(Self::with_dir(data_dir, origin))
    }

    /// Creates storage for `origin` in a custom directory
    ///
    /// Useful for testing or when a specific storage location is needed.
    pub fn with_dir(data_dir: PathBuf, origin: impl Into<String>) -> Self {
        Self {
            data_dir,
            origin: origin.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the origin this store is scoped to
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the path of the origin's document
    pub fn document_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", origin_slug(&self.origin)))
    }

    /// Reads the origin document, treating a missing file as empty
    fn read_document(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let path = self.document_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&path).map_err(|e| self.access_error(e))?;
        serde_json::from_str(&content)
            .map_err(|e| StorageError::Corrupt(format!("{}: {}", path.display(), e)))
    }

    /// Writes the origin document, creating the directory if missing
    fn write_document(&self, document: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if self.data_dir.exists() && !self.data_dir.is_dir() {
            return Err(StorageError::Unavailable(format!(
                "{} is not a directory",
                self.data_dir.display()
            )));
        }
        fs::create_dir_all(&self.data_dir).map_err(|e| self.access_error(e))?;

        let json = serde_json::to_string_pretty(document)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        fs::write(self.document_path(), json).map_err(|e| self.access_error(e))?;
        Ok(())
    }

    /// Maps permission failures to [`StorageError::Unavailable`]
    fn access_error(&self, e: io::Error) -> StorageError {
        match e.kind() {
            io::ErrorKind::PermissionDenied => StorageError::Unavailable(format!(
                "{}: {}",
                self.data_dir.display(),
                e
            )),
            _ => StorageError::Io(e),
        }
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_document()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let mut document = self.read_document()?;
        document.insert(key.to_string(), value.to_string());
        self.write_document(&document)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let mut document = self.read_document()?;
        if document.remove(key).is_some() {
            self.write_document(&document)?;
        }
        Ok(())
    }
}

/// Maps an origin such as `https://example.com:8080` to a file-name-safe slug
fn origin_slug(origin: &str) -> String {
    origin
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}
