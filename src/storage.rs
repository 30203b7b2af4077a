//! Storage abstraction layer.
//!
//! An index lives in a [`Storage`]: a flat namespace of named files plus a
//! [`LockManager`] for exclusive writer locks. The backend is chosen by the
//! caller through [`StorageConfig`] and built by [`StorageFactory`]; nothing
//! in the indexing core looks at the host platform to pick one.
//!
//! # Storage Types
//!
//! ## FileStorage
//! - A directory on disk, created on demand
//! - Buffered I/O with optional fsync on close
//! - Lock files (`<name>.lock`) shared between processes
//!
//! ## MemoryStorage
//! - In-memory files for tests and ephemeral indexes
//! - Share one instance through `Arc` to reopen an index within a process
//!
//! # Example
//!
//! ```
//! use docindex::storage::{StorageConfig, StorageFactory};
//! use docindex::storage::memory::MemoryStorageConfig;
//!
//! # fn main() -> docindex::error::Result<()> {
//! let storage = StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default()))?;
//! assert!(storage.list_files()?.is_empty());
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, Result};

pub mod file;
pub mod memory;

/// A trait for storage backends that can store and retrieve named files.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Human-readable location, used in error messages.
    fn location(&self) -> String;

    /// Open an existing file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create a file for writing, truncating any existing file.
    ///
    /// The file becomes visible under `name` once the output is closed.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files in the storage, sorted by name.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Rename a file, replacing any file already named `new_name`.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Sync all pending writes to storage.
    fn sync(&self) -> Result<()>;

    /// The lock manager coordinating writers of this storage.
    fn lock_manager(&self) -> Arc<dyn LockManager>;

    /// Close the storage; later operations fail with [`StorageError::StorageClosed`].
    fn close(&self) -> Result<()>;

    /// Whether [`close`](Storage::close) has been called.
    fn is_closed(&self) -> bool;
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Send + std::fmt::Debug {
    /// Get the size of the input stream.
    fn size(&self) -> Result<u64>;
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Send + std::fmt::Debug {
    /// Flush buffered data and sync it to the backing medium.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Close the output stream, publishing the file.
    fn close(&mut self) -> Result<()>;
}

/// A lock manager for coordinating access to storage.
pub trait LockManager: Send + Sync + std::fmt::Debug {
    /// Acquire a lock with the given name, failing if it is already held.
    fn acquire_lock(&self, name: &str) -> Result<Box<dyn StorageLock>>;

    /// Try to acquire a lock with the given name, returning None if not available.
    fn try_acquire_lock(&self, name: &str) -> Result<Option<Box<dyn StorageLock>>>;

    /// Check if a lock with the given name is currently held.
    fn lock_exists(&self, name: &str) -> bool;
}

/// A held lock on a resource in storage. Dropping the lock releases it.
pub trait StorageLock: Send + std::fmt::Debug {
    /// Get the name of the lock.
    fn name(&self) -> &str;

    /// Release the lock. Releasing twice is a no-op.
    fn release(&mut self) -> Result<()>;

    /// Check if the lock is still held by this handle.
    fn is_valid(&self) -> bool;
}

/// Error types specific to storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// File not found.
    FileNotFound(String),

    /// Permission denied.
    PermissionDenied(String),

    /// I/O error.
    IoError(String),

    /// Lock acquisition failed because the lock is held.
    LockFailed(String),

    /// Storage is closed.
    StorageClosed,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::FileNotFound(name) => write!(f, "File not found: {name}"),
            StorageError::PermissionDenied(name) => write!(f, "Permission denied: {name}"),
            StorageError::IoError(msg) => write!(f, "I/O error: {msg}"),
            StorageError::LockFailed(name) => write!(f, "Failed to acquire lock: {name}"),
            StorageError::StorageClosed => write!(f, "Storage is closed"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for IndexerError {
    fn from(err: StorageError) -> Self {
        IndexerError::storage(err.to_string())
    }
}

impl StorageError {
    /// Map an I/O error on `name` to the closest storage error.
    pub fn from_io(name: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::FileNotFound(name.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                StorageError::PermissionDenied(name.to_string())
            }
            _ => StorageError::IoError(format!("{name}: {err}")),
        }
    }
}

/// Storage backend selection.
///
/// Serialized with a `type` tag, e.g. `{"type": "file", "path": "index"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// File-based storage configuration (includes path)
    File(file::FileStorageConfig),

    /// Memory-based storage configuration
    Memory(memory::MemoryStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory(memory::MemoryStorageConfig::default())
    }
}

impl StorageConfig {
    /// Convenience constructor for a file storage rooted at `path`.
    pub fn file<P: Into<std::path::PathBuf>>(path: P) -> Self {
        StorageConfig::File(file::FileStorageConfig::new(path))
    }

    /// Human-readable location for error messages.
    pub fn location(&self) -> String {
        match self {
            StorageConfig::File(config) => config.path.display().to_string(),
            StorageConfig::Memory(_) => memory::MEMORY_LOCATION.to_string(),
        }
    }
}

/// A factory for creating storage instances.
pub struct StorageFactory;

impl StorageFactory {
    /// Create a new storage instance with the given configuration.
    pub fn create(config: StorageConfig) -> Result<Arc<dyn Storage>> {
        match config {
            StorageConfig::Memory(mem_config) => {
                let storage = memory::MemoryStorage::new(mem_config);
                Ok(Arc::new(storage))
            }
            StorageConfig::File(file_config) => {
                let storage = file::FileStorage::new(file_config)?;
                Ok(Arc::new(storage))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::FileNotFound("index.dat".to_string());
        assert_eq!(err.to_string(), "File not found: index.dat");

        let err = StorageError::LockFailed("write".to_string());
        assert_eq!(err.to_string(), "Failed to acquire lock: write");

        let err = StorageError::StorageClosed;
        assert_eq!(err.to_string(), "Storage is closed");
    }

    #[test]
    fn test_storage_config_serde() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"type": "file", "path": "/tmp/idx"}"#).unwrap();
        assert_eq!(config.location(), "/tmp/idx");

        let config: StorageConfig = serde_json::from_str(r#"{"type": "memory"}"#).unwrap();
        assert_eq!(config, StorageConfig::default());
    }

    #[test]
    fn test_from_io() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(
            StorageError::from_io("a", &err),
            StorageError::FileNotFound("a".to_string())
        );
    }
}
