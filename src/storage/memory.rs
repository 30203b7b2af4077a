//! In-memory storage implementation for testing and ephemeral indexes.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{
    LockManager, Storage, StorageError, StorageInput, StorageLock, StorageOutput,
};

/// Location reported for in-memory storages.
pub const MEMORY_LOCATION: &str = "<memory>";

type FileMap = Arc<Mutex<HashMap<String, Box<[u8]>>>>;

/// Configuration for [`MemoryStorage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStorageConfig {
    /// Optional label used in place of `<memory>` in error messages.
    pub label: Option<String>,
}

/// An in-memory storage implementation.
#[derive(Debug)]
pub struct MemoryStorage {
    /// The files stored in memory.
    files: FileMap,
    /// Lock manager for coordinating access.
    lock_manager: Arc<MemoryLockManager>,
    config: MemoryStorageConfig,
    /// Whether the storage is closed.
    closed: AtomicBool,
}

impl MemoryStorage {
    /// Create a new memory storage.
    pub fn new(config: MemoryStorageConfig) -> Self {
        MemoryStorage {
            files: Arc::new(Mutex::new(HashMap::new())),
            lock_manager: Arc::new(MemoryLockManager::new()),
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Create a new memory storage with default configuration.
    pub fn new_default() -> Self {
        Self::new(MemoryStorageConfig::default())
    }

    /// Check if the storage is closed.
    fn check_closed(&self) -> Result<()> {
        if self.is_closed() {
            Err(StorageError::StorageClosed.into())
        } else {
            Ok(())
        }
    }
}

impl Storage for MemoryStorage {
    fn location(&self) -> String {
        self.config
            .label
            .clone()
            .unwrap_or_else(|| MEMORY_LOCATION.to_string())
    }

    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.check_closed()?;

        let files = self.files.lock();
        let data = files
            .get(name)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;

        Ok(Box::new(MemoryInput::new(data.to_vec())))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.check_closed()?;

        Ok(Box::new(MemoryOutput::new(
            name.to_string(),
            Arc::clone(&self.files),
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        if self.is_closed() {
            return false;
        }

        self.files.lock().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.check_closed()?;

        self.files.lock().remove(name);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.check_closed()?;

        let mut file_names: Vec<String> = self.files.lock().keys().cloned().collect();
        file_names.sort();
        Ok(file_names)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.check_closed()?;

        let mut files = self.files.lock();
        let data = files
            .remove(old_name)
            .ok_or_else(|| StorageError::FileNotFound(old_name.to_string()))?;

        files.insert(new_name.to_string(), data);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.check_closed()
    }

    fn lock_manager(&self) -> Arc<dyn LockManager> {
        self.lock_manager.clone()
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A memory-based input implementation.
#[derive(Debug)]
pub struct MemoryInput {
    cursor: Cursor<Vec<u8>>,
    size: u64,
}

impl MemoryInput {
    fn new(data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        MemoryInput {
            cursor: Cursor::new(data),
            size,
        }
    }
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

/// A memory-based output; the file is published on close or drop.
#[derive(Debug)]
pub struct MemoryOutput {
    name: String,
    buffer: Vec<u8>,
    files: FileMap,
    closed: bool,
}

impl MemoryOutput {
    fn new(name: String, files: FileMap) -> Self {
        MemoryOutput {
            name,
            buffer: Vec::new(),
            files,
            closed: false,
        }
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::other("Output is closed"));
        }

        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            let data = std::mem::take(&mut self.buffer).into_boxed_slice();
            self.files.lock().insert(self.name.clone(), data);
            self.closed = true;
        }
        Ok(())
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// A memory-based lock manager.
#[derive(Debug, Default)]
pub struct MemoryLockManager {
    held: Arc<Mutex<HashSet<String>>>,
}

impl MemoryLockManager {
    fn new() -> Self {
        Self::default()
    }
}

impl LockManager for MemoryLockManager {
    fn acquire_lock(&self, name: &str) -> Result<Box<dyn StorageLock>> {
        let mut held = self.held.lock();

        if !held.insert(name.to_string()) {
            return Err(StorageError::LockFailed(name.to_string()).into());
        }

        Ok(Box::new(MemoryLock {
            name: name.to_string(),
            held: Arc::clone(&self.held),
            released: false,
        }))
    }

    fn try_acquire_lock(&self, name: &str) -> Result<Option<Box<dyn StorageLock>>> {
        if self.lock_exists(name) {
            return Ok(None);
        }
        self.acquire_lock(name).map(Some)
    }

    fn lock_exists(&self, name: &str) -> bool {
        self.held.lock().contains(name)
    }
}

/// A lock held in a [`MemoryLockManager`].
#[derive(Debug)]
struct MemoryLock {
    name: String,
    held: Arc<Mutex<HashSet<String>>>,
    released: bool,
}

impl StorageLock for MemoryLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.held.lock().remove(&self.name);
            self.released = true;
        }
        Ok(())
    }

    fn is_valid(&self) -> bool {
        !self.released && self.held.lock().contains(&self.name)
    }
}

impl Drop for MemoryLock {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_creation() {
        let storage = MemoryStorage::new_default();
        assert!(storage.list_files().unwrap().is_empty());
        assert_eq!(storage.location(), MEMORY_LOCATION);
    }

    #[test]
    fn test_create_and_read_file() {
        let storage = MemoryStorage::new_default();

        let mut output = storage.create_output("test.txt").unwrap();
        output.write_all(b"Hello, Memory!").unwrap();
        assert!(!storage.file_exists("test.txt"));
        output.close().unwrap();

        let mut input = storage.open_input("test.txt").unwrap();
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer).unwrap();

        assert_eq!(buffer, b"Hello, Memory!");
        assert_eq!(input.size().unwrap(), 14);
        assert_eq!(storage.list_files().unwrap(), vec!["test.txt"]);
    }

    #[test]
    fn test_rename_replaces_target() {
        let storage = MemoryStorage::new_default();

        let mut output = storage.create_output("a").unwrap();
        output.write_all(b"new").unwrap();
        output.close().unwrap();
        let mut output = storage.create_output("b").unwrap();
        output.write_all(b"old").unwrap();
        output.close().unwrap();

        storage.rename_file("a", "b").unwrap();
        assert_eq!(storage.list_files().unwrap(), vec!["b"]);

        let mut buffer = String::new();
        storage
            .open_input("b")
            .unwrap()
            .read_to_string(&mut buffer)
            .unwrap();
        assert_eq!(buffer, "new");
    }

    #[test]
    fn test_lock_exclusive_until_released() {
        let storage = MemoryStorage::new_default();
        let locks = storage.lock_manager();

        let mut lock = locks.acquire_lock("write").unwrap();
        assert!(lock.is_valid());
        assert!(locks.acquire_lock("write").is_err());
        assert!(locks.try_acquire_lock("write").unwrap().is_none());

        lock.release().unwrap();
        lock.release().unwrap();
        assert!(!lock.is_valid());
        assert!(locks.try_acquire_lock("write").unwrap().is_some());
    }

    #[test]
    fn test_lock_released_on_drop() {
        let storage = MemoryStorage::new_default();
        let locks = storage.lock_manager();

        {
            let _lock = locks.acquire_lock("write").unwrap();
            assert!(locks.lock_exists("write"));
        }
        assert!(!locks.lock_exists("write"));
    }

    #[test]
    fn test_storage_close() {
        let storage = MemoryStorage::new_default();

        storage.close().unwrap();
        assert!(storage.is_closed());
        assert!(storage.create_output("test.txt").is_err());
        assert!(storage.sync().is_err());
    }
}
