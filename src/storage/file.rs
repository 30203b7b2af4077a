//! File-based storage implementation.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, Result};
use crate::storage::{
    LockManager, Storage, StorageError, StorageInput, StorageLock, StorageOutput,
};

/// Configuration for [`FileStorage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStorageConfig {
    /// The root directory of the index.
    pub path: PathBuf,

    /// Buffer size for I/O operations.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Whether to fsync every output when it is closed.
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,
}

fn default_buffer_size() -> usize {
    65536 // 64KB
}

fn default_sync_writes() -> bool {
    true
}

impl FileStorageConfig {
    /// Create a configuration for the given directory with default settings.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileStorageConfig {
            path: path.into(),
            buffer_size: default_buffer_size(),
            sync_writes: default_sync_writes(),
        }
    }
}

/// A file-based storage implementation.
#[derive(Debug)]
pub struct FileStorage {
    /// The root directory for storage.
    directory: PathBuf,
    /// Storage configuration.
    config: FileStorageConfig,
    /// Lock manager for coordinating access.
    lock_manager: Arc<FileLockManager>,
    /// Whether the storage is closed.
    closed: AtomicBool,
}

impl FileStorage {
    /// Open (creating if needed) the storage directory.
    pub fn new(config: FileStorageConfig) -> Result<Self> {
        let directory = config.path.clone();

        if !directory.exists() {
            std::fs::create_dir_all(&directory).map_err(|e| {
                IndexerError::store_open(
                    directory.display().to_string(),
                    format!("failed to create directory: {e}"),
                )
            })?;
        }

        if !directory.is_dir() {
            return Err(IndexerError::store_open(
                directory.display().to_string(),
                "path is not a directory",
            ));
        }

        let lock_manager = Arc::new(FileLockManager::new(directory.clone()));

        Ok(FileStorage {
            directory,
            config,
            lock_manager,
            closed: AtomicBool::new(false),
        })
    }

    /// The root directory of this storage.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Get the full path for a file name.
    fn file_path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
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

impl Storage for FileStorage {
    fn location(&self) -> String {
        self.directory.display().to_string()
    }

    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.check_closed()?;

        let file = File::open(self.file_path(name)).map_err(|e| StorageError::from_io(name, &e))?;
        Ok(Box::new(FileInput::new(file, self.config.buffer_size)?))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.check_closed()?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.file_path(name))
            .map_err(|e| StorageError::from_io(name, &e))?;

        Ok(Box::new(FileOutput::new(
            file,
            self.config.buffer_size,
            self.config.sync_writes,
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        if self.is_closed() {
            return false;
        }

        self.file_path(name).is_file()
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.check_closed()?;

        match std::fs::remove_file(self.file_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from_io(name, &e).into()),
        }
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.check_closed()?;

        let mut files = Vec::new();
        let entries = std::fs::read_dir(&self.directory)
            .map_err(|e| StorageError::IoError(e.to_string()))?;

        for entry in entries {
            let entry = entry.map_err(|e| StorageError::IoError(e.to_string()))?;
            let path = entry.path();

            if path.is_file()
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
            {
                files.push(name.to_string());
            }
        }

        files.sort();
        Ok(files)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.check_closed()?;

        std::fs::rename(self.file_path(old_name), self.file_path(new_name))
            .map_err(|e| StorageError::from_io(old_name, &e))?;

        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.check_closed()?;
        // Outputs sync themselves on close; syncing the directory makes renames durable.
        #[cfg(unix)]
        File::open(&self.directory)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| StorageError::IoError(format!("Failed to sync directory: {e}")))?;
        Ok(())
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

/// A file input implementation.
#[derive(Debug)]
pub struct FileInput {
    reader: BufReader<File>,
    size: u64,
}

impl FileInput {
    fn new(file: File, buffer_size: usize) -> Result<Self> {
        let size = file
            .metadata()
            .map_err(|e| IndexerError::storage(format!("Failed to get file metadata: {e}")))?
            .len();
        let reader = BufReader::with_capacity(buffer_size, file);

        Ok(FileInput { reader, size })
    }
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl StorageInput for FileInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

/// A file output implementation.
#[derive(Debug)]
pub struct FileOutput {
    writer: BufWriter<File>,
    sync_writes: bool,
    closed: bool,
}

impl FileOutput {
    fn new(file: File, buffer_size: usize, sync_writes: bool) -> Self {
        FileOutput {
            writer: BufWriter::with_capacity(buffer_size, file),
            sync_writes,
            closed: false,
        }
    }
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl StorageOutput for FileOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| IndexerError::storage(format!("Failed to flush: {e}")))?;

        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| IndexerError::storage(format!("Failed to sync: {e}")))?;

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.sync_writes {
            self.flush_and_sync()?;
        } else {
            self.writer
                .flush()
                .map_err(|e| IndexerError::storage(format!("Failed to flush: {e}")))?;
        }
        self.closed = true;
        Ok(())
    }
}

/// A file-based lock manager.
///
/// A lock is a `<name>.lock` file created with `create_new`, so it is
/// exclusive across processes as well as within one.
#[derive(Debug)]
pub struct FileLockManager {
    directory: PathBuf,
}

impl FileLockManager {
    fn new(directory: PathBuf) -> Self {
        FileLockManager { directory }
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}.lock"))
    }

    /// Create the lock file, reporting contention as [`StorageError::LockFailed`].
    fn create_lock(&self, name: &str) -> std::result::Result<FileLock, StorageError> {
        let lock_path = self.lock_path(name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::LockFailed(name.to_string())
                } else {
                    StorageError::from_io(name, &e)
                }
            })?;

        // Owner pid, for whoever has to clean up a stale lock by hand.
        let _ = writeln!(file, "{}", std::process::id());

        Ok(FileLock {
            name: name.to_string(),
            path: lock_path,
            _file: file,
            released: false,
        })
    }
}

impl LockManager for FileLockManager {
    fn acquire_lock(&self, name: &str) -> Result<Box<dyn StorageLock>> {
        Ok(Box::new(self.create_lock(name)?))
    }

    fn try_acquire_lock(&self, name: &str) -> Result<Option<Box<dyn StorageLock>>> {
        match self.create_lock(name) {
            Ok(lock) => {
                let lock: Box<dyn StorageLock> = Box::new(lock);
                Ok(Some(lock))
            }
            Err(StorageError::LockFailed(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn lock_exists(&self, name: &str) -> bool {
        self.lock_path(name).exists()
    }
}

/// A file-based lock implementation.
#[derive(Debug)]
struct FileLock {
    name: String,
    path: PathBuf,
    _file: File,
    released: bool,
}

impl StorageLock for FileLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            std::fs::remove_file(&self.path)
                .map_err(|e| IndexerError::storage(format!("Failed to release lock: {e}")))?;
            self.released = true;
        }
        Ok(())
    }

    fn is_valid(&self) -> bool {
        !self.released && self.path.exists()
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(FileStorageConfig::new(temp_dir.path())).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");

        let storage = FileStorage::new(FileStorageConfig::new(&nested)).unwrap();
        assert!(nested.is_dir());
        assert_eq!(storage.directory(), nested.as_path());
    }

    #[test]
    fn test_path_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("plain");
        std::fs::write(&file_path, b"x").unwrap();

        let err = FileStorage::new(FileStorageConfig::new(&file_path)).unwrap_err();
        assert!(matches!(err, IndexerError::StoreOpen { .. }));
    }

    #[test]
    fn test_create_and_read_file() {
        let (_temp_dir, storage) = create_test_storage();

        let mut output = storage.create_output("test.txt").unwrap();
        output.write_all(b"Hello, World!").unwrap();
        output.close().unwrap();

        let mut input = storage.open_input("test.txt").unwrap();
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer).unwrap();

        assert_eq!(buffer, b"Hello, World!");
        assert_eq!(input.size().unwrap(), 13);
    }

    #[test]
    fn test_file_operations() {
        let (_temp_dir, storage) = create_test_storage();

        assert!(!storage.file_exists("nonexistent.txt"));

        let mut output = storage.create_output("test.txt").unwrap();
        output.write_all(b"Test content").unwrap();
        output.close().unwrap();

        assert!(storage.file_exists("test.txt"));
        assert_eq!(storage.list_files().unwrap(), vec!["test.txt"]);

        storage.rename_file("test.txt", "renamed.txt").unwrap();
        assert!(!storage.file_exists("test.txt"));
        assert!(storage.file_exists("renamed.txt"));

        storage.delete_file("renamed.txt").unwrap();
        storage.delete_file("renamed.txt").unwrap();
        assert!(!storage.file_exists("renamed.txt"));
    }

    #[test]
    fn test_file_not_found() {
        let (_temp_dir, storage) = create_test_storage();

        let result = storage.open_input("nonexistent.txt");
        assert!(result.is_err());
    }

    #[test]
    fn test_lock_file_is_exclusive() {
        let (temp_dir, storage) = create_test_storage();
        let locks = storage.lock_manager();

        let mut lock = locks.acquire_lock("write").unwrap();
        assert!(temp_dir.path().join("write.lock").exists());
        assert!(locks.lock_exists("write"));
        assert!(locks.try_acquire_lock("write").unwrap().is_none());

        // A second storage over the same directory sees the same lock.
        let other = FileStorage::new(FileStorageConfig::new(temp_dir.path())).unwrap();
        assert!(other.lock_manager().try_acquire_lock("write").unwrap().is_none());

        lock.release().unwrap();
        assert!(!lock.is_valid());
        assert!(!temp_dir.path().join("write.lock").exists());
        assert!(other.lock_manager().try_acquire_lock("write").unwrap().is_some());
    }

    #[test]
    fn test_lock_io_failure_is_not_contention() {
        let (temp_dir, storage) = create_test_storage();
        let locks = storage.lock_manager();
        std::fs::remove_dir_all(temp_dir.path()).unwrap();

        let err = locks.try_acquire_lock("write").unwrap_err();
        assert!(matches!(err, IndexerError::Storage(_)));
        assert!(!locks.lock_exists("write"));
    }

    #[test]
    fn test_storage_close() {
        let (_temp_dir, storage) = create_test_storage();

        storage.close().unwrap();
        assert!(storage.is_closed());

        let result = storage.create_output("test.txt");
        assert!(result.is_err());
    }
}
