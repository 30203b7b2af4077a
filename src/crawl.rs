//! Filesystem crawler.
//!
//! [`TreeCrawler`] walks a directory tree and submits one document per
//! regular file:
//!
//! | field      | value                         | store      | indexing      |
//! |------------|-------------------------------|------------|---------------|
//! | `path`     | canonical path                | stored     | exact term    |
//! | `modified` | last modification, epoch ms   | stored     | numeric point |
//! | `contents` | file text                     | not stored | tokenized     |
//!
//! Documents are upserted by `path`, so crawling the same tree again
//! replaces entries instead of duplicating them. A file that cannot be
//! read is reported and skipped; a root that cannot be read aborts the
//! crawl before anything is written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::document::{Document, Store};
use crate::error::{IndexerError, Result};
use crate::session::IndexSession;

/// Upsert key of file documents.
pub const PATH_FIELD: &str = "path";
pub const MODIFIED_FIELD: &str = "modified";
pub const CONTENTS_FIELD: &str = "contents";

/// Crawler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Follow symbolic links. Links are skipped otherwise.
    pub follow_links: bool,

    /// Treat files that are not valid UTF-8 as unreadable. When off,
    /// invalid sequences are replaced with U+FFFD.
    pub strict_utf8: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        CrawlConfig {
            follow_links: false,
            strict_utf8: true,
        }
    }
}

/// A file the crawl could not index, and why.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: IndexerError,
}

/// Outcome of one crawl.
#[derive(Debug, Default)]
pub struct CrawlReport {
    /// Files submitted to the session.
    pub submitted: usize,
    /// Files or subdirectories that could not be read.
    pub read_failures: Vec<FileFailure>,
    /// Files the session rejected with a recoverable error.
    pub write_failures: Vec<FileFailure>,
    /// Whether the crawl stopped early on request.
    pub cancelled: bool,
}

impl CrawlReport {
    /// Total recoverable failures.
    pub fn failures(&self) -> usize {
        self.read_failures.len() + self.write_failures.len()
    }
}

/// Walks a directory tree into an [`IndexSession`].
#[derive(Debug, Clone, Default)]
pub struct TreeCrawler {
    config: CrawlConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl TreeCrawler {
    pub fn new(config: CrawlConfig) -> Self {
        TreeCrawler {
            config,
            cancel: None,
        }
    }

    /// Stop between files once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Check that `root` exists and can be listed (or opened, for a file).
    fn check_root(&self, root: &Path) -> Result<fs::Metadata> {
        let metadata = fs::metadata(root).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => IndexerError::RootNotFound {
                path: root.to_path_buf(),
            },
            _ => IndexerError::RootUnreadable {
                path: root.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        let opened = if metadata.is_dir() {
            fs::read_dir(root).map(drop)
        } else {
            fs::File::open(root).map(drop)
        };
        opened.map_err(|e| IndexerError::RootUnreadable {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(metadata)
    }

    /// Index every regular file under `root`.
    ///
    /// Returns [`IndexerError::RootNotFound`] or
    /// [`IndexerError::RootUnreadable`] before any write if `root` is
    /// unusable, and any fatal session error as soon as it happens.
    pub fn crawl<P: AsRef<Path>>(&self, root: P, session: &mut IndexSession) -> Result<CrawlReport> {
        let root = root.as_ref();
        let metadata = self.check_root(root)?;
        info!(root = %root.display(), "crawling");

        let mut report = CrawlReport::default();
        if metadata.is_file() {
            self.index_file(root, session, &mut report)?;
            log_summary(root, &report);
            return Ok(report);
        }

        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name();

        for entry in walker {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(IndexerError::RootUnreadable {
                        path: root.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    report.read_failures.push(FileFailure {
                        error: IndexerError::file_read(&path, e.to_string()),
                        path,
                    });
                    continue;
                }
            };

            if entry.file_type().is_file() {
                self.index_file(entry.path(), session, &mut report)?;
            }
        }

        log_summary(root, &report);
        Ok(report)
    }

    fn index_file(&self, path: &Path, session: &mut IndexSession, report: &mut CrawlReport) -> Result<()> {
        let doc = match self.file_document(path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                report.read_failures.push(FileFailure {
                    path: path.to_path_buf(),
                    error: e,
                });
                return Ok(());
            }
        };

        match session.submit(doc, Some(PATH_FIELD)) {
            Ok(action) => {
                debug!(path = %path.display(), ?action, "indexed file");
                report.submitted += 1;
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                report.write_failures.push(FileFailure {
                    path: path.to_path_buf(),
                    error: e,
                });
                Ok(())
            }
        }
    }

    /// Build the document for one file.
    ///
    /// Any failure to resolve, stat or read the file is a recoverable
    /// [`IndexerError::FileRead`].
    pub fn file_document(&self, path: &Path) -> Result<Document> {
        let read_error = |e: io::Error| IndexerError::file_read(path, e.to_string());

        let canonical = fs::canonicalize(path).map_err(read_error)?;
        let metadata = fs::metadata(&canonical).map_err(read_error)?;
        let modified: DateTime<Utc> = metadata.modified().map_err(read_error)?.into();

        let bytes = fs::read(&canonical).map_err(read_error)?;
        let contents = if self.config.strict_utf8 {
            String::from_utf8(bytes)
                .map_err(|e| IndexerError::file_read(path, format!("invalid UTF-8: {e}")))?
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };

        Ok(Document::builder()
            .add_string(PATH_FIELD, canonical.to_string_lossy(), Store::Stored)
            .add_long_point(MODIFIED_FIELD, modified.timestamp_millis(), Store::Stored)
            .add_text(CONTENTS_FIELD, contents, Store::NotStored)
            .build())
    }
}

fn log_summary(root: &Path, report: &CrawlReport) {
    info!(
        root = %root.display(),
        submitted = report.submitted,
        read_failures = report.read_failures.len(),
        write_failures = report.write_failures.len(),
        cancelled = report.cancelled,
        "crawl finished"
    );
}
