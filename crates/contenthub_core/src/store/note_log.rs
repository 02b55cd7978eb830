//! Append-only note log.
//!
//! # Responsibility
//! - Persist one note per line, oldest first on disk.
//! - Read the whole log back in file order.
//!
//! # Invariants
//! - Records never contain `\n` or `\r`; the store rejects them instead of
//!   splitting one note into several.
//! - Each append is one `write` of a complete line on an `O_APPEND` handle,
//!   serialized by an in-process lock, so readers never see half a line
//!   from this process.
//! - Records are immutable: there is no edit or delete path.

use super::{StoreError, StoreResult};
use log::{debug, error};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// One persisted note line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    /// Zero-based line position; also the creation order.
    pub position: usize,
    pub text: String,
}

/// Storage contract for the note log.
pub trait NoteLog: Send + Sync {
    /// Appends one record, creating the log when absent.
    fn append(&self, text: &str) -> StoreResult<()>;

    /// Returns all non-empty records in file order. A missing log is empty.
    fn read_all(&self) -> StoreResult<Vec<NoteRecord>>;
}

/// Newline-delimited UTF-8 file implementation.
pub struct FileNoteLog {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileNoteLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NoteLog for FileNoteLog {
    fn append(&self, text: &str) -> StoreResult<()> {
        if text.contains(['\n', '\r']) {
            return Err(StoreError::InvalidRecord(
                "note text must be a single line".to_string(),
            ));
        }

        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');

        let _guard = self
            .lock
            .write()
            .map_err(|_| StoreError::LockPoisoned("note log"))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| StoreError::io("open note log", &self.path, err))?;

        if let Err(err) = file.write_all(line.as_bytes()) {
            error!(
                "event=note_append module=store status=error path={} error={}",
                self.path.display(),
                err
            );
            return Err(StoreError::io("append note", &self.path, err));
        }
        file.sync_data()
            .map_err(|err| StoreError::io("sync note log", &self.path, err))?;

        debug!(
            "event=note_append module=store status=ok path={} bytes={}",
            self.path.display(),
            line.len()
        );
        Ok(())
    }

    fn read_all(&self) -> StoreResult<Vec<NoteRecord>> {
        let _guard = self
            .lock
            .read()
            .map_err(|_| StoreError::LockPoisoned("note log"))?;

        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io("read note log", &self.path, err)),
        };

        // Hand-edited logs may hold invalid UTF-8; keep the line rather than
        // failing the whole feed.
        let content = String::from_utf8_lossy(&bytes);
        let records = content
            .lines()
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(position, line)| NoteRecord {
                position,
                text: line.to_string(),
            })
            .collect();

        Ok(records)
    }
}
