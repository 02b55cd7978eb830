//! Durable stores behind the feed: the note log and the asset directory.
//!
//! # Responsibility
//! - Define storage contracts (`NoteLog`, `AssetStore`) injected into
//!   services, so tests can run isolated instances.
//! - Provide file-system implementations (`FileNoteLog`, `DirAssetStore`).
//!
//! # Invariants
//! - The two stores are independent durability domains; neither write path
//!   touches the other store.
//! - One record (a log line or an asset file) becomes visible whole or not
//!   at all.
//! - A missing log file or asset directory reads as empty.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod asset_store;
pub mod note_log;

pub use asset_store::{AssetRecord, AssetStore, DirAssetStore};
pub use note_log::{FileNoteLog, NoteLog, NoteRecord};

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage failure for note log or asset store access.
#[derive(Debug)]
pub enum StoreError {
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    /// Record cannot be represented in the storage format.
    InvalidRecord(String),
    /// A writer panicked while holding the store lock.
    LockPoisoned(&'static str),
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns whether the failure is a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { op, path, source } => {
                write!(f, "{op} failed for `{}`: {source}", path.display())
            }
            Self::InvalidRecord(message) => write!(f, "invalid record: {message}"),
            Self::LockPoisoned(store) => write!(f, "{store} lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::InvalidRecord(_) | Self::LockPoisoned(_) => None,
        }
    }
}

// Services own their stores; sharing one store between the ingest and feed
// services goes through `Arc`.
impl<T: NoteLog + ?Sized> NoteLog for Arc<T> {
    fn append(&self, text: &str) -> StoreResult<()> {
        (**self).append(text)
    }

    fn read_all(&self) -> StoreResult<Vec<NoteRecord>> {
        (**self).read_all()
    }
}

impl<T: AssetStore + ?Sized> AssetStore for Arc<T> {
    fn ensure_ready(&self) -> StoreResult<()> {
        (**self).ensure_ready()
    }

    fn write_asset(
        &self,
        name: &crate::model::file_name::SafeFileName,
        body: &mut dyn std::io::Read,
    ) -> StoreResult<u64> {
        (**self).write_asset(name, body)
    }

    fn list_assets(&self) -> StoreResult<Vec<AssetRecord>> {
        (**self).list_assets()
    }
}
