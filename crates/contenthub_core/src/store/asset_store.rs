//! Flat directory of uploaded media files.
//!
//! # Responsibility
//! - Write uploads under their sanitized filename (last write wins).
//! - List stored files with their modification time.
//!
//! # Invariants
//! - Bytes are staged in a hidden `.<uuid>.partial` file in the same
//!   directory and renamed into place, so a reader sees the old file or the
//!   new one, never a prefix.
//! - Hidden names are never listed; they are staging files or foreign.
//! - Writes to different names are independent; there is no store lock.

use super::{StoreError, StoreResult};
use crate::model::file_name::SafeFileName;
use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

const STAGING_SUFFIX: &str = ".partial";

/// One file found in the asset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub file_name: String,
    pub modified: SystemTime,
    pub size: u64,
}

/// Storage contract for media assets.
pub trait AssetStore: Send + Sync {
    /// Makes the store writable, creating its directory when absent.
    fn ensure_ready(&self) -> StoreResult<()>;

    /// Streams `body` into the asset named `name` and returns the byte count.
    ///
    /// A zero-length body leaves the store untouched and returns `0`.
    fn write_asset(&self, name: &SafeFileName, body: &mut dyn Read) -> StoreResult<u64>;

    /// Lists regular, non-hidden files. A missing directory is empty.
    fn list_assets(&self) -> StoreResult<Vec<AssetRecord>>;
}

/// File-system implementation rooted at one directory.
pub struct DirAssetStore {
    dir: PathBuf,
}

impl DirAssetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn staging_path(&self) -> PathBuf {
        self.dir
            .join(format!(".{}{STAGING_SUFFIX}", Uuid::new_v4().simple()))
    }
}

impl AssetStore for DirAssetStore {
    fn ensure_ready(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|err| StoreError::io("create asset directory", &self.dir, err))
    }

    fn write_asset(&self, name: &SafeFileName, body: &mut dyn Read) -> StoreResult<u64> {
        let staging = self.staging_path();
        let target = self.dir.join(name.as_str());

        let written = match stage_body(&staging, body) {
            Ok(written) => written,
            Err(err) => {
                discard_staging(&staging);
                return Err(err);
            }
        };

        if written == 0 {
            discard_staging(&staging);
            return Ok(0);
        }

        if let Err(err) = fs::rename(&staging, &target) {
            discard_staging(&staging);
            return Err(StoreError::io("publish asset", &target, err));
        }

        debug!(
            "event=asset_write module=store status=ok file={} bytes={}",
            name, written
        );
        Ok(written)
    }

    fn list_assets(&self) -> StoreResult<Vec<AssetRecord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io("list asset directory", &self.dir, err)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        "event=asset_list module=store status=skip dir={} error={}",
                        self.dir.display(),
                        err
                    );
                    continue;
                }
            };

            let Ok(file_name) = entry.file_name().into_string() else {
                warn!(
                    "event=asset_list module=store status=skip reason=non_utf8_name dir={}",
                    self.dir.display()
                );
                continue;
            };
            if file_name.starts_with('.') {
                continue;
            }

            // Follows symlinks, so a linked file still counts as a file.
            let metadata = match fs::metadata(entry.path()) {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(err) => {
                    warn!(
                        "event=asset_list module=store status=skip file={} error={}",
                        file_name, err
                    );
                    continue;
                }
            };
            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(err) => {
                    warn!(
                        "event=asset_list module=store status=skip file={} error={}",
                        file_name, err
                    );
                    continue;
                }
            };

            records.push(AssetRecord {
                file_name,
                modified,
                size: metadata.len(),
            });
        }

        Ok(records)
    }
}

fn stage_body(staging: &Path, body: &mut dyn Read) -> StoreResult<u64> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staging)
        .map_err(|err| StoreError::io("create staging file", staging, err))?;

    let written = io::copy(body, &mut file)
        .map_err(|err| StoreError::io("write staging file", staging, err))?;
    if written > 0 {
        sync_file(&file, staging)?;
    }
    Ok(written)
}

fn sync_file(file: &File, path: &Path) -> StoreResult<()> {
    file.sync_all()
        .map_err(|err| StoreError::io("sync staging file", path, err))
}

fn discard_staging(staging: &Path) {
    if let Err(err) = fs::remove_file(staging) {
        if err.kind() != ErrorKind::NotFound {
            warn!(
                "event=asset_write module=store status=error reason=staging_cleanup path={} error={}",
                staging.display(),
                err
            );
        }
    }
}
