//! Ingestion use-case: one operator submission into the two stores.
//!
//! # Responsibility
//! - Append the submitted note (if any) to the note log.
//! - Validate, classify and store each uploaded file.
//! - Report what was stored and what was skipped.
//!
//! # Invariants
//! - Invalid uploads (empty, unsafe name, unsupported type) are skipped and
//!   reported; they never abort the submission.
//! - Storage failures abort the submission with a stage-tagged error.
//!   Items written before the failure stay written: the two stores have no
//!   shared transaction.
//! - No cache is touched; the feed always re-reads durable storage.

use crate::classifier::{classify, ClassifyError};
use crate::model::file_name::{FileNameError, SafeFileName};
use crate::store::{AssetStore, NoteLog, StoreError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::time::Instant;

/// One uploaded file part: the client-declared name and its byte stream.
pub struct Upload {
    pub file_name: String,
    pub body: Box<dyn Read + Send>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, body: impl Read + Send + 'static) -> Self {
        Self {
            file_name: file_name.into(),
            body: Box::new(body),
        }
    }

    /// Wraps an already buffered upload.
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(file_name, Cursor::new(bytes.into()))
    }
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

/// One operator submission: optional note text plus zero or more files.
#[derive(Debug, Default)]
pub struct Submission {
    pub text: Option<String>,
    pub uploads: Vec<Upload>,
}

impl Submission {
    pub fn note(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            uploads: Vec::new(),
        }
    }

    pub fn with_upload(mut self, upload: Upload) -> Self {
        self.uploads.push(upload);
        self
    }
}

/// Why an upload was left out of the asset store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Zero-length body.
    Empty,
    InvalidFileName(FileNameError),
    UnsupportedType(ClassifyError),
}

impl SkipReason {
    /// Stable short code for logs and summaries.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::InvalidFileName(_) => "invalid_file_name",
            Self::UnsupportedType(_) => "unsupported_type",
        }
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "file is empty"),
            Self::InvalidFileName(err) => write!(f, "{err}"),
            Self::UnsupportedType(err) => write!(f, "{err}"),
        }
    }
}

/// Upload that was not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUpload {
    /// Name as declared by the client.
    pub file_name: String,
    pub reason: SkipReason,
}

/// Upload that was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub file_name: SafeFileName,
    pub bytes: u64,
}

/// Outcome of one successful submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub note_appended: bool,
    pub stored: Vec<StoredAsset>,
    pub skipped: Vec<SkippedUpload>,
}

impl IngestReport {
    /// Returns whether the submission changed any store.
    pub fn is_noop(&self) -> bool {
        !self.note_appended && self.stored.is_empty()
    }
}

/// Fatal ingestion failure, tagged by the stage that failed.
#[derive(Debug)]
pub enum IngestError {
    /// Appending the note line failed.
    NoteAppend(StoreError),
    /// The asset directory could not be prepared.
    StoreUnavailable(StoreError),
    /// Reading the client's byte stream failed.
    UploadRead {
        file_name: String,
        source: StoreError,
    },
    /// Writing the asset file failed.
    AssetWrite {
        file_name: String,
        source: StoreError,
    },
}

impl IngestError {
    /// Stable stage name for logs and callers.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::NoteAppend(_) => "note_append",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::UploadRead { .. } => "upload_read",
            Self::AssetWrite { .. } => "asset_write",
        }
    }
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteAppend(err) => write!(f, "failed to append note: {err}"),
            Self::StoreUnavailable(err) => write!(f, "asset store unavailable: {err}"),
            Self::UploadRead { file_name, source } => {
                write!(f, "failed to read upload `{file_name}`: {source}")
            }
            Self::AssetWrite { file_name, source } => {
                write!(f, "failed to store asset `{file_name}`: {source}")
            }
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoteAppend(err) | Self::StoreUnavailable(err) => Some(err),
            Self::UploadRead { source, .. } | Self::AssetWrite { source, .. } => Some(source),
        }
    }
}

/// Collapses each line break to a single space, so one submission is
/// exactly one log line. Everything else is kept as written.
pub fn normalize_note_text(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Ingestion service over injected stores.
pub struct IngestService<N: NoteLog, A: AssetStore> {
    notes: N,
    assets: A,
}

impl<N: NoteLog, A: AssetStore> IngestService<N, A> {
    pub fn new(notes: N, assets: A) -> Self {
        Self { notes, assets }
    }

    /// Ingests one submission.
    ///
    /// The note is written before any file, matching form field order.
    pub fn ingest(&self, submission: Submission) -> Result<IngestReport, IngestError> {
        let started_at = Instant::now();
        let mut report = IngestReport::default();

        if let Some(text) = submission.text.as_deref() {
            let normalized = normalize_note_text(text);
            if !normalized.is_empty() {
                self.notes.append(&normalized).map_err(|err| {
                    error!(
                        "event=ingest module=service status=error stage=note_append error={}",
                        err
                    );
                    IngestError::NoteAppend(err)
                })?;
                report.note_appended = true;
            }
        }

        let mut store_ready = false;
        for upload in submission.uploads {
            let Upload {
                file_name: raw_name,
                mut body,
            } = upload;

            let safe_name = match SafeFileName::sanitize(&raw_name) {
                Ok(name) => name,
                Err(err) => {
                    skip(&mut report, raw_name, SkipReason::InvalidFileName(err));
                    continue;
                }
            };
            if let Err(err) = classify(safe_name.as_str()) {
                skip(&mut report, raw_name, SkipReason::UnsupportedType(err));
                continue;
            }

            // Emptiness is known only by reading; check it before the store
            // is touched so an empty part is always a plain skip.
            let mut first = [0_u8; 1];
            match read_first_byte(body.as_mut(), &mut first) {
                Ok(0) => {
                    skip(&mut report, raw_name, SkipReason::Empty);
                    continue;
                }
                Ok(_) => {}
                Err(err) => {
                    let failure = IngestError::UploadRead {
                        source: StoreError::io("read upload", Path::new(safe_name.as_str()), err),
                        file_name: safe_name.into_string(),
                    };
                    error!(
                        "event=ingest module=service status=error stage={} error={}",
                        failure.stage(),
                        failure
                    );
                    return Err(failure);
                }
            }

            if !store_ready {
                self.assets.ensure_ready().map_err(|err| {
                    error!(
                        "event=ingest module=service status=error stage=store_unavailable error={}",
                        err
                    );
                    IngestError::StoreUnavailable(err)
                })?;
                store_ready = true;
            }

            let mut rest = Cursor::new(first).chain(body.as_mut());
            let mut tracked = TrackedRead::new(&mut rest);
            let written = match self.assets.write_asset(&safe_name, &mut tracked) {
                Ok(written) => written,
                Err(err) => {
                    let failure = if tracked.failed {
                        IngestError::UploadRead {
                            file_name: safe_name.into_string(),
                            source: err,
                        }
                    } else {
                        IngestError::AssetWrite {
                            file_name: safe_name.into_string(),
                            source: err,
                        }
                    };
                    error!(
                        "event=ingest module=service status=error stage={} error={}",
                        failure.stage(),
                        failure
                    );
                    return Err(failure);
                }
            };

            report.stored.push(StoredAsset {
                file_name: safe_name,
                bytes: written,
            });
        }

        info!(
            "event=ingest module=service status=ok note_appended={} stored={} skipped={} duration_ms={}",
            report.note_appended,
            report.stored.len(),
            report.skipped.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }
}

fn skip(report: &mut IngestReport, file_name: String, reason: SkipReason) {
    warn!(
        "event=ingest module=service status=skip file={:?} reason={} detail={}",
        file_name,
        reason.code(),
        reason
    );
    report.skipped.push(SkippedUpload { file_name, reason });
}

fn read_first_byte(body: &mut (dyn Read + Send), buf: &mut [u8; 1]) -> io::Result<usize> {
    loop {
        match body.read(buf) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Remembers whether the client stream failed, to tell read errors from
/// write errors after `io::copy`.
struct TrackedRead<'a> {
    inner: &'a mut (dyn Read + Send),
    failed: bool,
}

impl<'a> TrackedRead<'a> {
    fn new(inner: &'a mut (dyn Read + Send)) -> Self {
        Self {
            inner,
            failed: false,
        }
    }
}

impl Read for TrackedRead<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Err(err) if err.kind() != io::ErrorKind::Interrupted => {
                self.failed = true;
                Err(err)
            }
            other => other,
        }
    }
}
