//! Core domain logic for the content hub.
//! This crate is the single source of truth for feed and ingestion invariants.

pub mod access;
pub mod classifier;
pub mod hub;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use access::gate::{
    assert_authorized, AccessDenied, AccessGate, AllowAll, DenyAll, HubOperation,
};
pub use classifier::{classify, is_supported, supported_extensions, Classification, ClassifyError};
pub use hub::{Hub, HubError};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::feed_item::{ContentKind, Feed, FeedItem};
pub use model::file_name::{FileNameError, SafeFileName};
pub use service::feed_service::{FeedService, DEFAULT_ASSET_URL_PREFIX};
pub use service::ingest_service::{
    normalize_note_text, IngestError, IngestReport, IngestService, SkipReason, SkippedUpload,
    StoredAsset, Submission, Upload,
};
pub use store::{
    AssetRecord, AssetStore, DirAssetStore, FileNoteLog, NoteLog, NoteRecord, StoreError,
    StoreResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
