//! Gate-checked entry points over the ingest and feed services.
//!
//! # Responsibility
//! - Consult the access gate before any core operation runs.
//! - Share one note log and one asset store between both services.
//!
//! # Invariants
//! - A refused caller never reaches a store.
//! - The hub holds no state of its own besides its dependencies.

use crate::access::gate::{assert_authorized, AccessDenied, AccessGate, HubOperation};
use crate::model::feed_item::Feed;
use crate::service::feed_service::FeedService;
use crate::service::ingest_service::{IngestError, IngestReport, IngestService, Submission};
use crate::store::{AssetStore, DirAssetStore, FileNoteLog, NoteLog, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

/// Failure of a gate-checked hub operation.
#[derive(Debug)]
pub enum HubError {
    Denied(AccessDenied),
    Ingest(IngestError),
    Feed(StoreError),
}

impl Display for HubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied(err) => write!(f, "{err}"),
            Self::Ingest(err) => write!(f, "{err}"),
            Self::Feed(err) => write!(f, "failed to build feed: {err}"),
        }
    }
}

impl Error for HubError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Denied(err) => Some(err),
            Self::Ingest(err) => Some(err),
            Self::Feed(err) => Some(err),
        }
    }
}

impl From<AccessDenied> for HubError {
    fn from(value: AccessDenied) -> Self {
        Self::Denied(value)
    }
}

impl From<IngestError> for HubError {
    fn from(value: IngestError) -> Self {
        Self::Ingest(value)
    }
}

/// Content hub facade: access gate plus both use-case services.
pub struct Hub<N: NoteLog, A: AssetStore, G> {
    ingest: IngestService<Arc<N>, Arc<A>>,
    feed: FeedService<Arc<N>, Arc<A>>,
    gate: G,
}

impl<G> Hub<FileNoteLog, DirAssetStore, G> {
    /// Opens a hub over a note log file and an asset directory.
    ///
    /// Nothing is created on disk until the first write.
    pub fn open(
        data_file: impl Into<PathBuf>,
        assets_dir: impl Into<PathBuf>,
        asset_url_prefix: impl Into<String>,
        gate: G,
    ) -> Self {
        Self::new(
            Arc::new(FileNoteLog::new(data_file)),
            Arc::new(DirAssetStore::new(assets_dir)),
            asset_url_prefix,
            gate,
        )
    }
}

impl<N: NoteLog, A: AssetStore, G> Hub<N, A, G> {
    pub fn new(
        notes: Arc<N>,
        assets: Arc<A>,
        asset_url_prefix: impl Into<String>,
        gate: G,
    ) -> Self {
        Self {
            ingest: IngestService::new(Arc::clone(&notes), Arc::clone(&assets)),
            feed: FeedService::new(notes, assets, asset_url_prefix),
            gate,
        }
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Retrieval path for an asset filename.
    pub fn asset_path(&self, file_name: &str) -> String {
        self.feed.asset_path(file_name)
    }

    /// Ingests one submission on behalf of `ctx`.
    pub fn ingest<Ctx: ?Sized>(
        &self,
        ctx: &Ctx,
        submission: Submission,
    ) -> Result<IngestReport, HubError>
    where
        G: AccessGate<Ctx>,
    {
        assert_authorized(&self.gate, ctx, HubOperation::Ingest)?;
        Ok(self.ingest.ingest(submission)?)
    }

    /// Builds the merged feed on behalf of `ctx`.
    pub fn build_feed<Ctx: ?Sized>(&self, ctx: &Ctx) -> Result<Feed, HubError>
    where
        G: AccessGate<Ctx>,
    {
        assert_authorized(&self.gate, ctx, HubOperation::ReadFeed)?;
        self.feed.build_feed().map_err(HubError::Feed)
    }
}
