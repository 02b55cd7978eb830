//! Feed use-case: merge the note log and the asset store into one view.
//!
//! # Responsibility
//! - Project notes and assets into `FeedItem`s.
//! - Order each group by its own recency signal.
//! - Cross-link notes whose text is exactly an asset filename.
//!
//! # Invariants
//! - Notes are ordered by reverse append order (they carry no timestamp).
//! - Media are ordered by modification time, newest first; ties break by
//!   filename so repeated reads are identical.
//! - Text items come before media items; the groups are never interleaved.
//! - Read-only: safe to run concurrently with itself and with ingestion.

use crate::classifier::classify;
use crate::model::feed_item::{Feed, FeedItem};
use crate::store::{AssetRecord, AssetStore, NoteLog, StoreResult};
use log::{debug, warn};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Instant;

/// Default public path prefix under which assets are served.
pub const DEFAULT_ASSET_URL_PREFIX: &str = "/hub/assets/";

/// Feed builder over injected stores.
pub struct FeedService<N: NoteLog, A: AssetStore> {
    notes: N,
    assets: A,
    asset_url_prefix: String,
}

impl<N: NoteLog, A: AssetStore> FeedService<N, A> {
    /// Creates a feed service; `asset_url_prefix` gets a trailing `/` if missing.
    pub fn new(notes: N, assets: A, asset_url_prefix: impl Into<String>) -> Self {
        let mut asset_url_prefix = asset_url_prefix.into();
        if !asset_url_prefix.ends_with('/') {
            asset_url_prefix.push('/');
        }
        Self {
            notes,
            assets,
            asset_url_prefix,
        }
    }

    /// Retrieval path for an asset filename.
    pub fn asset_path(&self, file_name: &str) -> String {
        format!(
            "{}{}",
            self.asset_url_prefix,
            urlencoding::encode(file_name)
        )
    }

    /// Builds the merged feed.
    ///
    /// A missing log or asset directory yields an empty group. An unreadable
    /// asset directory is also treated as empty; an unreadable note log is
    /// a storage error.
    pub fn build_feed(&self) -> StoreResult<Feed> {
        let started_at = Instant::now();

        let mut texts = self
            .notes
            .read_all()?
            .into_iter()
            .map(|record| FeedItem::text(record.text))
            .collect::<Vec<_>>();
        texts.reverse();

        let media = self.media_items();

        let media_names = media
            .iter()
            .map(|item| item.content.as_str())
            .collect::<HashSet<_>>();
        for item in &mut texts {
            if media_names.contains(item.content.as_str()) {
                item.link_target = Some(self.asset_path(&item.content));
            }
        }

        debug!(
            "event=feed_build module=service status=ok texts={} media={} duration_ms={}",
            texts.len(),
            media.len(),
            started_at.elapsed().as_millis()
        );
        Ok(Feed::from_groups(texts, media))
    }

    fn media_items(&self) -> Vec<FeedItem> {
        let mut records = match self.assets.list_assets() {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    "event=feed_build module=service status=degraded reason=asset_store_unreadable error={}",
                    err
                );
                return Vec::new();
            }
        };

        sort_newest_first(&mut records);

        records
            .into_iter()
            .filter_map(|record| match classify(&record.file_name) {
                Ok(classification) => Some(FeedItem::media(record.file_name, classification)),
                Err(err) => {
                    // Passed classification at upload time, so this file was
                    // placed by hand or by an older release.
                    warn!(
                        "event=feed_build module=service status=skip file={:?} error={}",
                        record.file_name, err
                    );
                    None
                }
            })
            .collect()
    }
}

fn sort_newest_first(records: &mut [AssetRecord]) {
    records.sort_by(|a, b| {
        Reverse(a.modified)
            .cmp(&Reverse(b.modified))
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
}
