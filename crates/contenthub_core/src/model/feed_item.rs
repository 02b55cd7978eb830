//! Feed projection model.
//!
//! # Responsibility
//! - Define the unit of the merged view (`FeedItem`) and its ordered
//!   container (`Feed`).
//!
//! # Invariants
//! - `Text` items never carry a MIME type.
//! - `Image`/`Video` items always carry a non-empty MIME type.
//! - Only `Text` items carry a `link_target`.

use crate::classifier::Classification;
use serde::{Deserialize, Serialize};

/// Content kind of one feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// One line of the note log.
    Text,
    /// Still image asset.
    Image,
    /// Video asset.
    Video,
}

impl ContentKind {
    /// Stable lowercase name, also used by renderers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// Returns whether the kind is backed by an asset file.
    pub fn is_media(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// One entry of the merged feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub kind: ContentKind,
    /// Note body for text items, asset filename for media items.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Retrieval path of the asset whose filename equals `content`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
}

impl FeedItem {
    /// Creates a text item without a link.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Text,
            content: content.into(),
            mime_type: None,
            link_target: None,
        }
    }

    /// Creates a media item from a classified asset filename.
    pub fn media(file_name: impl Into<String>, classification: Classification) -> Self {
        Self {
            kind: classification.kind,
            content: file_name.into(),
            mime_type: Some(classification.mime_type.to_string()),
            link_target: None,
        }
    }

    /// Returns whether this is a text item.
    pub fn is_text(&self) -> bool {
        self.kind == ContentKind::Text
    }
}

/// Ordered feed: all text items newest-first, then all media items
/// newest-first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feed {
    items: Vec<FeedItem>,
}

impl Feed {
    /// Builds a feed from the two independently ordered groups.
    pub fn from_groups(texts: Vec<FeedItem>, media: Vec<FeedItem>) -> Self {
        let mut items = texts;
        items.extend(media);
        Self { items }
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<FeedItem> {
        self.items
    }

    /// Text items in feed order.
    pub fn texts(&self) -> impl Iterator<Item = &FeedItem> {
        self.items.iter().filter(|item| item.is_text())
    }

    /// Media items in feed order.
    pub fn media(&self) -> impl Iterator<Item = &FeedItem> {
        self.items.iter().filter(|item| !item.is_text())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
