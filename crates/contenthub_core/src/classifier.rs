//! Filename-based content classification.
//!
//! # Responsibility
//! - Map a filename extension to a feed content kind and MIME type.
//! - Reject every extension outside the fixed upload allow-list.
//!
//! # Invariants
//! - Classification looks at the final extension only, case-insensitively.
//! - No content sniffing: the declared extension is trusted.
//! - Every accepted extension maps to a non-empty MIME type.

use crate::model::feed_item::ContentKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Accepted extension table: `(extension, kind, mime type)`.
const EXTENSION_TABLE: &[(&str, ContentKind, &str)] = &[
    ("jpg", ContentKind::Image, "image/jpeg"),
    ("jpeg", ContentKind::Image, "image/jpeg"),
    ("png", ContentKind::Image, "image/png"),
    ("svg", ContentKind::Image, "image/svg+xml"),
    ("mp4", ContentKind::Video, "video/mp4"),
    ("webm", ContentKind::Video, "video/webm"),
    ("ogg", ContentKind::Video, "video/ogg"),
    ("mov", ContentKind::Video, "video/quicktime"),
];

/// Successful classification of one filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: ContentKind,
    pub mime_type: &'static str,
}

/// Classification rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    /// Filename has no extension (or ends with a bare dot).
    MissingExtension,
    /// Extension is outside the accepted set. Holds the lowercased value.
    UnsupportedExtension(String),
}

impl Display for ClassifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingExtension => write!(f, "file name has no extension"),
            Self::UnsupportedExtension(ext) => write!(f, "unsupported file extension `{ext}`"),
        }
    }
}

impl Error for ClassifyError {}

/// Classifies `file_name` by its extension.
///
/// Only the text after the last `.` of the final path component counts, so
/// `clip.backup.MP4` is a video and `photo` is rejected.
pub fn classify(file_name: &str) -> Result<Classification, ClassifyError> {
    let extension = extension_of(file_name).ok_or(ClassifyError::MissingExtension)?;
    let lowered = extension.to_ascii_lowercase();

    EXTENSION_TABLE
        .iter()
        .find(|(ext, _, _)| *ext == lowered)
        .map(|(_, kind, mime_type)| Classification {
            kind: *kind,
            mime_type: *mime_type,
        })
        .ok_or(ClassifyError::UnsupportedExtension(lowered))
}

/// Returns whether `file_name` would pass [`classify`].
pub fn is_supported(file_name: &str) -> bool {
    classify(file_name).is_ok()
}

/// Returns the accepted extensions in table order.
pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    EXTENSION_TABLE.iter().map(|(ext, _, _)| *ext)
}

fn extension_of(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}
