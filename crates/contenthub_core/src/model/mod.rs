//! Domain model for the merged feed and its inputs.
//!
//! # Responsibility
//! - Define the feed projection (`FeedItem`, `Feed`) handed to renderers.
//! - Define validated asset identifiers (`SafeFileName`).
//!
//! # Invariants
//! - Feed items are request-scoped projections; nothing here is persisted.
//! - A `SafeFileName` is always a single, non-hidden path component.

pub mod feed_item;
pub mod file_name;
