//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into the two use-cases: ingest and feed.
//! - Keep callers (server, CLI) decoupled from storage details.

pub mod feed_service;
pub mod ingest_service;
