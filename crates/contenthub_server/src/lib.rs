//! HTTP surface for the content hub: session-gated feed page, upload
//! endpoint, JSON feed, and static asset serving.

pub mod config;
pub mod render;
pub mod routes;
pub mod session;

pub use config::{ConfigError, ServerConfig};
pub use routes::{build_router, AppState, ServerHub};
pub use session::{SessionContext, SessionStore, SESSION_COOKIE};
