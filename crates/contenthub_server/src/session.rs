//! Operator sessions backing the HTTP access gate.
//!
//! # Responsibility
//! - Verify operator credentials and mint random session tokens.
//! - Answer the core access gate for a request's session cookie.
//!
//! # Invariants
//! - Tokens are UUID v4 values held only in memory; a restart signs everyone out.
//! - Expired tokens are never honored, even before they are purged.
//! - Credential checks take the same time whether the first byte or the last differs.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use contenthub_core::AccessGate;
use log::{info, warn};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "contenthub_session";

/// Per-request caller context handed to the access gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub token: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            token: session_token(headers),
        }
    }
}

/// Digests of the configured operator credentials.
struct OperatorCredentials {
    user: [u8; 32],
    pass: [u8; 32],
}

impl OperatorCredentials {
    fn new(user: &str, pass: &str) -> Self {
        Self {
            user: digest(user),
            pass: digest(pass),
        }
    }

    fn matches(&self, user: &str, pass: &str) -> bool {
        // Both comparisons always run.
        let user_ok = constant_time_eq(&self.user, &digest(user));
        let pass_ok = constant_time_eq(&self.pass, &digest(pass));
        user_ok & pass_ok
    }
}

/// In-memory session registry for the single operator account.
pub struct SessionStore {
    credentials: OperatorCredentials,
    ttl: Duration,
    sessions: Mutex<HashMap<String, Instant>>,
}

impl SessionStore {
    pub fn new(admin_user: &str, admin_pass: &str, ttl: Duration) -> Self {
        Self {
            credentials: OperatorCredentials::new(admin_user, admin_pass),
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a fresh session token when the credentials match.
    ///
    /// Empty usernames or passwords are refused without comparison.
    pub fn login(&self, user: &str, pass: &str) -> Option<String> {
        if user.is_empty() || pass.is_empty() || !self.credentials.matches(user, pass) {
            warn!("event=login module=session status=error reason=invalid_credentials");
            return None;
        }

        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Instant::now() + self.ttl;
        let mut sessions = self.lock();
        purge_expired(&mut sessions);
        sessions.insert(token.clone(), expires_at);
        info!(
            "event=login module=session status=ok active_sessions={}",
            sessions.len()
        );
        Some(token)
    }

    /// Forgets a token. Unknown tokens are ignored.
    pub fn revoke(&self, token: &str) {
        let removed = self.lock().remove(token).is_some();
        info!("event=logout module=session status=ok revoked={removed}");
    }

    pub fn is_valid(&self, token: &str) -> bool {
        let mut sessions = self.lock();
        match sessions.get(token) {
            Some(expires_at) if *expires_at > Instant::now() => true,
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        // The map holds no cross-entry invariant, so a poisoned guard is still usable.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AccessGate<SessionContext> for SessionStore {
    fn is_authorized(&self, ctx: &SessionContext) -> bool {
        ctx.token
            .as_deref()
            .map(|token| self.is_valid(token))
            .unwrap_or(false)
    }
}

/// Extracts the session token from the request's `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value that installs a session token.
pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn purge_expired(sessions: &mut HashMap<String, Instant>) {
    let now = Instant::now();
    sessions.retain(|_, expires_at| *expires_at > now);
}

fn digest(value: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(value.as_bytes()));
    out
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (left, right)| acc | (left ^ right))
        == 0
}
