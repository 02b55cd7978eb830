//! Environment-driven server configuration.
//!
//! Values are read once at startup, after `.env` has been loaded.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_LISTEN_ADDR: &str = "CONTENTHUB_LISTEN_ADDR";
pub const ENV_BASE_PATH: &str = "CONTENTHUB_BASE_PATH";
pub const ENV_DATA_FILE: &str = "CONTENTHUB_DATA_FILE";
pub const ENV_ASSETS_DIR: &str = "CONTENTHUB_ASSETS_DIR";
pub const ENV_ADMIN_USER: &str = "CONTENTHUB_ADMIN_USER";
pub const ENV_ADMIN_PASS: &str = "CONTENTHUB_ADMIN_PASS";
pub const ENV_COOKIE_SECURE: &str = "CONTENTHUB_COOKIE_SECURE";
pub const ENV_SESSION_TTL_SECS: &str = "CONTENTHUB_SESSION_TTL_SECS";
pub const ENV_MAX_UPLOAD_BYTES: &str = "CONTENTHUB_MAX_UPLOAD_BYTES";
pub const ENV_LOG_LEVEL: &str = "CONTENTHUB_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CONTENTHUB_LOG_DIR";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_BASE_PATH: &str = "/hub";
const DEFAULT_DATA_FILE: &str = "data.txt";
const DEFAULT_ASSETS_DIR: &str = "assets";
const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 3600;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 500 << 20;

/// Startup configuration error naming the offending variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "{var} must be set"),
            Self::Invalid { var, value } => write!(f, "{var} has invalid value `{value}`"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Mount point without trailing slash, e.g. `/hub`.
    pub base_path: String,
    pub data_file: PathBuf,
    pub assets_dir: PathBuf,
    pub admin_user: String,
    pub admin_pass: String,
    pub cookie_secure: bool,
    pub session_ttl: Duration,
    pub max_upload_bytes: usize,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let default_addr: SocketAddr =
            DEFAULT_LISTEN_ADDR
                .parse()
                .map_err(|_| ConfigError::Invalid {
                    var: ENV_LISTEN_ADDR,
                    value: DEFAULT_LISTEN_ADDR.to_string(),
                })?;
        let listen_addr = parse_or(ENV_LISTEN_ADDR, get(ENV_LISTEN_ADDR), default_addr)?;
        let base_path = normalize_base_path(
            get(ENV_BASE_PATH).unwrap_or_else(|| DEFAULT_BASE_PATH.to_string()),
        )?;
        let session_ttl_secs = parse_or(
            ENV_SESSION_TTL_SECS,
            get(ENV_SESSION_TTL_SECS),
            DEFAULT_SESSION_TTL_SECS,
        )?;
        let max_upload_bytes = parse_or(
            ENV_MAX_UPLOAD_BYTES,
            get(ENV_MAX_UPLOAD_BYTES),
            DEFAULT_MAX_UPLOAD_BYTES,
        )?;
        let cookie_secure = match get(ENV_COOKIE_SECURE).as_deref() {
            None | Some("false") => false,
            Some("true") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: ENV_COOKIE_SECURE,
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            listen_addr,
            base_path,
            data_file: PathBuf::from(
                get(ENV_DATA_FILE).unwrap_or_else(|| DEFAULT_DATA_FILE.to_string()),
            ),
            assets_dir: PathBuf::from(
                get(ENV_ASSETS_DIR).unwrap_or_else(|| DEFAULT_ASSETS_DIR.to_string()),
            ),
            admin_user: get(ENV_ADMIN_USER).ok_or(ConfigError::Missing(ENV_ADMIN_USER))?,
            admin_pass: get(ENV_ADMIN_PASS).ok_or(ConfigError::Missing(ENV_ADMIN_PASS))?,
            cookie_secure,
            session_ttl: Duration::from_secs(session_ttl_secs),
            max_upload_bytes,
            log_level: get(ENV_LOG_LEVEL)
                .unwrap_or_else(|| contenthub_core::default_log_level().to_string()),
            log_dir: get(ENV_LOG_DIR),
        })
    }

    /// Public path prefix of served assets, with trailing slash.
    pub fn asset_url_prefix(&self) -> String {
        format!("{}/assets/", self.base_path)
    }

    /// Absolute in-app path, e.g. `path("/login")` -> `/hub/login`.
    pub fn path(&self, suffix: &str) -> String {
        format!("{}{}", self.base_path, suffix)
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn normalize_base_path(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if !trimmed.starts_with('/') || trimmed.contains(char::is_whitespace) {
        return Err(ConfigError::Invalid {
            var: ENV_BASE_PATH,
            value: raw,
        });
    }
    Ok(trimmed.to_string())
}
