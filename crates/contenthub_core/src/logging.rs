//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Start exactly one `flexi_logger` backend per process, writing either
//!   rolling files or stderr.
//! - Capture panics as single-line log events.
//!
//! # Invariants
//! - Repeating initialization with the same settings is a no-op.
//! - Asking for different settings once active is an error, never a panic.
//! - Events are metadata only: note bodies and upload bytes are not logged.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "contenthub";
const ROTATE_AT_BYTES: u64 = 10 << 20;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_TEXT_LIMIT: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Rolling files under an absolute directory.
    Directory(PathBuf),
    /// Standard error, used when no log directory is configured.
    Stderr,
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "{}", dir.display()),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(raw: &str) -> Result<Self, String> {
        let level = match raw.trim().to_ascii_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => {
                return Err(format!(
                    "unknown log level `{}` (use trace, debug, info, warn or error)",
                    raw.trim()
                ))
            }
        };
        Ok(level)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: LogLevel,
    target: LogTarget,
}

impl Display for LogSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.level.as_str(), self.target)
    }
}

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Starts rolling-file logging under `log_dir`.
///
/// # Errors
/// - `level` is not one of trace, debug, info, warn, error.
/// - `log_dir` is blank, relative, or cannot be created.
/// - Logging is already active with other settings.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let settings = LogSettings {
        level: LogLevel::parse(level)?,
        target: LogTarget::Directory(absolute_dir(log_dir)?),
    };
    activate(settings)
}

/// Starts logging to stderr; same rules as [`init_logging`].
pub fn init_stderr_logging(level: &str) -> Result<(), String> {
    activate(LogSettings {
        level: LogLevel::parse(level)?,
        target: LogTarget::Stderr,
    })
}

/// Active `(level, target)`, or `None` before initialization.
pub fn logging_status() -> Option<(&'static str, LogTarget)> {
    ACTIVE
        .get()
        .map(|active| (active.settings.level.as_str(), active.settings.target.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        LogLevel::Debug.as_str()
    } else {
        LogLevel::Info.as_str()
    }
}

fn activate(requested: LogSettings) -> Result<(), String> {
    let active = ACTIVE.get_or_try_init(|| {
        let handle = start_backend(&requested)?;
        PANIC_HOOK.get_or_init(install_panic_hook);
        info!(
            "event=logging_init module=core status=ok os={} debug_build={} version={} settings={}",
            std::env::consts::OS,
            cfg!(debug_assertions),
            env!("CARGO_PKG_VERSION"),
            requested
        );
        Ok::<_, String>(ActiveLogger {
            settings: requested.clone(),
            _handle: handle,
        })
    })?;

    if active.settings != requested {
        return Err(format!(
            "logging is already active as `{}`; cannot reconfigure to `{}`",
            active.settings, requested
        ));
    }
    Ok(())
}

fn start_backend(settings: &LogSettings) -> Result<LoggerHandle, String> {
    let logger = Logger::try_with_str(settings.level.as_str())
        .map_err(|err| format!("cannot build logger: {err}"))?;

    let logger = match &settings.target {
        LogTarget::Stderr => logger.log_to_stderr().format(flexi_logger::detailed_format),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|err| format!("cannot create log directory `{}`: {err}", dir.display()))?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
                )
                .append()
                .write_mode(WriteMode::BufferAndFlush)
                .format_for_files(flexi_logger::detailed_format)
        }
    };

    logger
        .start()
        .map_err(|err| format!("cannot start logger: {err}"))
}

fn absolute_dir(raw: &str) -> Result<PathBuf, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("log directory is empty".to_string());
    }
    let dir = Path::new(raw);
    if dir.is_relative() {
        return Err(format!("log directory `{raw}` is not absolute"));
    }
    Ok(dir.to_path_buf())
}

fn install_panic_hook() {
    let chained = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let at = match info.location() {
            Some(location) => format!("{}:{}", location.file(), location.line()),
            None => "unknown".to_string(),
        };
        // Payloads may quote user text.
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            at,
            one_line(&panic_text(info.payload()), PANIC_TEXT_LIMIT)
        );
        chained(info);
    }));
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|text| text.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<non-string payload>".to_string())
}

/// Flattens line breaks and caps the text at `limit` characters.
fn one_line(text: &str, limit: usize) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    match flat.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        absolute_dir, default_log_level, init_logging, init_stderr_logging, logging_status,
        one_line, panic_text, LogLevel, LogTarget,
    };
    use std::path::PathBuf;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(LogLevel::parse(" INFO ").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::parse("warning").unwrap(), LogLevel::Warn);
        let err = LogLevel::parse("loud").unwrap_err();
        assert!(err.contains("loud"));
        assert!(LogLevel::parse(default_log_level()).is_ok());
    }

    #[test]
    fn log_directory_must_be_absolute() {
        assert!(absolute_dir("logs").unwrap_err().contains("not absolute"));
        assert!(absolute_dir("  ").unwrap_err().contains("empty"));
    }

    #[test]
    fn one_line_flattens_and_caps() {
        assert_eq!(one_line("a\nb\rc", 10), "a b c");
        assert_eq!(one_line("abcdef", 3), "abc...");
        assert_eq!(one_line("héllo", 2), "hé...");
    }

    #[test]
    fn panic_text_reads_string_payloads() {
        assert_eq!(panic_text(&"boom"), "boom");
        assert_eq!(panic_text(&String::from("bang")), "bang");
        assert_eq!(panic_text(&42_u8), "<non-string payload>");
    }

    #[test]
    fn log_target_display_names_directory_or_stderr() {
        assert_eq!(LogTarget::Stderr.to_string(), "stderr");
        assert_eq!(
            LogTarget::Directory(PathBuf::from("/var/log/hub")).to_string(),
            "/var/log/hub"
        );
    }

    // Only this test touches the process-wide logger.
    #[test]
    fn first_settings_win_and_repeats_are_accepted() {
        let root = tempfile::tempdir().unwrap();
        let logs = root.path().join("logs");
        let other = root.path().join("other");
        let logs_str = logs.to_str().unwrap();

        init_logging("info", logs_str).unwrap();
        init_logging("INFO", logs_str).unwrap();

        assert!(init_logging("debug", logs_str)
            .unwrap_err()
            .contains("cannot reconfigure"));
        assert!(init_logging("info", other.to_str().unwrap())
            .unwrap_err()
            .contains("cannot reconfigure"));
        assert!(init_stderr_logging("info")
            .unwrap_err()
            .contains("cannot reconfigure"));

        assert_eq!(
            logging_status(),
            Some(("info", LogTarget::Directory(logs.clone())))
        );
        assert!(logs.is_dir());
    }
}
