//! Operator command line for the content hub.
//!
//! # Responsibility
//! - Post notes, upload files, and print the feed against local stores.
//! - Report skipped uploads that the web surface only logs.
//!
//! Runs with an allow-all gate: whoever can run this binary can already
//! write the data file and asset directory.

use clap::{Parser, Subcommand};
use contenthub_core::{
    AllowAll, ContentKind, DirAssetStore, Feed, FileNoteLog, Hub, HubError, IngestReport,
    Submission, Upload, DEFAULT_ASSET_URL_PREFIX,
};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "contenthub", version, about = "Local operator tools for the content hub")]
struct Cli {
    /// Note log file.
    #[arg(long, global = true, default_value = "data.txt")]
    data_file: PathBuf,
    /// Asset directory.
    #[arg(long, global = true, default_value = "assets")]
    assets_dir: PathBuf,
    /// Public path prefix used for asset links.
    #[arg(long, global = true, default_value = DEFAULT_ASSET_URL_PREFIX)]
    asset_url_prefix: String,
    /// Absolute directory for rolling log files.
    #[arg(long, global = true)]
    log_dir: Option<String>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the core library is linked.
    Ping,
    /// Print the core library version.
    Version,
    /// Append one note.
    Post { text: String },
    /// Store files in the asset directory; the name is the path's last component.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the merged feed.
    Feed {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug)]
enum CliError {
    Hub(HubError),
    Open { path: PathBuf, source: io::Error },
    Json(serde_json::Error),
    Output(io::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hub(err) => write!(f, "{err}"),
            Self::Open { path, source } => {
                write!(f, "cannot open `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "cannot encode feed: {err}"),
            Self::Output(err) => write!(f, "cannot write output: {err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hub(err) => Some(err),
            Self::Open { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Output(err) => Some(err),
        }
    }
}

impl From<HubError> for CliError {
    fn from(value: HubError) -> Self {
        Self::Hub(value)
    }
}

impl From<io::Error> for CliError {
    fn from(value: io::Error) -> Self {
        Self::Output(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = match (cli.log_dir.as_deref(), cli.log_level.as_deref()) {
        (Some(dir), level) => Some(contenthub_core::init_logging(
            level.unwrap_or(contenthub_core::default_log_level()),
            dir,
        )),
        (None, Some(level)) => Some(contenthub_core::init_stderr_logging(level)),
        (None, None) => None,
    };
    if let Some(Err(err)) = logging {
        eprintln!("contenthub: logging unavailable: {err}");
    }

    let stdout = io::stdout();
    match run(cli, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("contenthub: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, out: &mut dyn Write) -> Result<(), CliError> {
    let hub = Hub::open(
        cli.data_file,
        cli.assets_dir,
        cli.asset_url_prefix,
        AllowAll,
    );

    match cli.command {
        Command::Ping => writeln!(out, "contenthub_core ping={}", contenthub_core::ping())?,
        Command::Version => writeln!(
            out,
            "contenthub_core version={}",
            contenthub_core::core_version()
        )?,
        Command::Post { text } => {
            let report = hub.ingest(&(), Submission::note(text))?;
            print_report(out, &report)?;
        }
        Command::Upload { paths } => {
            let mut submission = Submission::default();
            for path in paths {
                submission = submission.with_upload(open_upload(&path)?);
            }
            let report = hub.ingest(&(), submission)?;
            print_report(out, &report)?;
        }
        Command::Feed { json } => {
            let feed = hub.build_feed(&())?;
            if json {
                writeln!(
                    out,
                    "{}",
                    serde_json::to_string_pretty(&feed).map_err(CliError::Json)?
                )?;
            } else {
                print_feed(out, &feed, &hub)?;
            }
        }
    }
    Ok(())
}

fn open_upload(path: &Path) -> Result<Upload, CliError> {
    let file = File::open(path).map_err(|source| CliError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!(
        "event=cli_upload module=cli status=start file={:?}",
        file_name
    );
    Ok(Upload::new(file_name, file))
}

fn print_report(out: &mut dyn Write, report: &IngestReport) -> io::Result<()> {
    if report.note_appended {
        writeln!(out, "note appended")?;
    }
    for stored in &report.stored {
        writeln!(out, "stored {} ({} bytes)", stored.file_name, stored.bytes)?;
    }
    for skipped in &report.skipped {
        writeln!(out, "skipped {:?}: {}", skipped.file_name, skipped.reason)?;
    }
    if report.is_noop() {
        writeln!(out, "nothing to ingest")?;
    }
    Ok(())
}

fn print_feed(
    out: &mut dyn Write,
    feed: &Feed,
    hub: &Hub<FileNoteLog, DirAssetStore, AllowAll>,
) -> io::Result<()> {
    for item in feed.items() {
        match item.kind {
            ContentKind::Text => match &item.link_target {
                Some(target) => writeln!(out, "[text] {} -> {}", item.content, target)?,
                None => writeln!(out, "[text] {}", item.content)?,
            },
            kind => writeln!(
                out,
                "[{}] {} {} {}",
                kind.as_str(),
                item.content,
                item.mime_type.as_deref().unwrap_or_default(),
                hub.asset_path(&item.content)
            )?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run, Cli};
    use clap::Parser;
    use std::path::Path;

    fn run_args(root: &Path, args: &[&str]) -> String {
        let data_file = root.join("data.txt").display().to_string();
        let assets_dir = root.join("assets").display().to_string();
        let mut argv = vec![
            "contenthub",
            "--data-file",
            data_file.as_str(),
            "--assets-dir",
            assets_dir.as_str(),
        ];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let mut out = Vec::new();
        run(cli, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn ping_prints_pong() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run_args(dir.path(), &["ping"]), "contenthub_core ping=pong\n");
    }

    #[test]
    fn upload_requires_at_least_one_path() {
        assert!(Cli::try_parse_from(["contenthub", "upload"]).is_err());
    }

    #[test]
    fn post_then_feed_prints_the_note() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run_args(dir.path(), &["post", "hello"]), "note appended\n");
        assert_eq!(run_args(dir.path(), &["post", ""]), "nothing to ingest\n");
        assert_eq!(run_args(dir.path(), &["feed"]), "[text] hello\n");
    }

    #[test]
    fn upload_reports_stored_and_skipped_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = tempfile::tempdir().unwrap();
        let image = source.path().join("cat.png");
        let binary = source.path().join("tool.exe");
        std::fs::write(&image, b"PNGDATA").unwrap();
        std::fs::write(&binary, b"MZ").unwrap();

        let output = run_args(
            dir.path(),
            &[
                "upload",
                image.to_str().unwrap(),
                binary.to_str().unwrap(),
            ],
        );
        assert!(output.contains("stored cat.png (7 bytes)"));
        assert!(output.contains("skipped \"tool.exe\""));

        let feed = run_args(dir.path(), &["feed", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&feed).unwrap();
        assert_eq!(json[0]["kind"], "image");
        assert_eq!(json[0]["content"], "cat.png");
    }
}
