use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use time::{OffsetDateTime, UtcOffset};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tokio::io::AsyncWriteExt;

const STAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Monitoring { base_url: String },
    Skipped { file_name: String },
    Downloaded { file_name: String },
    DownloadFailed { file_name: String, error: String },
    GeneralError { error: String },
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::Monitoring { base_url } => write!(f, "Monitoring DataLogs at {base_url}..."),
            LogEvent::Skipped { file_name } => write!(f, "[skipped - already exists] {file_name}"),
            LogEvent::Downloaded { file_name } => write!(f, "[downloaded] {file_name}"),
            LogEvent::DownloadFailed { file_name, error } => {
                write!(f, "[download error] {file_name}: {error}")
            }
            LogEvent::GeneralError { error } => write!(f, "[general error] {error}"),
        }
    }
}

/// Append-only event log mirrored to stdout.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
    echo: bool,
    offset: UtcOffset,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            echo: true,
            offset: UtcOffset::UTC,
        }
    }

    /// Offset used for timestamps. Resolve it before the runtime spawns threads.
    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write_start_marker(&self) {
        let marker = format!("\n--- START {} ---\n", format_stamp(self.now()));
        if let Err(err) = self.append(&marker).await {
            report_write_failure(&err);
        }
    }

    pub async fn record(&self, event: &LogEvent) {
        let line = render_line(self.now(), event);
        if self.echo {
            println!("{line}");
        }
        if let Err(err) = self.append(&format!("{line}\n")).await {
            report_write_failure(&err);
        }
    }

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }

    async fn append(&self, text: &str) -> io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }
}

pub fn render_line(at: OffsetDateTime, event: &LogEvent) -> String {
    format!("[{}] {event}", format_stamp(at))
}

fn report_write_failure(err: &io::Error) {
    println!("[log write failed] {err}");
}

fn format_stamp(at: OffsetDateTime) -> String {
    at.format(STAMP_FORMAT).unwrap_or_default()
}
