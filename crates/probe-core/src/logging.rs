//! Logging: `tracing` diagnostics and the operation log.
//!
//! Diagnostics go to stderr (and optionally a file). The operation log is the
//! short `[HH:MM:SS] LEVEL: message` trail a host prints next to results.

use std::collections::VecDeque;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt};

use crate::config::LoggingConfig;

/// Picks the diagnostic filter directive.
///
/// `-v` and `-vv` raise the configured level to debug and trace; `RUST_LOG`
/// is applied on top by [`init`].
pub fn filter_directive(config: &LoggingConfig, verbosity: u8) -> String {
    match verbosity {
        0 => config.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Installs the global diagnostics subscriber.
///
/// Returns the file writer guard when `logging.file` is set; keep it alive
/// until exit so buffered lines are flushed.
///
/// # Errors
/// Returns an error if the filter does not parse, the log file cannot be
/// opened, or a subscriber is already installed.
pub fn init(config: &LoggingConfig, verbosity: u8) -> Result<Option<WorkerGuard>> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(filter_directive(config, verbosity)),
    }
    .context("invalid log filter")?;

    let stderr_layer = tracing_fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    let (file_layer, guard) = match config.file.as_deref() {
        Some(path) => {
            let (writer, guard) = file_writer(Path::new(path))?;
            let layer = tracing_fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(guard)
}

fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("log file path has no file name: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

// ============================================================================
// Operation log
// ============================================================================

/// Severity of an operation log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// One operation log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
    pub at: DateTime<Local>,
}

impl LogLine {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Local::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// `[HH:MM:SS] LEVEL: message`, or `LEVEL: message` without timestamps.
    pub fn render(&self, show_timestamps: bool) -> String {
        if show_timestamps {
            format!("[{}] {}: {}", self.at.format("%H:%M:%S"), self.level, self.message)
        } else {
            format!("{}: {}", self.level, self.message)
        }
    }
}

/// Bounded in-memory operation log. Oldest lines are dropped first.
///
/// `--final-only` streams print the retained tail once the operation ends.
#[derive(Debug, Clone)]
pub struct OperationLog {
    lines: VecDeque<LogLine>,
    capacity: usize,
    show_timestamps: bool,
}

impl OperationLog {
    pub fn new(capacity: usize, show_timestamps: bool) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(256)),
            capacity: capacity.max(1),
            show_timestamps,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::new(config.max_log_lines, config.show_timestamps)
    }

    /// Records a line and returns its rendered form.
    pub fn push(&mut self, line: LogLine) -> String {
        let rendered = line.render(self.show_timestamps);
        tracing::debug!(target: "probe::oplog", level = %line.level, "{}", line.message);
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        rendered
    }

    /// Whole log, one rendered line per entry.
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.render(self.show_timestamps))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
