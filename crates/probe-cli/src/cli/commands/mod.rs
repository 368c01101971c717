//! CLI command handlers.

use std::fmt;

use anyhow::Result;
use probe_core::logging::OperationLog;
use probe_core::report::Report;

pub mod check;
pub mod config;
pub mod generate;
pub mod questions;
pub mod stream;
pub mod vision;

/// Returned when an operation ended in a warning or error report.
///
/// The report has already been printed, so `main` only sets the exit code.
#[derive(Debug)]
pub struct ReportFailed;

impl fmt::Display for ReportFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation did not succeed")
    }
}

impl std::error::Error for ReportFailed {}

/// Prints reports: display text to stdout, log lines to stderr.
///
/// A deferred sink holds log lines until [`ReportSink::finish`], then prints
/// the tail kept by the operation log (`logging.max_log_lines`).
pub struct ReportSink {
    log: OperationLog,
    deferred: bool,
}

impl ReportSink {
    pub fn new(log: OperationLog) -> Self {
        Self {
            log,
            deferred: false,
        }
    }

    pub fn deferred(log: OperationLog) -> Self {
        Self {
            log,
            deferred: true,
        }
    }

    pub fn emit(&mut self, report: &Report) {
        println!("{}\n", report.display);
        self.record(report);
    }

    /// Logs a report without printing its display text.
    pub fn record(&mut self, report: &Report) {
        let rendered = self.log.push(report.log.clone());
        if !self.deferred {
            eprintln!("{rendered}");
        }
    }

    /// Prints the last report of an operation and maps it to the exit status.
    pub fn finish(&mut self, report: &Report) -> Result<()> {
        self.emit(report);
        if self.deferred {
            eprintln!("{}", self.log.render());
        }
        if report.is_success() {
            Ok(())
        } else {
            Err(ReportFailed.into())
        }
    }
}
