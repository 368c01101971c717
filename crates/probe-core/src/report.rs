//! Human-readable reports for each operation.
//!
//! Every operation result, stream snapshot and failure becomes a [`Report`]:
//! the text a host shows to the operator plus one operation log line.

use std::fmt::Write as _;
use std::time::Duration;

use serde_json::Value;

use crate::accumulator::{SessionKind, Snapshot, is_truthy};
use crate::backend::{GenerateResponse, HealthReport, Timed, Validation, ValidationReport};
use crate::error::{ProbeError, ProbeErrorKind};
use crate::images::EncodedImage;
use crate::logging::{LogLevel, LogLine};

/// Question used when a vision request is sent without one.
pub const DEFAULT_VISION_QUESTION: &str = "Please analyze this image in detail";

/// Display text plus the matching operation log line.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub display: String,
    pub log: LogLine,
}

impl Report {
    fn new(display: impl Into<String>, log: LogLine) -> Self {
        Self {
            display: display.into(),
            log,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.log.level
    }

    /// True unless the report carries a warning or an error.
    pub fn is_success(&self) -> bool {
        self.log.level == LogLevel::Info
    }
}

/// The operations the probe can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Health,
    Validation,
    Generate,
    Stream,
    Vision,
    VisionStream,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::Health => "Health check",
            Operation::Validation => "API key validation",
            Operation::Generate => "Standard generation",
            Operation::Stream => "Stream generation",
            Operation::Vision => "Vision analysis",
            Operation::VisionStream => "Vision stream analysis",
        }
    }
}

impl From<SessionKind> for Operation {
    fn from(kind: SessionKind) -> Self {
        match kind {
            SessionKind::Text => Operation::Stream,
            SessionKind::Vision => Operation::VisionStream,
        }
    }
}

// ============================================================================
// Input checks
// ============================================================================

/// Rejects an empty text question before any request is sent.
pub fn check_question(operation: Operation, question: &str) -> Result<(), Report> {
    if question.trim().is_empty() {
        return Err(Report::new(
            "Please enter a question",
            LogLine::warn(format!("{}: question is empty", operation.label())),
        ));
    }
    Ok(())
}

/// Vision question with the default substituted for blank input.
pub fn vision_question(question: Option<&str>) -> &str {
    match question {
        Some(q) if !q.trim().is_empty() => q,
        _ => DEFAULT_VISION_QUESTION,
    }
}

pub fn missing_image(operation: Operation) -> Report {
    Report::new(
        "Please provide an image",
        LogLine::warn(format!("{}: no image provided", operation.label())),
    )
}

// ============================================================================
// One-shot operations
// ============================================================================

pub fn health(report: &HealthReport) -> Report {
    let display = format!(
        "Health check passed\n\n\
         Service status:\n\
         - Status: {}\n\
         - Timestamp: {}\n\
         - Uptime: {}\n\
         - API configured: {}\n\
         - Version: {}\n\
         - Connections: {}/{}",
        value_or(report.status.as_ref(), "unknown"),
        value_or_na(report.timestamp.as_ref()),
        value_or_na(report.uptime.as_ref()),
        yes_no(flag(report.api_configured.as_ref()), "configured", "not configured"),
        value_or_na(report.version.as_ref()),
        value_or_na(report.active_connections.as_ref()),
        value_or_na(report.max_connections.as_ref()),
    );
    Report::new(display, LogLine::info("Health check passed"))
}

pub fn validation(validation: &Validation) -> Report {
    match validation {
        Validation::Accepted(report) => {
            let display = format!(
                "API key validation passed\n\n\
                 Result:\n\
                 - Key: {}\n\
                 - Configuration: {}\n\
                 - Available models: {}\n\
                 - Message: {}",
                validity(report),
                configured(report),
                model_count(report.models.as_ref()),
                value_or_na(report.message.as_ref()),
            );
            Report::new(display, LogLine::info("API key validation passed"))
        }
        Validation::Rejected { status, report } => {
            let message = value_or_na(report.message.as_ref());
            let display = format!(
                "API key validation failed (HTTP {status})\n\n\
                 Result:\n\
                 - Key: {}\n\
                 - Configuration: {}\n\
                 - Error: {message}\n\n\
                 Hint: check that GEMINI_API_KEY is set in the backend environment",
                validity(report),
                configured(report),
            );
            Report::new(
                display,
                LogLine::warn(format!("API key validation failed: {message}")),
            )
        }
    }
}

pub fn generation(response: &Timed<GenerateResponse>) -> Report {
    let extraction = response.value.extract();
    let ms = millis(response.latency);
    let display = format!(
        "Standard generation succeeded\n\n\
         Result:\n{}\n\n\
         Performance:\n\
         - Response time: {ms}ms\n\
         - Status: {}",
        extraction.display(),
        yes_no(extraction.is_success(), "success", "failed"),
    );
    Report::new(
        display,
        LogLine::info(format!("Standard generation passed in {ms}ms")),
    )
}

pub fn vision(response: &Timed<GenerateResponse>, image: &EncodedImage) -> Report {
    let extraction = response.value.extract();
    let ms = millis(response.latency);
    let display = format!(
        "Vision analysis succeeded\n\n\
         Analysis:\n{}\n\n\
         Performance:\n\
         - Response time: {ms}ms\n\
         - Image size: {}\n\
         - Status: {}",
        extraction.display(),
        image.dimensions(),
        yes_no(extraction.is_success(), "success", "failed"),
    );
    Report::new(
        display,
        LogLine::info(format!("Vision analysis passed in {ms}ms")),
    )
}

/// Report for an operation that ended in a [`ProbeError`].
pub fn failure(operation: Operation, error: &ProbeError) -> Report {
    let label = operation.label();
    let (display, log) = match error.kind {
        ProbeErrorKind::HttpStatus => (
            error.message.clone(),
            format!("{label} HTTP error: {}", error.log_summary()),
        ),
        ProbeErrorKind::Connection => (
            error.message.clone(),
            format!("{label} failed: {}", error.log_summary()),
        ),
        _ => (
            format!("{label} failed: {}", error.message),
            format!("{label} failed: {}", error.log_summary()),
        ),
    };
    Report::new(display, LogLine::error(log))
}

// ============================================================================
// Streams
// ============================================================================

pub fn stream_connecting(kind: SessionKind) -> Report {
    let label = Operation::from(kind).label();
    Report::new(
        "Establishing stream connection...",
        LogLine::info(format!("{label} started")),
    )
}

pub fn stream_connected(kind: SessionKind) -> Report {
    let label = Operation::from(kind).label();
    Report::new(
        "Stream connected, waiting for response...",
        LogLine::info(format!("{label} connection established")),
    )
}

/// Renders one accumulator snapshot.
pub fn snapshot(kind: SessionKind, snapshot: &Snapshot) -> Report {
    let label = Operation::from(kind).label();
    let progress = snapshot.progress();
    let ms = millis(progress.elapsed);
    let chunks = progress.chunk_count;

    match snapshot {
        Snapshot::Delta { delta, text, .. } => {
            let display = format!(
                "{label} in progress (chunk {chunks})\n\n\
                 Delta:\n{delta}\n\n\
                 Accumulated:\n{text}\n\n\
                 {}",
                live_stats(ms, chunks, Some(text)),
            );
            Report::new(
                display,
                LogLine::info(format!(
                    "Received chunk {chunks}: {} characters",
                    delta.chars().count()
                )),
            )
        }
        Snapshot::Replaced { text, .. } => {
            let display = format!(
                "{label} in progress (chunk {chunks})\n\n\
                 Current text:\n{text}\n\n\
                 {}",
                live_stats(ms, chunks, None),
            );
            Report::new(display, LogLine::info(format!("Received chunk {chunks}")))
        }
        Snapshot::Finalizing { fragment, text, .. } => {
            let fragment = fragment.as_deref().unwrap_or_default();
            let display = format!(
                "{label} almost done\n\n\
                 Final fragment:\n{fragment}\n\n\
                 Full text:\n{text}\n\n\
                 {}",
                live_stats(ms, chunks, Some(text)),
            );
            Report::new(
                display,
                LogLine::info(format!(
                    "Received final fragment: {} characters",
                    fragment.chars().count()
                )),
            )
        }
        Snapshot::Completed {
            text,
            finish_reason,
            ..
        } => {
            let mut display = format!(
                "{label} complete\n\n\
                 Final result:\n{text}\n\n\
                 Statistics:\n\
                 - Total time: {ms}ms\n\
                 - Chunks: {chunks}\n"
            );
            if kind == SessionKind::Text && chunks > 0 {
                let _ = writeln!(display, "- Average per chunk: {}ms", ms / chunks);
            }
            if kind == SessionKind::Vision {
                let _ = writeln!(
                    display,
                    "- Finish reason: {}",
                    finish_reason.as_deref().unwrap_or("normal completion")
                );
            }
            let _ = write!(display, "- Characters: {}", text.chars().count());
            Report::new(
                display,
                LogLine::info(format!(
                    "{label} complete in {ms}ms, {chunks} chunks"
                )),
            )
        }
        Snapshot::Failed { message, .. } => Report::new(
            format!("{label} error: {message}"),
            LogLine::error(format!("{label} error: {message}")),
        ),
    }
}

/// Report for a stream that ended without a terminal event.
pub fn stream_ended(kind: SessionKind, text: &str, chunks: u64, elapsed: Duration) -> Report {
    let label = Operation::from(kind).label();
    let ms = millis(elapsed);
    Report::new(
        format!(
            "{label} ended without a completion signal\n\n\
             Received text:\n{text}\n\n\
             - Total time: {ms}ms\n\
             - Chunks: {chunks}"
        ),
        LogLine::warn(format!(
            "{label} ended without completion after {chunks} chunks"
        )),
    )
}

// ============================================================================
// Helpers
// ============================================================================

fn live_stats(ms: u64, chunks: u64, text: Option<&str>) -> String {
    let mut stats = format!("Progress:\n- Elapsed: {ms}ms\n- Chunks: {chunks}");
    if let Some(text) = text {
        let _ = write!(stats, "\n- Characters: {}", text.chars().count());
    }
    stats
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn yes_no(flag: bool, yes: &'static str, no: &'static str) -> &'static str {
    if flag { yes } else { no }
}

/// Backend flags follow JSON truthiness; absent counts as false.
fn flag(value: Option<&Value>) -> bool {
    value.is_some_and(is_truthy)
}

fn validity(report: &ValidationReport) -> &'static str {
    yes_no(flag(report.valid.as_ref()), "valid", "invalid")
}

fn configured(report: &ValidationReport) -> &'static str {
    yes_no(flag(report.configured.as_ref()), "configured", "not configured")
}

fn value_or(value: Option<&Value>, fallback: &str) -> String {
    match value {
        None | Some(Value::Null) => fallback.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn value_or_na(value: Option<&Value>) -> String {
    value_or(value, "N/A")
}

fn model_count(models: Option<&Value>) -> String {
    match models {
        Some(Value::Array(list)) => list.len().to_string(),
        None | Some(Value::Null) => "0".to_string(),
        Some(other) => value_or_na(Some(other)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::accumulator::Progress;

    fn progress(chunks: u64, ms: u64) -> Progress {
        Progress {
            chunk_count: chunks,
            elapsed: Duration::from_millis(ms),
        }
    }

    fn response(value: serde_json::Value, ms: u64) -> Timed<GenerateResponse> {
        Timed {
            value: serde_json::from_value(value).unwrap(),
            latency: Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_health_report_fields() {
        let body: HealthReport = serde_json::from_value(json!({
            "status": "ok",
            "timestamp": "2024-05-01T09:00:00Z",
            "uptime": 12.5,
            "apiConfigured": true,
            "version": "1.2.0",
            "activeConnections": 3,
            "maxConnections": 100
        }))
        .unwrap();

        let report = health(&body);
        assert!(report.is_success());
        assert!(report.display.contains("- Status: ok"));
        assert!(report.display.contains("- Timestamp: 2024-05-01T09:00:00Z"));
        assert!(report.display.contains("- Uptime: 12.5"));
        assert!(report.display.contains("- API configured: configured"));
        assert!(report.display.contains("- Connections: 3/100"));
    }

    #[test]
    fn test_health_report_missing_fields() {
        let report = health(&HealthReport::default());
        assert!(report.display.contains("- Status: unknown"));
        assert!(report.display.contains("- API configured: not configured"));
        assert!(report.display.contains("- Connections: N/A/N/A"));
    }

    #[test]
    fn test_health_report_loosely_typed_fields() {
        let body: HealthReport = serde_json::from_value(json!({
            "status": null,
            "apiConfigured": 1,
            "version": 1.2
        }))
        .unwrap();

        let report = health(&body);
        assert!(report.display.contains("- Status: unknown"));
        assert!(report.display.contains("- API configured: configured"));
        assert!(report.display.contains("- Version: 1.2"));
    }

    #[test]
    fn test_validation_flags_use_truthiness() {
        let report = validation(&Validation::Rejected {
            status: 403,
            report: ValidationReport {
                valid: Some(json!("")),
                configured: Some(json!("yes")),
                models: None,
                message: Some(json!(403)),
            },
        });

        assert!(report.display.contains("- Key: invalid"));
        assert!(report.display.contains("- Configuration: configured"));
        assert_eq!(report.log.message, "API key validation failed: 403");
    }

    #[test]
    fn test_validation_rejected_is_warning_with_hint() {
        let report = validation(&Validation::Rejected {
            status: 401,
            report: ValidationReport {
                valid: Some(json!(false)),
                configured: Some(json!(true)),
                models: None,
                message: Some(json!("API key invalid")),
            },
        });

        assert_eq!(report.level(), LogLevel::Warn);
        assert!(report.display.contains("GEMINI_API_KEY"));
        assert!(report.display.contains("- Key: invalid"));
        assert_eq!(report.log.message, "API key validation failed: API key invalid");
    }

    #[test]
    fn test_validation_counts_model_list() {
        let report = validation(&Validation::Accepted(ValidationReport {
            valid: Some(json!(true)),
            configured: Some(json!(true)),
            models: Some(json!(["a", "b", "c"])),
            message: None,
        }));
        assert!(report.display.contains("- Available models: 3"));
        assert!(report.display.contains("- Message: N/A"));
    }

    #[test]
    fn test_generation_report_uses_extraction() {
        let ok = generation(&response(
            json!({"candidates": [{"content": {"parts": [{"text": "Hi there"}]}}]}),
            250,
        ));
        assert!(ok.display.contains("Hi there"));
        assert!(ok.display.contains("- Response time: 250ms"));
        assert!(ok.display.contains("- Status: success"));

        let empty = generation(&response(json!({"candidates": []}), 5));
        assert!(empty.display.contains("No candidates returned"));
        assert!(empty.display.contains("- Status: failed"));
    }

    #[test]
    fn test_check_question_rejects_blank() {
        let report = check_question(Operation::Generate, "   ").unwrap_err();
        assert_eq!(report.level(), LogLevel::Warn);
        assert_eq!(report.display, "Please enter a question");
        assert!(check_question(Operation::Stream, "hi").is_ok());
    }

    #[test]
    fn test_vision_question_default() {
        assert_eq!(vision_question(None), DEFAULT_VISION_QUESTION);
        assert_eq!(vision_question(Some("  ")), DEFAULT_VISION_QUESTION);
        assert_eq!(vision_question(Some("What is this?")), "What is this?");
    }

    #[test]
    fn test_failure_http_uses_category_message() {
        let report = failure(Operation::Vision, &ProbeError::http_status(413, "too big"));
        assert_eq!(report.level(), LogLevel::Error);
        assert_eq!(
            report.display,
            "Image file is too large, upload a smaller image"
        );
        assert_eq!(report.log.message, "Vision analysis HTTP error: 413 - too big");
    }

    #[test]
    fn test_failure_connection_names_backend() {
        let error = ProbeError::connection("http://localhost:3001", "refused");
        let report = failure(Operation::Health, &error);
        assert!(report.display.contains("http://localhost:3001"));
        assert!(!report.is_success());
    }

    #[test]
    fn test_snapshot_delta() {
        let report = snapshot(
            SessionKind::Text,
            &Snapshot::Delta {
                delta: "world".to_string(),
                text: "Hello world".to_string(),
                progress: progress(2, 40),
            },
        );
        assert!(report.display.starts_with("Stream generation in progress (chunk 2)"));
        assert!(report.display.contains("Accumulated:\nHello world"));
        assert!(report.display.contains("- Characters: 11"));
        assert_eq!(report.log.message, "Received chunk 2: 5 characters");
    }

    #[test]
    fn test_snapshot_completed_statistics() {
        let text = snapshot(
            SessionKind::Text,
            &Snapshot::Completed {
                text: "Hello world".to_string(),
                finish_reason: None,
                progress: progress(3, 300),
            },
        );
        assert!(text.display.contains("- Total time: 300ms"));
        assert!(text.display.contains("- Average per chunk: 100ms"));
        assert!(!text.display.contains("Finish reason"));

        let vision = snapshot(
            SessionKind::Vision,
            &Snapshot::Completed {
                text: "AB".to_string(),
                finish_reason: Some("STOP".to_string()),
                progress: progress(3, 90),
            },
        );
        assert!(vision.display.starts_with("Vision stream analysis complete"));
        assert!(vision.display.contains("- Finish reason: STOP"));
        assert!(!vision.display.contains("Average per chunk"));
        assert_eq!(
            vision.log.message,
            "Vision stream analysis complete in 90ms, 3 chunks"
        );
    }

    #[test]
    fn test_snapshot_failed_is_error() {
        let report = snapshot(
            SessionKind::Text,
            &Snapshot::Failed {
                message: "quota exceeded".to_string(),
                progress: progress(1, 5),
            },
        );
        assert_eq!(report.level(), LogLevel::Error);
        assert_eq!(report.display, "Stream generation error: quota exceeded");
    }
}
