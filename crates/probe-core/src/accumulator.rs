//! Stream event accumulator.
//!
//! Turns the raw `data` payloads of a backend SSE stream into display
//! [`Snapshot`]s. The state machine is transport-agnostic: [`SnapshotIter`]
//! drives it from any iterator of payloads, and
//! [`crate::backend::sse::SnapshotStream`] drives it from an HTTP byte stream.

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::error::error_field_message;

/// Which endpoint a stream came from. Selects the field semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// `/api/gemini/stream`
    Text,
    /// `/api/gemini/vision-stream`
    Vision,
}

impl SessionKind {
    pub fn label(self) -> &'static str {
        match self {
            SessionKind::Text => "stream generation",
            SessionKind::Vision => "vision stream analysis",
        }
    }
}

/// Counters attached to every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Events received so far, including ignored and malformed ones.
    pub chunk_count: u64,
    /// Time since the session started.
    pub elapsed: Duration,
}

/// One display state emitted by the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// A fragment was appended to the accumulated text.
    Delta {
        delta: String,
        text: String,
        progress: Progress,
    },
    /// Legacy text-stream form: the accumulated text was replaced wholesale.
    Replaced { text: String, progress: Progress },
    /// Vision `finalText` fragment, emitted just before completion.
    Finalizing {
        fragment: Option<String>,
        text: String,
        progress: Progress,
    },
    /// Terminal: the backend signalled completion.
    Completed {
        text: String,
        finish_reason: Option<String>,
        progress: Progress,
    },
    /// Terminal: the backend reported an error, or the transport broke.
    Failed { message: String, progress: Progress },
}

impl Snapshot {
    pub fn progress(&self) -> Progress {
        match self {
            Snapshot::Delta { progress, .. }
            | Snapshot::Replaced { progress, .. }
            | Snapshot::Finalizing { progress, .. }
            | Snapshot::Completed { progress, .. }
            | Snapshot::Failed { progress, .. } => *progress,
        }
    }

    /// Accumulated text carried by this snapshot, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Snapshot::Delta { text, .. }
            | Snapshot::Replaced { text, .. }
            | Snapshot::Finalizing { text, .. }
            | Snapshot::Completed { text, .. } => Some(text),
            Snapshot::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Snapshot::Completed { .. } | Snapshot::Failed { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Snapshot::Failed { .. })
    }
}

/// Per-call accumulation state. Owned by exactly one stream.
#[derive(Debug, Clone)]
pub struct StreamSession {
    kind: SessionKind,
    text: String,
    chunk_count: u64,
    started: Instant,
    terminated: bool,
}

impl StreamSession {
    pub fn new(kind: SessionKind) -> Self {
        Self::started_at(kind, Instant::now())
    }

    /// Creates a session whose clock started at `started`.
    ///
    /// Streaming calls start the clock before the request is sent so that
    /// connection setup counts toward elapsed time.
    pub fn started_at(kind: SessionKind, started: Instant) -> Self {
        Self {
            kind,
            text: String::new(),
            chunk_count: 0,
            started,
            terminated: false,
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn progress(&self) -> Progress {
        Progress {
            chunk_count: self.chunk_count,
            elapsed: self.elapsed(),
        }
    }

    /// Feeds one raw event payload into the session.
    ///
    /// Returns at most one snapshot. Payloads that are not JSON, or carry no
    /// recognized field, only advance the chunk counter. After a terminal
    /// snapshot every call is a no-op.
    pub fn push(&mut self, raw: &str) -> Option<Snapshot> {
        if self.terminated {
            return None;
        }
        self.chunk_count += 1;

        let value = match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(
                    chunk = self.chunk_count,
                    error = %err,
                    data = raw,
                    "skipping malformed stream event"
                );
                return None;
            }
        };

        self.apply(&value)
    }

    /// Abandons the session with a failure, e.g. when the transport breaks.
    pub fn fail(&mut self, message: impl Into<String>) -> Option<Snapshot> {
        if self.terminated {
            return None;
        }
        self.terminated = true;
        Some(Snapshot::Failed {
            message: message.into(),
            progress: self.progress(),
        })
    }

    fn apply(&mut self, value: &Value) -> Option<Snapshot> {
        if let Some(finish_reason) = self.terminal_signal(value) {
            self.terminated = true;
            return Some(Snapshot::Completed {
                text: self.text.clone(),
                finish_reason,
                progress: self.progress(),
            });
        }

        if let Some(error) = value.get("error") {
            self.terminated = true;
            return Some(Snapshot::Failed {
                message: error_field_message(error),
                progress: self.progress(),
            });
        }

        match self.kind {
            SessionKind::Text => self.apply_text(value),
            SessionKind::Vision => self.apply_vision(value),
        }
    }

    /// Returns `Some(finish_reason)` when `value` ends the session.
    #[allow(clippy::option_option)]
    fn terminal_signal(&self, value: &Value) -> Option<Option<String>> {
        match self.kind {
            SessionKind::Text => {
                (value.get("done") == Some(&Value::Bool(true))).then_some(None)
            }
            SessionKind::Vision => {
                if let Some(reason) = value.get("finishReason").filter(|v| is_truthy(v)) {
                    let reason = reason
                        .as_str()
                        .map_or_else(|| reason.to_string(), str::to_string);
                    return Some(Some(reason));
                }
                (value.get("status").and_then(Value::as_str) == Some("completed"))
                    .then_some(None)
            }
        }
    }

    fn apply_text(&mut self, value: &Value) -> Option<Snapshot> {
        if let Some(delta) = value
            .get("content")
            .and_then(Value::as_str)
            .filter(|delta| !delta.is_empty())
        {
            self.text.push_str(delta);
            return Some(Snapshot::Delta {
                delta: delta.to_string(),
                text: self.text.clone(),
                progress: self.progress(),
            });
        }

        // Legacy servers send the full text so far under `text`.
        if let Some(full) = value.get("text").and_then(Value::as_str) {
            full.clone_into(&mut self.text);
            return Some(Snapshot::Replaced {
                text: self.text.clone(),
                progress: self.progress(),
            });
        }

        None
    }

    fn apply_vision(&mut self, value: &Value) -> Option<Snapshot> {
        if let Some(delta) = value.get("text").and_then(Value::as_str) {
            self.text.push_str(delta);
            return Some(Snapshot::Delta {
                delta: delta.to_string(),
                text: self.text.clone(),
                progress: self.progress(),
            });
        }

        if let Some(fragment) = value.get("finalText") {
            let fragment = fragment.as_str().map(str::to_string);
            if let Some(tail) = fragment.as_deref()
                && !tail.is_empty()
                && !self.text.ends_with(tail)
            {
                self.text.push_str(tail);
            }
            return Some(Snapshot::Finalizing {
                fragment,
                text: self.text.clone(),
                progress: self.progress(),
            });
        }

        None
    }
}

/// JSON truthiness: null, false, zero and empty values are falsy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Pull-based snapshot sequence over raw event payloads.
pub struct SnapshotIter<I> {
    inner: I,
    session: StreamSession,
}

impl<I> SnapshotIter<I> {
    pub fn new(kind: SessionKind, inner: I) -> Self {
        Self::with_session(StreamSession::new(kind), inner)
    }

    pub fn with_session(session: StreamSession, inner: I) -> Self {
        Self { inner, session }
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn into_session(self) -> StreamSession {
        self.session
    }
}

impl<I, S> Iterator for SnapshotIter<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Snapshot;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.session.is_terminated() {
            let raw = self.inner.next()?;
            if let Some(snapshot) = self.session.push(raw.as_ref()) {
                return Some(snapshot);
            }
        }
        None
    }
}

/// Convenience constructor for [`SnapshotIter`].
pub fn accumulate<I>(kind: SessionKind, payloads: I) -> SnapshotIter<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    SnapshotIter::new(kind, payloads.into_iter())
}
