//! SSE adapter feeding the accumulator.
//!
//! Decodes SSE framing from an HTTP byte stream and pushes each event's
//! `data` into a [`StreamSession`], yielding the resulting snapshots.

use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use futures_util::stream::BoxStream;

use crate::accumulator::{Snapshot, StreamSession};

/// Boxed response body stream.
pub type ByteStream = BoxStream<'static, reqwest::Result<bytes::Bytes>>;

/// Snapshot stream over a live backend response.
pub type BackendStream = SnapshotStream<ByteStream>;

const DATA_PREVIEW_CHARS: usize = 200;

/// Stream of snapshots decoded from SSE bytes.
///
/// Ends after the first terminal snapshot, or when the body ends. Dropping it
/// drops the underlying connection.
pub struct SnapshotStream<S> {
    inner: EventStream<S>,
    session: StreamSession,
}

impl<S> SnapshotStream<S> {
    pub fn new(stream: S, session: StreamSession) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
            session,
        }
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }
}

impl<S, E> Stream for SnapshotStream<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.session.is_terminated() {
                return Poll::Ready(None);
            }

            let inner = Pin::new(&mut self.inner);
            match inner.poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    tracing::debug!(
                        chunk = self.session.chunk_count() + 1,
                        event = %event.event,
                        id = if event.id.is_empty() { "n/a" } else { event.id.as_str() },
                        data = %preview(&event.data),
                        "received SSE event"
                    );
                    if let Some(snapshot) = self.session.push(&event.data) {
                        return Poll::Ready(Some(snapshot));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::warn!(error = %e, "SSE stream error");
                    return Poll::Ready(self.session.fail(format!("Stream transport error: {e}")));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

fn preview(data: &str) -> String {
    let mut chars = data.chars();
    let head: String = chars.by_ref().take(DATA_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_util::{StreamExt, stream};

    use super::*;
    use crate::accumulator::SessionKind;

    fn byte_stream(
        chunks: Vec<&'static str>,
    ) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))))
    }

    #[tokio::test]
    async fn test_text_stream_accumulates_until_done() {
        let body = byte_stream(vec![
            "data: {\"content\":\"Hello \"}\n\n",
            "data: {\"content\":\"world\"}\n\n",
            "data: {\"done\":true}\n\n",
            "data: {\"content\":\"after\"}\n\n",
        ]);
        let mut stream = SnapshotStream::new(body, StreamSession::new(SessionKind::Text));

        let snapshots: Vec<_> = stream.by_ref().collect().await;

        assert_eq!(snapshots.len(), 3);
        assert!(matches!(
            snapshots.last(),
            Some(Snapshot::Completed { text, .. }) if text == "Hello world"
        ));
        assert_eq!(stream.session().chunk_count(), 3);
    }

    #[tokio::test]
    async fn test_event_split_across_chunks() {
        let body = byte_stream(vec![
            "event: delta\ndata: {\"te",
            "xt\":\"A\"}\n",
            "\ndata: {\"text\":\"B\"}\n\ndata: {\"status\":\"completed\"}\n\n",
        ]);
        let stream = SnapshotStream::new(body, StreamSession::new(SessionKind::Vision));

        let snapshots: Vec<_> = stream.collect().await;

        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[2].text(), Some("AB"));
        assert_eq!(snapshots[2].progress().chunk_count, 3);
    }

    #[tokio::test]
    async fn test_malformed_event_does_not_abort() {
        let body = byte_stream(vec![
            "data: {\"content\":\"a\"}\n\n",
            "data: not json\n\n",
            "data: {\"content\":\"b\"}\n\n",
        ]);
        let mut stream = SnapshotStream::new(body, StreamSession::new(SessionKind::Text));

        let snapshots: Vec<_> = stream.by_ref().collect().await;

        assert_eq!(snapshots.len(), 2);
        assert_eq!(stream.session().text(), "ab");
        assert_eq!(stream.session().chunk_count(), 3);
    }

    #[tokio::test]
    async fn test_transport_error_yields_single_failure() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"content\":\"a\"}\n\n")),
            Err(std::io::Error::other("connection reset")),
            Ok(Bytes::from_static(b"data: {\"content\":\"b\"}\n\n")),
        ]);
        let stream = SnapshotStream::new(body, StreamSession::new(SessionKind::Text));

        let snapshots: Vec<_> = stream.collect().await;

        assert_eq!(snapshots.len(), 2);
        assert!(matches!(
            &snapshots[1],
            Snapshot::Failed { message, .. } if message.contains("connection reset")
        ));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(250);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), DATA_PREVIEW_CHARS + 3);
        assert_eq!(preview("short"), "short");
    }
}
