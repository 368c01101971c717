//! Streaming generation and image analysis.

use anyhow::Result;
use futures_util::StreamExt;
use probe_core::accumulator::SessionKind;
use probe_core::backend::{BackendClient, BackendStream};
use probe_core::report::{self, Operation};

use super::ReportSink;
use super::vision::load_image;

pub async fn text(
    client: &BackendClient,
    question: &str,
    final_only: bool,
    out: &mut ReportSink,
) -> Result<()> {
    let kind = SessionKind::Text;
    if let Err(report) = report::check_question(Operation::from(kind), question) {
        return out.finish(&report);
    }

    out.emit(&report::stream_connecting(kind));
    match client.open_text_stream(question).await {
        Ok(stream) => {
            out.emit(&report::stream_connected(kind));
            drain(kind, stream, final_only, out).await
        }
        Err(e) => out.finish(&report::failure(Operation::from(kind), &e)),
    }
}

pub async fn vision(
    client: &BackendClient,
    image: Option<&str>,
    question: Option<&str>,
    final_only: bool,
    out: &mut ReportSink,
) -> Result<()> {
    let kind = SessionKind::Vision;
    let image = match load_image(Operation::from(kind), image) {
        Ok(image) => image,
        Err(report) => return out.finish(&report),
    };
    let question = report::vision_question(question);

    out.emit(&report::stream_connecting(kind));
    match client.open_vision_stream(&image, question).await {
        Ok(stream) => {
            out.emit(&report::stream_connected(kind));
            drain(kind, stream, final_only, out).await
        }
        Err(e) => out.finish(&report::failure(Operation::from(kind), &e)),
    }
}

/// Prints snapshots until the stream terminates or the body ends.
async fn drain(
    kind: SessionKind,
    mut stream: BackendStream,
    final_only: bool,
    out: &mut ReportSink,
) -> Result<()> {
    while let Some(snapshot) = stream.next().await {
        let report = report::snapshot(kind, &snapshot);
        if snapshot.is_terminal() {
            return out.finish(&report);
        }
        if final_only {
            out.record(&report);
        } else {
            out.emit(&report);
        }
    }

    let session = stream.session();
    tracing::debug!(
        chunks = session.chunk_count(),
        "stream ended without a completion event"
    );
    out.finish(&report::stream_ended(
        kind,
        session.text(),
        session.chunk_count(),
        session.elapsed(),
    ))
}
