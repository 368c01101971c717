//! Standard (non-streaming) text generation.

use anyhow::Result;
use probe_core::backend::BackendClient;
use probe_core::report::{self, Operation};

use super::ReportSink;

pub async fn run(client: &BackendClient, question: &str, out: &mut ReportSink) -> Result<()> {
    if let Err(report) = report::check_question(Operation::Generate, question) {
        return out.finish(&report);
    }

    let report = match client.generate(question).await {
        Ok(response) => report::generation(&response),
        Err(e) => report::failure(Operation::Generate, &e),
    };
    out.finish(&report)
}
