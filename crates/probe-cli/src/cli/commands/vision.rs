//! Image analysis.

use anyhow::Result;
use probe_core::backend::BackendClient;
use probe_core::images::{self, EncodedImage};
use probe_core::report::{self, Operation, Report};

use super::ReportSink;

pub async fn run(
    client: &BackendClient,
    image: Option<&str>,
    question: Option<&str>,
    out: &mut ReportSink,
) -> Result<()> {
    let image = match load_image(Operation::Vision, image) {
        Ok(image) => image,
        Err(report) => return out.finish(&report),
    };
    let question = report::vision_question(question);

    let report = match client.vision(&image, question).await {
        Ok(response) => report::vision(&response, &image),
        Err(e) => report::failure(Operation::Vision, &e),
    };
    out.finish(&report)
}

/// Loads and encodes the image argument, or explains why it can't.
pub(super) fn load_image(operation: Operation, image: Option<&str>) -> Result<EncodedImage, Report> {
    let Some(raw) = image.filter(|raw| !raw.trim().is_empty()) else {
        return Err(report::missing_image(operation));
    };
    let path = images::normalize_input_path(raw);
    images::encode_jpeg(&path).map_err(|e| report::failure(operation, &e))
}
