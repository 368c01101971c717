//! Health and key validation.

use anyhow::Result;
use probe_core::backend::BackendClient;
use probe_core::report::{self, Operation};

use super::ReportSink;

pub async fn health(client: &BackendClient, out: &mut ReportSink) -> Result<()> {
    let report = match client.health().await {
        Ok(health) => report::health(&health),
        Err(e) => report::failure(Operation::Health, &e),
    };
    out.finish(&report)
}

pub async fn validate(client: &BackendClient, out: &mut ReportSink) -> Result<()> {
    let report = match client.validate().await {
        Ok(validation) => report::validation(&validation),
        Err(e) => report::failure(Operation::Validation, &e),
    };
    out.finish(&report)
}
