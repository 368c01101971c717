//! Backend API client, wire types and SSE adapter.

pub mod api;
pub mod sse;
pub mod types;

pub use api::{BackendClient, ClientConfig, Timed, USER_AGENT};
pub use sse::{BackendStream, SnapshotStream};
pub use types::{
    Extraction, GenerateRequest, GenerateResponse, HealthReport, StreamRequest, Validation,
    ValidationReport,
};
