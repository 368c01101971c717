//! HTTP client for the backend under test.

use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, HeaderValue, USER_AGENT as USER_AGENT_HEADER};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::sse::{BackendStream, SnapshotStream};
use super::types::{
    GenerateRequest, GenerateResponse, HealthReport, StreamRequest, Validation, ValidationReport,
};
use crate::accumulator::{SessionKind, StreamSession};
use crate::config::{Config, Timeouts};
use crate::error::{ProbeError, ProbeResult, classify_reqwest_error};
use crate::images::EncodedImage;

/// User-Agent header sent with every request.
pub const USER_AGENT: &str = concat!("probe/", env!("CARGO_PKG_VERSION"));

const HEALTH_PATH: &str = "/api/health";
const VALIDATE_PATH: &str = "/api/validate";
const GENERATE_PATH: &str = "/api/gemini/generate";
const STREAM_PATH: &str = "/api/gemini/stream";
const VISION_PATH: &str = "/api/gemini/vision";
const VISION_STREAM_PATH: &str = "/api/gemini/vision-stream";

/// Everything a client needs to talk to one backend.
///
/// Switching backends means building a new client from a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    pub timeouts: Timeouts,
    /// `maxTokens` sent with streaming generation requests
    pub stream_max_tokens: u32,
}

impl ClientConfig {
    /// Config for `base_url` with default timeouts and token limit.
    ///
    /// # Errors
    /// Returns an error if the URL does not parse.
    pub fn for_url(base_url: &str) -> anyhow::Result<Self> {
        Config::default().client_config(Some(base_url))
    }
}

/// A response value with the time the request took.
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub value: T,
    pub latency: Duration,
}

/// Backend client.
pub struct BackendClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// `GET /api/health`.
    ///
    /// # Errors
    /// Connection failures, non-2xx statuses and unparsable bodies.
    pub async fn health(&self) -> ProbeResult<HealthReport> {
        let request = self.request(Method::GET, HEALTH_PATH, self.config.timeouts.health_check);
        let (response, _) = self.send(request, HEALTH_PATH).await?;
        let response = self.ensure_success(response).await?;
        read_json(response).await
    }

    /// `GET /api/validate`.
    ///
    /// A non-200 answer with a readable body is a [`Validation::Rejected`],
    /// not an error.
    ///
    /// # Errors
    /// Connection failures and unparsable bodies.
    pub async fn validate(&self) -> ProbeResult<Validation> {
        let request = self.request(
            Method::GET,
            VALIDATE_PATH,
            self.config.timeouts.api_validation,
        );
        let (response, _) = self.send(request, VALIDATE_PATH).await?;
        let status = response.status();

        if status == StatusCode::OK {
            return Ok(Validation::Accepted(read_json(response).await?));
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ValidationReport>(&body) {
            Ok(report) => Ok(Validation::Rejected {
                status: status.as_u16(),
                report,
            }),
            Err(_) => Err(ProbeError::http_status(status.as_u16(), &body)),
        }
    }

    /// `POST /api/gemini/generate`.
    ///
    /// # Errors
    /// Connection failures, non-2xx statuses and unparsable bodies.
    pub async fn generate(&self, question: &str) -> ProbeResult<Timed<GenerateResponse>> {
        let body = GenerateRequest::text(question);
        log_request(GENERATE_PATH, &body, question);
        let request = self
            .request(
                Method::POST,
                GENERATE_PATH,
                self.config.timeouts.standard_generation,
            )
            .json(&body);
        self.send_generate(request, GENERATE_PATH).await
    }

    /// `POST /api/gemini/vision`.
    ///
    /// # Errors
    /// Connection failures, non-2xx statuses and unparsable bodies.
    pub async fn vision(
        &self,
        image: &EncodedImage,
        question: &str,
    ) -> ProbeResult<Timed<GenerateResponse>> {
        let body = GenerateRequest::vision(question, image.mime_type, image.data.clone());
        log_request(VISION_PATH, &body.redacted(), question);
        log_image(image);
        let request = self
            .request(Method::POST, VISION_PATH, self.config.timeouts.vision_analysis)
            .json(&body);
        self.send_generate(request, VISION_PATH).await
    }

    /// `POST /api/gemini/stream`; returns text-kind snapshots.
    ///
    /// # Errors
    /// Connection failures and non-2xx statuses before the first event.
    pub async fn open_text_stream(&self, question: &str) -> ProbeResult<BackendStream> {
        let body = StreamRequest {
            prompt: question.to_string(),
            max_tokens: self.config.stream_max_tokens,
        };
        log_request(STREAM_PATH, &body, question);
        self.open_stream(
            SessionKind::Text,
            STREAM_PATH,
            &body,
            self.config.timeouts.stream_generation,
        )
        .await
    }

    /// `POST /api/gemini/vision-stream`; returns vision-kind snapshots.
    ///
    /// # Errors
    /// Connection failures and non-2xx statuses before the first event.
    pub async fn open_vision_stream(
        &self,
        image: &EncodedImage,
        question: &str,
    ) -> ProbeResult<BackendStream> {
        let body = GenerateRequest::vision(question, image.mime_type, image.data.clone());
        log_request(VISION_STREAM_PATH, &body.redacted(), question);
        log_image(image);
        self.open_stream(
            SessionKind::Vision,
            VISION_STREAM_PATH,
            &body,
            self.config.timeouts.vision_stream,
        )
        .await
    }

    async fn open_stream<B: Serialize>(
        &self,
        kind: SessionKind,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> ProbeResult<BackendStream> {
        // Connection setup counts toward the session's elapsed time.
        let session = StreamSession::new(kind);
        let request = self
            .request(Method::POST, path, timeout)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(body);
        let (response, _) = self.send(request, path).await?;
        let response = self.ensure_success(response).await?;
        tracing::debug!(path, "stream connection established");

        Ok(SnapshotStream::new(
            response.bytes_stream().boxed(),
            session,
        ))
    }

    async fn send_generate(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> ProbeResult<Timed<GenerateResponse>> {
        let (response, latency) = self.send(request, path).await?;
        let response = self.ensure_success(response).await?;
        let value = read_json(response).await?;
        Ok(Timed { value, latency })
    }

    fn request(&self, method: Method, path: &str, timeout: Option<Duration>) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        let mut builder = self
            .http
            .request(method, url)
            .header(USER_AGENT_HEADER, HeaderValue::from_static(USER_AGENT));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    /// Sends the request; returns the response and time to response headers.
    async fn send(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> ProbeResult<(Response, Duration)> {
        let started = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&self.config.base_url, &e))?;
        let latency = started.elapsed();

        tracing::debug!(
            path,
            status = response.status().as_u16(),
            headers = ?response.headers(),
            latency_ms = latency.as_millis() as u64,
            "response received"
        );
        Ok((response, latency))
    }

    async fn ensure_success(&self, response: Response) -> ProbeResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let shown = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| serde_json::to_string_pretty(&json).ok())
            .unwrap_or_else(|| body.clone());
        tracing::warn!(
            base_url = %self.config.base_url,
            status = status.as_u16(),
            headers = ?headers,
            body = %shown,
            "backend returned an error status"
        );
        Err(ProbeError::http_status(status.as_u16(), &body))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ProbeResult<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProbeError::parse(format!("Failed to read response body: {e}")))?;
    tracing::debug!(size = bytes.len(), "response body read");

    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| ProbeError::parse(format!("Response is not valid JSON: {e}")))?;
    if tracing::enabled!(tracing::Level::TRACE) {
        let pretty = serde_json::to_string_pretty(&value).unwrap_or_default();
        tracing::trace!(body = %pretty, "parsed response");
    }

    serde_json::from_value(value)
        .map_err(|e| ProbeError::parse(format!("Unexpected response shape: {e}")))
}

fn log_request<B: Serialize>(path: &str, body: &B, question: &str) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let pretty = serde_json::to_string_pretty(body).unwrap_or_default();
    tracing::debug!(
        path,
        question_chars = question.chars().count(),
        sent_at = %chrono::Local::now().format("%H:%M:%S%.3f"),
        body = %pretty,
        "sending request"
    );
}

fn log_image(image: &EncodedImage) {
    tracing::debug!(
        width = image.width,
        height = image.height,
        source_color = %image.source_color,
        base64_chars = image.data.len(),
        "attached image"
    );
}
