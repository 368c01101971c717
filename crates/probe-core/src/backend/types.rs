//! Wire types for the backend API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Health / validation
// ============================================================================

/// `GET /api/health` body.
///
/// Fields are optional and loosely typed; the probe displays whatever the
/// backend sends.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthReport {
    pub status: Option<Value>,
    pub timestamp: Option<Value>,
    pub uptime: Option<Value>,
    pub api_configured: Option<Value>,
    pub version: Option<Value>,
    pub active_connections: Option<Value>,
    pub max_connections: Option<Value>,
}

/// `GET /api/validate` body, for both success and failure responses.
///
/// Flags are read by JSON truthiness.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidationReport {
    pub valid: Option<Value>,
    pub configured: Option<Value>,
    pub models: Option<Value>,
    pub message: Option<Value>,
}

/// Outcome of `GET /api/validate`.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// HTTP 200
    Accepted(ValidationReport),
    /// Any other status with a parsable body
    Rejected { status: u16, report: ValidationReport },
}

// ============================================================================
// Generation requests
// ============================================================================

/// Inline image attached to a request part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded image data
    pub data: String,
}

/// Request content part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// Body for `/api/gemini/generate`, `/api/gemini/vision` and
/// `/api/gemini/vision-stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    pub fn text(question: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: question.to_string(),
                }],
            }],
        }
    }

    pub fn vision(question: &str, mime_type: &str, data: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: question.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data,
                        },
                    },
                ],
            }],
        }
    }

    /// Copy of the request suitable for logging: image data is replaced by
    /// a length marker.
    pub fn redacted(&self) -> Self {
        let contents = self
            .contents
            .iter()
            .map(|content| Content {
                parts: content
                    .parts
                    .iter()
                    .map(|part| match part {
                        Part::Text { .. } => part.clone(),
                        Part::InlineData { inline_data } => Part::InlineData {
                            inline_data: InlineData {
                                mime_type: inline_data.mime_type.clone(),
                                data: format!(
                                    "[BASE64 image data: {} chars]",
                                    inline_data.data.len()
                                ),
                            },
                        },
                    })
                    .collect(),
            })
            .collect();
        Self { contents }
    }
}

/// Body for `/api/gemini/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    pub prompt: String,
    pub max_tokens: u32,
}

// ============================================================================
// Generation responses
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CandidateContent {
    pub parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

/// Response body for `/api/gemini/generate` and `/api/gemini/vision`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerateResponse {
    pub candidates: Option<Vec<Candidate>>,
}

/// What could be pulled out of a [`GenerateResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// First part of the first candidate had text.
    Text(String),
    /// First part exists but carries no text.
    NoText,
    /// First candidate has no content or parts.
    Unparseable,
    /// No candidates at all.
    NoCandidates,
}

impl Extraction {
    pub fn is_success(&self) -> bool {
        matches!(self, Extraction::Text(_))
    }

    /// Text shown in the result box.
    pub fn display(&self) -> &str {
        match self {
            Extraction::Text(text) => text,
            Extraction::NoText => "No content generated",
            Extraction::Unparseable => "Could not parse generated content",
            Extraction::NoCandidates => "No candidates returned",
        }
    }
}

impl GenerateResponse {
    pub fn extract(&self) -> Extraction {
        let Some(candidate) = self.candidates.as_deref().and_then(<[Candidate]>::first) else {
            return Extraction::NoCandidates;
        };
        let Some(parts) = candidate
            .content
            .as_ref()
            .and_then(|content| content.parts.as_deref())
            .filter(|parts| !parts.is_empty())
        else {
            return Extraction::Unparseable;
        };
        match parts[0].text.as_deref() {
            Some(text) => Extraction::Text(text.to_string()),
            None => Extraction::NoText,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_text_request_shape() {
        let value = serde_json::to_value(GenerateRequest::text("hi")).unwrap();
        assert_eq!(value, json!({"contents": [{"parts": [{"text": "hi"}]}]}));
    }

    #[test]
    fn test_vision_request_shape() {
        let request = GenerateRequest::vision("what is this?", "image/jpeg", "QUJD".to_string());
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"contents": [{"parts": [
                {"text": "what is this?"},
                {"inline_data": {"mime_type": "image/jpeg", "data": "QUJD"}}
            ]}]})
        );
    }

    #[test]
    fn test_redacted_request_hides_image_data() {
        let request = GenerateRequest::vision("q", "image/jpeg", "A".repeat(1234));
        let value = serde_json::to_value(request.redacted()).unwrap();
        assert_eq!(
            value["contents"][0]["parts"][1]["inline_data"]["data"],
            "[BASE64 image data: 1234 chars]"
        );
        assert_eq!(value["contents"][0]["parts"][0]["text"], "q");
    }

    #[test]
    fn test_stream_request_uses_camel_case() {
        let request = StreamRequest {
            prompt: "p".to_string(),
            max_tokens: 4096,
        };
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({"prompt": "p", "maxTokens": 4096})
        );
    }

    #[test]
    fn test_health_report_tolerates_mixed_types() {
        let report: HealthReport = serde_json::from_value(json!({
            "status": "healthy",
            "timestamp": "2024-01-01T00:00:00Z",
            "uptime": 12.5,
            "apiConfigured": true,
            "version": "1.2.0",
            "activeConnections": 2,
            "maxConnections": "100",
            "extra": {"ignored": true}
        }))
        .unwrap();
        assert_eq!(report.status, Some(json!("healthy")));
        assert_eq!(report.api_configured, Some(json!(true)));
        assert_eq!(report.uptime, Some(json!(12.5)));
        assert_eq!(report.max_connections, Some(json!("100")));
    }

    #[test]
    fn test_validation_report_keeps_non_boolean_flags() {
        let report: ValidationReport = serde_json::from_value(json!({
            "valid": 1,
            "configured": "yes",
            "message": 404
        }))
        .unwrap();
        assert_eq!(report.valid, Some(json!(1)));
        assert_eq!(report.configured, Some(json!("yes")));
        assert_eq!(report.message, Some(json!(404)));
    }

    #[test]
    fn test_extraction_cases() {
        let ok: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "answer"}, {"text": "more"}]}}]
        }))
        .unwrap();
        assert_eq!(ok.extract(), Extraction::Text("answer".to_string()));

        let no_text: GenerateResponse =
            serde_json::from_value(json!({"candidates": [{"content": {"parts": [{}]}}]})).unwrap();
        assert_eq!(no_text.extract(), Extraction::NoText);
        assert!(!no_text.extract().is_success());

        let no_parts: GenerateResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        assert_eq!(no_parts.extract(), Extraction::Unparseable);

        let empty: GenerateResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert_eq!(empty.extract(), Extraction::NoCandidates);
        assert_eq!(
            GenerateResponse::default().extract().display(),
            "No candidates returned"
        );
    }
}
