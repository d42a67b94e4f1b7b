use std::sync::Arc;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::transport::{HttpResponse, HttpTransport};
use crate::pipeline::structuring::{GenerationRequest, LlmClient, StructuringError};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Gemini `generateContent` client. Single attempt per call.
pub struct GeminiClient {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(transport: Arc<dyn HttpTransport>, api_key: &str, model: &str) -> Self {
        Self {
            transport,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_API_BASE}/{}:generateContent", self.model)
    }
}

impl LlmClient for GeminiClient {
    fn provider(&self) -> &str {
        "gemini"
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, StructuringError> {
        if self.api_key.is_empty() {
            return Err(StructuringError::Auth(
                "Missing GEMINI_API_KEY (or GOOGLE_API_KEY).".into(),
            ));
        }

        let payload = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system_text,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.user_text,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                response_mime_type: request.expect_structured.then_some("application/json"),
            },
        };
        let body = serde_json::to_value(&payload)
            .map_err(|e| StructuringError::HttpClient(format!("Failed to encode request: {e}")))?;

        let resp = self
            .transport
            .post_json(
                &self.endpoint(),
                &[
                    ("x-goog-api-key", self.api_key.as_str()),
                    ("Content-Type", "application/json"),
                ],
                &body,
            )
            .map_err(|e| StructuringError::Provider(format!("Gemini request failed: {e}")))?;

        tracing::debug!(model = %self.model, status = resp.status.as_u16(), "Gemini response");

        if is_auth_failure(&resp) {
            return Err(StructuringError::Auth(
                "Invalid GEMINI_API_KEY / GOOGLE_API_KEY.".into(),
            ));
        }
        if !resp.is_success() {
            return Err(StructuringError::Provider(format!(
                "Gemini error {}: {}",
                resp.status.as_u16(),
                resp.snippet()
            )));
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .map_err(|e| StructuringError::Provider(format!("Gemini response unreadable: {e}")))?;
        let text = parsed.text();
        if text.trim().is_empty() {
            return Err(StructuringError::Provider(
                "Gemini returned empty response.".into(),
            ));
        }
        Ok(text.trim().to_string())
    }
}

fn is_auth_failure(resp: &HttpResponse) -> bool {
    if matches!(resp.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return true;
    }
    if resp.is_success() {
        return false;
    }
    let body = resp.body.to_lowercase();
    body.contains("api key") && (body.contains("invalid") || body.contains("not valid"))
}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, concatenated.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}
