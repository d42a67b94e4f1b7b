use std::sync::Arc;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::transport::{HttpResponse, HttpTransport, RetryPolicy};
use crate::pipeline::structuring::{extract_json_object, GenerationRequest, LlmClient, StructuringError};

pub const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const GROQ_MODELS_URL: &str = "https://api.groq.com/openai/v1/models";

/// Model name that asks the client to pick from the live model list.
pub const AUTO_MODEL: &str = "auto";

/// Substitutes tried first when the configured model is unavailable.
pub const GROQ_FALLBACK_MODELS: &[&str] = &[
    "llama-4-scout-17b-16e-instruct",
    "llama-3.3-70b-versatile",
    "llama-3.1-8b-instant",
];

/// Further known-good models, after the fallback list, for auto selection.
const GROQ_EXTRA_PREFERRED: &[&str] = &[
    "llama-3.1-70b-versatile",
    "llama3-70b-8192",
    "llama3-8b-8192",
    "mixtral-8x7b-32768",
    "gemma2-9b-it",
];

/// Groq chat-completions client (OpenAI-compatible).
pub struct GroqClient {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl GroqClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        api_key: &str,
        model: &str,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            retry,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.model.is_empty() || self.model.eq_ignore_ascii_case(AUTO_MODEL)
    }

    /// Model ids the key can currently use.
    pub fn list_models(&self) -> Result<Vec<String>, StructuringError> {
        let bearer = self.bearer();
        let resp = self
            .transport
            .get(GROQ_MODELS_URL, &[("Authorization", bearer.as_str())])
            .map_err(|e| StructuringError::Provider(format!("Groq model listing failed: {e}")))?;

        if resp.status == StatusCode::UNAUTHORIZED {
            return Err(invalid_key());
        }
        if !resp.is_success() {
            return Err(StructuringError::Provider(format!(
                "Groq model listing error {}: {}",
                resp.status.as_u16(),
                resp.snippet()
            )));
        }

        let listing: ModelListing = resp.json()?;
        Ok(listing
            .data
            .into_iter()
            .map(|m| m.id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect())
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// POST one chat completion for `model`, retrying transient failures.
    /// Transport failures that outlive the retries become `Provider` errors.
    fn post_chat(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<HttpResponse, StructuringError> {
        let payload = ChatCompletionRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_text,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_text,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        };
        let body = serde_json::to_value(&payload)
            .map_err(|e| StructuringError::HttpClient(format!("Failed to encode request: {e}")))?;
        let bearer = self.bearer();
        let headers = [
            ("Authorization", bearer.as_str()),
            ("Content-Type", "application/json"),
        ];

        let resp = self
            .retry
            .run("groq", || self.transport.post_json(GROQ_CHAT_URL, &headers, &body))
            .map_err(|e| StructuringError::Provider(format!("Groq request failed: {e}")))?;

        tracing::debug!(model, status = resp.status.as_u16(), "Groq response");
        Ok(resp)
    }

    fn complete_configured(&self, request: &GenerationRequest) -> Result<String, StructuringError> {
        let resp = self.post_chat(&self.model, request)?;

        if resp.status == StatusCode::UNAUTHORIZED {
            return Err(invalid_key());
        }

        if is_model_not_found(&resp) {
            tracing::warn!(model = %self.model, "Configured Groq model not found, trying substitutes");
            let available = match self.list_models() {
                Ok(models) => models,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Groq model listing failed, using built-in list only");
                    Vec::new()
                }
            };
            let candidates = substitution_candidates(&self.model, &available);
            return self.try_candidates(&candidates, request).map_err(|e| match e {
                StructuringError::Provider(detail) => StructuringError::Provider(format!(
                    "Configured Groq model '{}' is not available for this API key. \
                     Set GROQ_MODEL=auto or one of: {}. {detail}",
                    self.model,
                    available.iter().take(20).cloned().collect::<Vec<_>>().join(", ")
                )),
                other => other,
            });
        }

        if !resp.is_success() {
            return Err(StructuringError::Provider(format!(
                "Groq error {}: {}",
                resp.status.as_u16(),
                resp.snippet()
            )));
        }

        parse_chat_content(&resp)
    }

    fn complete_auto(&self, request: &GenerationRequest) -> Result<String, StructuringError> {
        let available = self.list_models()?;
        if available.is_empty() {
            return Err(StructuringError::Provider(
                "Groq returned no available models.".into(),
            ));
        }
        let candidates = auto_candidates(&available);
        self.try_candidates(&candidates, request)
    }

    /// Try candidates in order.
    ///
    /// The first successful response wins, except that a structured request
    /// keeps going past text with no extractable object. If no candidate
    /// produced one, the first successful response is returned anyway.
    fn try_candidates(
        &self,
        candidates: &[String],
        request: &GenerationRequest,
    ) -> Result<String, StructuringError> {
        let mut first_success: Option<String> = None;
        let mut last_error: Option<String> = None;

        for candidate in candidates {
            let resp = match self.post_chat(candidate, request) {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(format!("{candidate}: {e}"));
                    continue;
                }
            };

            if resp.status == StatusCode::UNAUTHORIZED {
                return Err(invalid_key());
            }
            if !resp.is_success() {
                last_error = Some(format!(
                    "{candidate}: {} {}",
                    resp.status.as_u16(),
                    resp.snippet()
                ));
                continue;
            }

            let text = match parse_chat_content(&resp) {
                Ok(text) => text,
                Err(e) => {
                    last_error = Some(format!("{candidate}: {e}"));
                    continue;
                }
            };

            if !request.expect_structured || extract_json_object(&text).is_some() {
                tracing::info!(model = %candidate, "Groq model accepted");
                return Ok(text);
            }

            tracing::debug!(model = %candidate, "No JSON object in candidate response, trying next model");
            if first_success.is_none() {
                first_success = Some(text);
            }
        }

        if let Some(text) = first_success {
            tracing::warn!("No Groq model returned a JSON object, using first successful response");
            return Ok(text);
        }

        Err(StructuringError::Provider(format!(
            "No available Groq models succeeded for chat completions.{}",
            last_error
                .map(|e| format!(" Last error: {e}"))
                .unwrap_or_default()
        )))
    }
}

impl LlmClient for GroqClient {
    fn provider(&self) -> &str {
        "groq"
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, StructuringError> {
        if self.api_key.is_empty() {
            return Err(StructuringError::Config("Missing GROQ_API_KEY.".into()));
        }
        if self.is_auto() {
            self.complete_auto(request)
        } else {
            self.complete_configured(request)
        }
    }
}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelListing {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    #[serde(default)]
    id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn invalid_key() -> StructuringError {
    StructuringError::Auth("Invalid GROQ_API_KEY.".into())
}

fn parse_chat_content(resp: &HttpResponse) -> Result<String, StructuringError> {
    let parsed: ChatCompletionResponse = resp.json()?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| {
            StructuringError::ResponseParsing("Groq response has no message content".into())
        })
}

/// 404 whose error body says the model is unknown.
fn is_model_not_found(resp: &HttpResponse) -> bool {
    if resp.status != StatusCode::NOT_FOUND {
        return false;
    }
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&resp.body) else {
        return false;
    };
    let Some(detail) = envelope.error else {
        return false;
    };
    detail.code.as_deref().map(str::trim) == Some("model_not_found")
        || detail
            .message
            .is_some_and(|m| m.to_lowercase().contains("does not exist"))
}

/// Auto mode: preferred models the key can use, then every other live model.
pub fn auto_candidates(available: &[String]) -> Vec<String> {
    let mut candidates: Vec<String> = GROQ_FALLBACK_MODELS
        .iter()
        .chain(GROQ_EXTRA_PREFERRED)
        .copied()
        .filter(|m| available.iter().any(|a| a == *m))
        .map(|m| m.to_string())
        .collect();
    for model in available {
        if !candidates.contains(model) {
            candidates.push(model.clone());
        }
    }
    candidates
}

/// Model-not-found recovery: the built-in fallback list, then live models
/// with the llama family first. The configured model is never retried.
pub fn substitution_candidates(configured: &str, available: &[String]) -> Vec<String> {
    let mut candidates: Vec<String> = GROQ_FALLBACK_MODELS
        .iter()
        .copied()
        .filter(|m| *m != configured)
        .map(|m| m.to_string())
        .collect();

    let (llama, rest): (Vec<&String>, Vec<&String>) = available
        .iter()
        .filter(|m| m.as_str() != configured)
        .partition(|m| m.to_lowercase().contains("llama"));

    for model in llama.into_iter().chain(rest) {
        if !candidates.contains(model) {
            candidates.push(model.clone());
        }
    }
    candidates
}
