use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::SectionKind;
use super::StructuringError;

/// A structured mapping recovered from model output.
pub type ParsedObject = Map<String, Value>;

/// One generation attempt. Built fresh for every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub system_text: String,
    pub user_text: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Ask the provider for machine-readable output (JSON mode / MIME hint).
    pub expect_structured: bool,
}

impl GenerationRequest {
    pub fn structured(system_text: &str, user_text: &str, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            system_text: system_text.to_string(),
            user_text: user_text.to_string(),
            temperature,
            max_output_tokens,
            expect_structured: true,
        }
    }

    pub fn text(system_text: &str, user_text: &str, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            expect_structured: false,
            ..Self::structured(system_text, user_text, temperature, max_output_tokens)
        }
    }
}

/// A generated section, owned by the caller once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionResult {
    pub section: SectionKind,
    pub content: ParsedObject,
}

impl SectionResult {
    /// Deserialize the mapping into its typed record.
    pub fn typed<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.content.clone()))
    }
}

/// Text-generation backend abstraction (allows mocking).
///
/// Each implementation fixes its provider and model at construction time.
pub trait LlmClient: Send + Sync {
    /// Short provider name for logs ("groq", "gemini", ...).
    fn provider(&self) -> &str;

    fn complete(&self, request: &GenerationRequest) -> Result<String, StructuringError>;
}

impl<T: LlmClient + ?Sized> LlmClient for Box<T> {
    fn provider(&self) -> &str {
        (**self).provider()
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, StructuringError> {
        (**self).complete(request)
    }
}

impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    fn provider(&self) -> &str {
        (**self).provider()
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, StructuringError> {
        (**self).complete(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_request_disables_structured_mode() {
        let req = GenerationRequest::text("sys", "user", 0.2, 512);
        assert!(!req.expect_structured);
        assert_eq!(req.system_text, "sys");
        assert_eq!(req.max_output_tokens, 512);
    }

    #[test]
    fn section_result_typed_roundtrip() {
        let content = json!({"title": "Assumptions", "assumptions": []});
        let result = SectionResult {
            section: SectionKind::Assumptions,
            content: content.as_object().cloned().unwrap(),
        };
        let typed: super::super::schema::AssumptionsSection = result.typed().unwrap();
        assert_eq!(typed.title, "Assumptions");
        assert!(typed.assumptions.is_empty());
    }
}
