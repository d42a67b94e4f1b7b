use super::extract::extract_json_object;
use super::prompt::{build_reinforced_system_prompt, build_repair_prompt, REPAIR_SYSTEM_PROMPT};
use super::schema::SectionKind;
use super::types::{GenerationRequest, LlmClient, ParsedObject, SectionResult};
use super::StructuringError;

/// Default sampling temperature for section generation.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Escalation steps for one structured section, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// The section prompt as written.
    Direct,
    /// Same user text, system prompt with strict JSON constraints appended.
    Reinforced,
    /// Previous raw output sent back with a repair instruction.
    Repair,
}

impl Tier {
    pub fn number(self) -> u8 {
        match self {
            Self::Direct => 1,
            Self::Reinforced => 2,
            Self::Repair => 3,
        }
    }
}

/// Drives section generation over a single backend:
/// prompt → LLM → extract → validate, escalating through the tiers.
pub struct SectionOrchestrator {
    llm: Box<dyn LlmClient>,
    temperature: f32,
}

impl SectionOrchestrator {
    pub fn new(llm: Box<dyn LlmClient>) -> Self {
        Self::with_temperature(llm, DEFAULT_TEMPERATURE)
    }

    pub fn with_temperature(llm: Box<dyn LlmClient>, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    pub fn provider(&self) -> &str {
        self.llm.provider()
    }

    /// Generate one structured section.
    ///
    /// Credential and configuration errors return at once. Any other failure
    /// moves on to the next tier; when all tiers are spent the result is
    /// [`StructuringError::SectionFailed`] naming the section.
    pub fn generate_structured_section(
        &self,
        system_text: &str,
        user_text: &str,
        section: SectionKind,
        max_output_tokens: u32,
    ) -> Result<SectionResult, StructuringError> {
        let _span = tracing::info_span!(
            "generate_section",
            section = %section,
            provider = self.llm.provider()
        )
        .entered();

        let mut state = EscalationState::default();

        let direct =
            GenerationRequest::structured(system_text, user_text, self.temperature, max_output_tokens);
        if let Some(content) = self.attempt(Tier::Direct, &direct, section, &mut state)? {
            return Ok(SectionResult { section, content });
        }

        let reinforced_system = build_reinforced_system_prompt(system_text);
        let reinforced = GenerationRequest::structured(
            &reinforced_system,
            user_text,
            self.temperature,
            max_output_tokens,
        );
        if let Some(content) = self.attempt(Tier::Reinforced, &reinforced, section, &mut state)? {
            return Ok(SectionResult { section, content });
        }

        match state.last_raw.take() {
            Some(raw) => {
                let repair = GenerationRequest::structured(
                    REPAIR_SYSTEM_PROMPT,
                    &build_repair_prompt(&raw),
                    self.temperature,
                    max_output_tokens,
                );
                if let Some(content) = self.attempt(Tier::Repair, &repair, section, &mut state)? {
                    return Ok(SectionResult { section, content });
                }
            }
            None => {
                tracing::warn!("No raw output to repair, skipping repair tier");
            }
        }

        let detail = match state.last_error {
            Some(e) => format!(
                "no valid JSON object after {} tier(s); last error: {e}",
                state.tiers_run
            ),
            None => format!("no valid JSON object after {} tier(s)", state.tiers_run),
        };
        tracing::error!(tiers = state.tiers_run, "Section generation failed");
        Err(StructuringError::SectionFailed {
            section: section.to_string(),
            detail,
        })
    }

    /// Single free-text call. Blank output is an error.
    pub fn generate_text_section(
        &self,
        system_text: &str,
        user_text: &str,
        label: &str,
        max_output_tokens: u32,
    ) -> Result<String, StructuringError> {
        let _span = tracing::info_span!("generate_text", section = label).entered();

        let request =
            GenerationRequest::text(system_text, user_text, self.temperature, max_output_tokens);
        let raw = self.llm.complete(&request)?;
        let text = raw.trim();
        if text.is_empty() {
            tracing::warn!("LLM returned blank text");
            return Err(StructuringError::EmptyResponse {
                section: label.to_string(),
            });
        }

        tracing::info!(response_len = text.len(), "Text section generated");
        Ok(text.to_string())
    }

    /// Run one tier. `Ok(None)` means escalate.
    fn attempt(
        &self,
        tier: Tier,
        request: &GenerationRequest,
        section: SectionKind,
        state: &mut EscalationState,
    ) -> Result<Option<ParsedObject>, StructuringError> {
        state.tiers_run += 1;

        let raw = match self.llm.complete(request) {
            Ok(raw) => raw,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(tier = tier.number(), error = %e, "LLM call failed, escalating");
                state.last_error = Some(e);
                return Ok(None);
            }
        };

        let extracted = extract_json_object(&raw);
        let response_len = raw.len();
        state.last_raw = Some(raw);

        let Some(content) = extracted else {
            tracing::warn!(
                tier = tier.number(),
                response_len,
                "No JSON object in response, escalating"
            );
            return Ok(None);
        };

        if let Err(reason) = section.validate(&content) {
            tracing::warn!(
                tier = tier.number(),
                reason = %reason,
                "Extracted object failed schema validation, escalating"
            );
            return Ok(None);
        }

        tracing::info!(tier = tier.number(), "Section generated");
        Ok(Some(content))
    }
}

#[derive(Default)]
struct EscalationState {
    last_raw: Option<String>,
    last_error: Option<StructuringError>,
    tiers_run: usize,
}
