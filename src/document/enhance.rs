use std::fmt;

use clap::ValueEnum;

use super::DocumentError;
use crate::pipeline::prompt_templates::enhancer_prompts;
use crate::pipeline::structuring::SectionOrchestrator;

/// Free-text sections the enhancer can rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnhanceKind {
    ProblemStatement,
    CoreFeatures,
    PrimaryUserFlow,
}

impl EnhanceKind {
    /// Label used in the prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProblemStatement => "Problem Statement",
            Self::CoreFeatures => "Core Features",
            Self::PrimaryUserFlow => "Primary User Flow",
        }
    }
}

impl fmt::Display for EnhanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rewrite a user's rough notes into polished section text.
pub fn enhance_section(
    orchestrator: &SectionOrchestrator,
    kind: EnhanceKind,
    user_input: &str,
    max_output_tokens: u32,
) -> Result<String, DocumentError> {
    let input = user_input.trim();
    if input.is_empty() {
        return Err(DocumentError::InvalidInput("user_input is empty".into()));
    }

    let prompts = enhancer_prompts(kind.label(), input);
    let text = orchestrator.generate_text_section(
        &prompts.system,
        &prompts.user,
        kind.label(),
        max_output_tokens,
    )?;
    Ok(text)
}
