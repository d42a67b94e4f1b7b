use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::diagrams::{render_interface_diagrams, sanitize_interface_diagrams, DiagramRenderer};
use super::DocumentError;
use crate::config::DEFAULT_MAX_OUTPUT_TOKENS;
use crate::pipeline::prompt_templates::{section_prompts, USER_INPUTS_VAR};
use crate::pipeline::structuring::{
    SectionKind, SectionOrchestrator, SectionResult, StructuringError,
};

/// Fallback when the input has no `project_identity.project_name`.
pub const UNTITLED_PROJECT: &str = "Untitled Project";

/// Sections that only need the user's inputs.
const INDEPENDENT_SECTIONS: &[SectionKind] = &[
    SectionKind::Introduction,
    SectionKind::OverallDescription,
    SectionKind::SystemFeatures,
    SectionKind::ExternalInterfaces,
    SectionKind::NonFunctionalRequirements,
];

/// Sections built from the independent ones.
const CONTEXT_SECTIONS: &[SectionKind] = &[SectionKind::Glossary, SectionKind::Assumptions];

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Run each phase's sections on scoped threads.
    pub concurrent: bool,
    /// Strip worked examples from system prompts.
    pub compact_prompts: bool,
    pub max_output_tokens: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            concurrent: true,
            compact_prompts: false,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

/// A fully generated SRS: seven validated sections plus build metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SrsDocument {
    pub build_id: Uuid,
    pub project_name: String,
    /// `project_identity.author`, a single name or a list.
    pub authors: Vec<String>,
    pub organization: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub provider: String,
    /// Document order.
    pub sections: Vec<SectionResult>,
    /// Interface keys whose diagram was replaced by the placeholder.
    pub diagram_placeholders: Vec<String>,
    /// Interface key → rendered image.
    pub diagram_images: BTreeMap<String, PathBuf>,
}

impl SrsDocument {
    pub fn section(&self, kind: SectionKind) -> Option<&SectionResult> {
        self.sections.iter().find(|s| s.section == kind)
    }

    /// Render interface diagrams into `out_dir`. Failed renders are skipped.
    pub fn render_diagrams(&mut self, renderer: &dyn DiagramRenderer, out_dir: &Path) {
        let Some(interfaces) = self.section(SectionKind::ExternalInterfaces) else {
            return;
        };
        let images =
            render_interface_diagrams(renderer, &interfaces.content, &self.project_name, out_dir);
        self.diagram_images = images;
    }
}

/// Generates all seven sections through one orchestrator.
pub struct DocumentBuilder {
    orchestrator: SectionOrchestrator,
    options: BuildOptions,
}

impl DocumentBuilder {
    pub fn new(orchestrator: SectionOrchestrator, options: BuildOptions) -> Self {
        Self {
            orchestrator,
            options,
        }
    }

    /// Build the document from the user's project description.
    ///
    /// Phase one generates the five independent sections. Their results are
    /// substituted into the Glossary and Assumptions prompts for phase two.
    /// The first failing section in document order aborts the build.
    pub fn build(&self, user_inputs: &Value) -> Result<SrsDocument, DocumentError> {
        let Some(inputs) = user_inputs.as_object() else {
            return Err(DocumentError::InvalidInput(
                "project description must be a JSON object".into(),
            ));
        };
        let project_name = project_name(inputs);

        let _span = tracing::info_span!(
            "build_document",
            project = %project_name,
            provider = self.orchestrator.provider(),
            concurrent = self.options.concurrent
        )
        .entered();
        let started = std::time::Instant::now();

        let mut vars = Map::new();
        vars.insert(USER_INPUTS_VAR.to_string(), user_inputs.clone());

        let mut sections = self.generate_phase(INDEPENDENT_SECTIONS, &vars)?;
        for result in &sections {
            vars.insert(
                result.section.context_key().to_string(),
                Value::Object(result.content.clone()),
            );
        }
        tracing::info!(sections = sections.len(), "Independent sections generated");

        sections.extend(self.generate_phase(CONTEXT_SECTIONS, &vars)?);

        let mut diagram_placeholders = Vec::new();
        if let Some(interfaces) = sections
            .iter_mut()
            .find(|s| s.section == SectionKind::ExternalInterfaces)
        {
            diagram_placeholders = sanitize_interface_diagrams(&mut interfaces.content);
        }

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            placeholders = diagram_placeholders.len(),
            "Document built"
        );

        Ok(SrsDocument {
            build_id: Uuid::new_v4(),
            project_name,
            authors: authors(inputs),
            organization: identity_text(inputs, "organization").map(str::to_string),
            generated_at: Utc::now(),
            provider: self.orchestrator.provider().to_string(),
            sections,
            diagram_placeholders,
            diagram_images: BTreeMap::new(),
        })
    }

    fn generate_phase(
        &self,
        kinds: &[SectionKind],
        vars: &Map<String, Value>,
    ) -> Result<Vec<SectionResult>, DocumentError> {
        let outcomes: Vec<Result<SectionResult, StructuringError>> = if self.options.concurrent {
            thread::scope(|scope| {
                let handles: Vec<_> = kinds
                    .iter()
                    .map(|&kind| (kind, scope.spawn(move || self.generate_one(kind, vars))))
                    .collect();
                handles
                    .into_iter()
                    .map(|(kind, handle)| {
                        handle.join().unwrap_or_else(|_| {
                            Err(StructuringError::SectionFailed {
                                section: kind.to_string(),
                                detail: "worker thread panicked".into(),
                            })
                        })
                    })
                    .collect()
            })
        } else {
            kinds.iter().map(|&kind| self.generate_one(kind, vars)).collect()
        };

        // Collecting into Result keeps the first error in document order.
        let results = outcomes.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(results)
    }

    fn generate_one(
        &self,
        kind: SectionKind,
        vars: &Map<String, Value>,
    ) -> Result<SectionResult, StructuringError> {
        let prompts = section_prompts(kind, vars, self.options.compact_prompts);
        self.orchestrator.generate_structured_section(
            &prompts.system,
            &prompts.user,
            kind,
            self.options.max_output_tokens,
        )
    }
}

fn project_name(inputs: &Map<String, Value>) -> String {
    identity_text(inputs, "project_name")
        .unwrap_or(UNTITLED_PROJECT)
        .to_string()
}

fn identity_text<'a>(inputs: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    inputs
        .get("project_identity")
        .and_then(|identity| identity.get(key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

fn authors(inputs: &Map<String, Value>) -> Vec<String> {
    let names = match inputs.get("project_identity").and_then(|i| i.get("author")) {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
