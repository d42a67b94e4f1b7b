use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::{json, Value};

use super::schema::SectionKind;
use super::types::{GenerationRequest, LlmClient};
use super::StructuringError;
use crate::pipeline::prompt_templates::{compact_prompt, system_prompt};

/// Mock LLM client that replays a script of replies in order and records
/// every request it receives. An exhausted script answers with a provider error.
pub struct ScriptedLlmClient {
    provider: String,
    replies: Mutex<VecDeque<Result<String, StructuringError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: Vec<Result<String, StructuringError>>) -> Self {
        Self::named("mock", replies)
    }

    pub fn named(provider: &str, replies: Vec<Result<String, StructuringError>>) -> Self {
        Self {
            provider: provider.to_string(),
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LlmClient for ScriptedLlmClient {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, StructuringError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(StructuringError::Provider("script exhausted".into())))
    }
}

/// A schema-valid mapping for each section.
pub fn sample_section(kind: SectionKind) -> Value {
    fn interface(title: &str, code: &str) -> Value {
        json!({
            "title": title,
            "description": format!("{title} overview"),
            "interface_diagram": {"diagram_type": "mermaid", "code": code}
        })
    }

    match kind {
        SectionKind::Introduction => json!({
            "title": "1. Introduction",
            "purpose": {"title": "1.1 Purpose", "description": "Hiring assistant."},
            "intended_audience": {"title": "1.2 Intended Audience", "audience_groups": ["Recruiters"]},
            "project_scope": {"title": "1.3 Project Scope", "included": ["Screening"], "excluded": ["Payroll"]},
            "references": {"title": "1.6 References", "references": [{"id": "R1", "description": "IEEE 830"}]}
        }),
        SectionKind::OverallDescription => json!({
            "title": "2. Overall Description",
            "product_perspective": {"title": "2.1 Product Perspective", "description": "Standalone web app."},
            "product_features": {"title": "2.2 Product Features", "features": ["Resume parsing"]},
            "user_classes_and_characteristics": {
                "title": "2.3 User Classes",
                "user_classes": [{"user_class": "Recruiter", "characteristics": ["Non-technical"]}]
            },
            "operating_environment": {"title": "2.4 Operating Environment", "environments": ["Browser"]},
            "design_and_implementation_constraints": {"title": "2.5 Constraints", "constraints": ["GDPR"]},
            "user_documentation": {"title": "2.6 User Documentation", "documents": ["Guide"]},
            "assumptions_and_dependencies": {
                "title": "2.7 Assumptions and Dependencies",
                "assumptions": ["Stable internet"],
                "dependencies": ["Email service"]
            }
        }),
        SectionKind::SystemFeatures => json!({
            "title": "3. System Features",
            "features": [{
                "feature_name": "Resume Screening",
                "description": "Ranks applicants.",
                "stimulus_response": [{"stimulus": "Upload", "response": "Score shown"}],
                "functional_requirements": [{"description": "The system shall parse PDF resumes."}]
            }]
        }),
        SectionKind::ExternalInterfaces => json!({
            "title": "4. External Interface Requirements",
            "user_interfaces": interface("4.1 User Interfaces", "```mermaid\nA[Recruiter] ----> B[Dashboard]\n```"),
            "hardware_interfaces": interface("4.2 Hardware Interfaces", "I cannot draw this."),
            "software_interfaces": interface("4.3 Software Interfaces", "graph LR\nApp --> DB"),
            "communication_interfaces": interface("4.4 Communication Interfaces", "sequenceDiagram\nC->>S: HTTPS")
        }),
        SectionKind::NonFunctionalRequirements => {
            let group = |title: &str| {
                json!({"title": title, "requirements": [{"description": "Fast.", "rationale": "UX."}]})
            };
            json!({
                "title": "5. Other Nonfunctional Requirements",
                "performance_requirements": group("5.1 Performance Requirements"),
                "safety_requirements": group("5.2 Safety Requirements"),
                "security_requirements": group("5.3 Security Requirements"),
                "quality_attributes": group("5.4 Software Quality Attributes")
            })
        }
        SectionKind::Glossary => json!({
            "sections": [{"title": "Glossary", "terms": [{"term": "ATS", "definition": "Applicant tracking system."}]}]
        }),
        SectionKind::Assumptions => json!({
            "title": "Assumptions",
            "assumptions": [{"description": "Recruiters have accounts.", "impact": "Onboarding needed."}]
        }),
    }
}

/// Answers each request with the sample mapping of the section its system
/// prompt belongs to. Sections listed in `failing` get prose instead.
pub struct SectionRouter {
    failing: Vec<SectionKind>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl SectionRouter {
    pub fn new() -> Self {
        Self::failing(&[])
    }

    pub fn failing(kinds: &[SectionKind]) -> Self {
        Self {
            failing: kinds.to_vec(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose system prompt belongs to `kind`.
    pub fn requests_for(&self, kind: SectionKind) -> Vec<GenerationRequest> {
        self.requests()
            .into_iter()
            .filter(|r| route(&r.system_text) == Some(kind))
            .collect()
    }
}

fn route(system_text: &str) -> Option<SectionKind> {
    SectionKind::all().iter().copied().find(|kind| {
        let full = system_prompt(*kind);
        system_text.starts_with(full.trim_end()) || system_text.starts_with(&compact_prompt(full))
    })
}

impl LlmClient for SectionRouter {
    fn provider(&self) -> &str {
        "router"
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, StructuringError> {
        self.requests.lock().unwrap().push(request.clone());
        match route(&request.system_text) {
            Some(kind) if !self.failing.contains(&kind) => {
                Ok(format!("Here you go:\n```json\n{}\n```", sample_section(kind)))
            }
            Some(_) => Ok("I could not produce that section.".into()),
            None => Ok("no section recognised".into()),
        }
    }
}
