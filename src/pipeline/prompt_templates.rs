//! Section prompt templates and placeholder substitution.
//!
//! Every section has a built-in `(system, user)` pair. User templates carry
//! `{user_inputs}` and, for Glossary and Assumptions, the context sections
//! (`{introduction_section}`, `{overall_description_section}`,
//! `{system_features_section}`, `{nfr_section}`). System prompts embed their
//! JSON example inside a fenced block so [`compact_prompt`] can drop it.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::pipeline::structuring::SectionKind;

/// Placeholder for the raw project description.
pub const USER_INPUTS_VAR: &str = "user_inputs";

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Rendered prompts for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

// ═══════════════════════════════════════════════════════════
// System prompts
// ═══════════════════════════════════════════════════════════

const INTRODUCTION_SYSTEM: &str = r#"You write the Introduction section of an IEEE-style Software Requirements Specification.
Return one JSON object with exactly these keys: title, purpose, intended_audience,
project_scope, definitions, document_conventions, references.
definitions and document_conventions may be null when not applicable; every other key is required.

```json
{
  "title": "1. Introduction",
  "purpose": {"title": "1.1 Purpose", "description": "..."},
  "intended_audience": {"title": "1.2 Intended Audience", "audience_groups": ["Developers"]},
  "project_scope": {"title": "1.3 Project Scope", "included": ["..."], "excluded": ["..."]},
  "definitions": null,
  "document_conventions": null,
  "references": {"title": "1.4 References", "references": [{"id": "[REF-1]", "description": "IEEE 830-1998"}]}
}
```

Use only facts present in the project inputs. Output ONLY the JSON object."#;

const OVERALL_DESCRIPTION_SYSTEM: &str = r#"You write the Overall Description section of an IEEE-style Software Requirements Specification.
Derive product perspective, features, user classes, operating environment, constraints,
user documentation, assumptions and dependencies from the project inputs.
Map every target user to a user class with concrete characteristics.

```json
{
  "title": "2. Overall Description",
  "product_perspective": {"title": "2.1 Product Perspective", "description": "..."},
  "product_features": {"title": "2.2 Product Features", "features": ["..."]},
  "user_classes_and_characteristics": {"title": "2.3 User Classes and Characteristics", "user_classes": [{"user_class": "...", "characteristics": ["..."]}]},
  "operating_environment": {"title": "2.4 Operating Environment", "environments": ["..."]},
  "design_and_implementation_constraints": {"title": "2.5 Design and Implementation Constraints", "constraints": ["..."]},
  "user_documentation": {"title": "2.6 User Documentation", "documents": ["..."]},
  "assumptions_and_dependencies": {"title": "2.7 Assumptions and Dependencies", "assumptions": ["..."], "dependencies": ["..."]}
}
```

Do not invent features that contradict the inputs. Output ONLY the JSON object."#;

const SYSTEM_FEATURES_SYSTEM: &str = r#"You write the System Features section of an IEEE-style Software Requirements Specification.
Produce one entry per core feature in the project inputs, each with a description,
stimulus/response pairs, and atomic functional requirements.

```json
{
  "title": "System Features",
  "features": [
    {
      "feature_name": "...",
      "description": "...",
      "stimulus_response": [{"stimulus": "...", "response": "..."}],
      "functional_requirements": [{"description": "The system shall ..."}]
    }
  ]
}
```

Output ONLY the JSON object."#;

const EXTERNAL_INTERFACES_SYSTEM: &str = r#"You write the External Interface Requirements section of an IEEE-style Software Requirements Specification.
Cover user, hardware, software and communication interfaces. Each block has a title,
a description and an interface_diagram whose code is a Mermaid diagram.
Diagrams must start with a diagram type such as "graph TD", use only --> arrows,
and keep every bracket balanced. Put the Mermaid text in the JSON string; no code fences.

```json
{
  "title": "4. External Interface Requirements",
  "user_interfaces": {"title": "4.1 User Interfaces", "description": "...", "interface_diagram": {"diagram_type": "mermaid", "code": "graph TD\n    U[User] --> W[Web App]"}},
  "hardware_interfaces": {"title": "4.2 Hardware Interfaces", "description": "...", "interface_diagram": {"diagram_type": "mermaid", "code": "..."}},
  "software_interfaces": {"title": "4.3 Software Interfaces", "description": "...", "interface_diagram": {"diagram_type": "mermaid", "code": "..."}},
  "communication_interfaces": {"title": "4.4 Communication Interfaces", "description": "...", "interface_diagram": {"diagram_type": "mermaid", "code": "..."}}
}
```

If the inputs say little about an interface, state that details are to be defined during
technical design and give a minimal diagram. Output ONLY the JSON object."#;

const NFR_SYSTEM: &str = r#"You write the Non-Functional Requirements section of an IEEE-style Software Requirements Specification.
Group requirements into performance, safety, security and quality attributes. Each requirement
has a measurable description and a rationale. A group with nothing to say keeps an empty list.

```json
{
  "title": "Non-Functional Requirements",
  "performance_requirements": {"title": "Performance Requirements", "requirements": [{"description": "...", "rationale": "..."}]},
  "safety_requirements": {"title": "Safety Requirements", "requirements": []},
  "security_requirements": {"title": "Security Requirements", "requirements": [{"description": "...", "rationale": "..."}]},
  "quality_attributes": {"title": "Quality Attributes", "requirements": [{"description": "...", "rationale": "..."}]}
}
```

Output ONLY the JSON object."#;

const GLOSSARY_SYSTEM: &str = r#"You write the Glossary of an IEEE-style Software Requirements Specification.
Collect domain terms, acronyms and technical terms used in the project inputs and the
already-written sections. Group them into titled sections; define each term in one sentence.

```json
{
  "sections": [
    {"title": "Domain Terms", "terms": [{"term": "...", "definition": "..."}]},
    {"title": "Acronyms", "terms": [{"term": "API", "definition": "Application Programming Interface."}]}
  ]
}
```

Output ONLY the JSON object."#;

const ASSUMPTIONS_SYSTEM: &str = r#"You write the Assumptions section of an IEEE-style Software Requirements Specification.
Identify technical, operational and business assumptions behind the project inputs and the
already-written sections. For each, state the assumption and the impact if it proves false.

```json
{
  "title": "Assumptions",
  "assumptions": [{"description": "...", "impact": "..."}]
}
```

An empty assumptions list is allowed. Output ONLY the JSON object."#;

/// System prompt for a section.
pub fn system_prompt(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Introduction => INTRODUCTION_SYSTEM,
        SectionKind::OverallDescription => OVERALL_DESCRIPTION_SYSTEM,
        SectionKind::SystemFeatures => SYSTEM_FEATURES_SYSTEM,
        SectionKind::ExternalInterfaces => EXTERNAL_INTERFACES_SYSTEM,
        SectionKind::NonFunctionalRequirements => NFR_SYSTEM,
        SectionKind::Glossary => GLOSSARY_SYSTEM,
        SectionKind::Assumptions => ASSUMPTIONS_SYSTEM,
    }
}

// ═══════════════════════════════════════════════════════════
// User templates
// ═══════════════════════════════════════════════════════════

const CONTEXT_USER_TEMPLATE: &str = "\
Project inputs:
{user_inputs}

Introduction section:
{introduction_section}

Overall Description section:
{overall_description_section}

System Features section:
{system_features_section}

Non-Functional Requirements section:
{nfr_section}

";

/// User template for a section.
pub fn user_template(kind: SectionKind) -> String {
    let task = match kind {
        SectionKind::Introduction => "Generate the Introduction section.",
        SectionKind::OverallDescription => "Generate the Overall Description section.",
        SectionKind::SystemFeatures => "Generate the System Features section.",
        SectionKind::ExternalInterfaces => "Generate the External Interface Requirements section.",
        SectionKind::NonFunctionalRequirements => "Generate the Non-Functional Requirements section.",
        SectionKind::Glossary => "Generate the Glossary from all of the content above.",
        SectionKind::Assumptions => "Generate the Assumptions section from all of the content above.",
    };

    if kind.depends_on().is_empty() {
        format!("Project inputs:\n{{{USER_INPUTS_VAR}}}\n\n{task}")
    } else {
        format!("{CONTEXT_USER_TEMPLATE}{task}")
    }
}

/// Render both prompts for `kind`. With `compact`, the system prompt loses
/// its fenced example.
pub fn section_prompts(kind: SectionKind, vars: &Map<String, Value>, compact: bool) -> PromptPair {
    let system = if compact {
        compact_prompt(system_prompt(kind))
    } else {
        system_prompt(kind).to_string()
    };
    PromptPair {
        system,
        user: substitute_vars(&user_template(kind), vars),
    }
}

// ═══════════════════════════════════════════════════════════
// Section enhancer (free text)
// ═══════════════════════════════════════════════════════════

const ENHANCER_SYSTEM: &str = "\
You are a software architect and business analyst who writes IEEE-style SRS content. \
You turn short or unstructured notes into clear, professional text while keeping the \
original intent. Never add features, actors, metrics or constraints the notes do not mention. \
Never include headings, explanations, code fences or references to yourself.";

const ENHANCER_USER_TEMPLATE: &str = "\
section_type: {section_type}

user_input: {user_input}

Formatting by section_type:
- Problem Statement: one or two short paragraphs describing the problem, current pain points and the need for software. No feature lists.
- Core Features: a hyphen bullet list, one essential capability per bullet.
- Primary User Flow: a numbered list (1., 2., 3., ...) from start to successful completion.

Return ONLY the enhanced content.";

/// Prompts for the free-text section enhancer.
pub fn enhancer_prompts(section_type: &str, user_input: &str) -> PromptPair {
    let mut vars = Map::new();
    vars.insert("section_type".into(), Value::String(section_type.to_string()));
    vars.insert("user_input".into(), Value::String(user_input.to_string()));
    PromptPair {
        system: ENHANCER_SYSTEM.to_string(),
        user: substitute_vars(ENHANCER_USER_TEMPLATE, &vars),
    }
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```[\s\S]*?```").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Replace exact `{name}` tokens. Other braces (JSON examples) are left alone.
///
/// Objects and arrays are inserted as compact JSON, `null` as the empty
/// string, strings verbatim, other scalars in their JSON text form.
pub fn substitute_vars(template: &str, vars: &Map<String, Value>) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        let token = format!("{{{key}}}");
        if !out.contains(&token) {
            continue;
        }
        let replacement = match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out = out.replace(&token, &replacement);
    }
    out
}

/// Drop fenced blocks and collapse runs of blank lines.
pub fn compact_prompt(text: &str) -> String {
    let without_fences = FENCED_BLOCK.replace_all(text, "");
    BLANK_RUN
        .replace_all(&without_fences, "\n\n")
        .trim()
        .to_string()
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
