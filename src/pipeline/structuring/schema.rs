//! Typed records for the seven SRS sections.
//!
//! Extracted mappings are validated by deserializing into these records.
//! Required fields are enforced; unknown fields are tolerated so a model
//! adding an extra key does not cost a whole tier.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::ParsedObject;

// ──────────────────────────────────────────────
// Section identity
// ──────────────────────────────────────────────

/// The seven logical SRS content blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Introduction,
    OverallDescription,
    SystemFeatures,
    ExternalInterfaces,
    NonFunctionalRequirements,
    Glossary,
    Assumptions,
}

impl SectionKind {
    /// All sections in document order.
    pub fn all() -> &'static [SectionKind] {
        &[
            Self::Introduction,
            Self::OverallDescription,
            Self::SystemFeatures,
            Self::ExternalInterfaces,
            Self::NonFunctionalRequirements,
            Self::Glossary,
            Self::Assumptions,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::OverallDescription => "overall_description",
            Self::SystemFeatures => "system_features",
            Self::ExternalInterfaces => "external_interfaces",
            Self::NonFunctionalRequirements => "non_functional_requirements",
            Self::Glossary => "glossary",
            Self::Assumptions => "assumptions",
        }
    }

    /// Placeholder name under which this section's result is fed to later prompts.
    pub fn context_key(&self) -> &'static str {
        match self {
            Self::Introduction => "introduction_section",
            Self::OverallDescription => "overall_description_section",
            Self::SystemFeatures => "system_features_section",
            Self::ExternalInterfaces => "external_interfaces_section",
            Self::NonFunctionalRequirements => "nfr_section",
            Self::Glossary => "glossary_section",
            Self::Assumptions => "assumptions_section",
        }
    }

    /// Sections whose results this one consumes as prompt context.
    pub fn depends_on(&self) -> &'static [SectionKind] {
        match self {
            Self::Glossary | Self::Assumptions => &[
                Self::Introduction,
                Self::OverallDescription,
                Self::SystemFeatures,
                Self::NonFunctionalRequirements,
            ],
            _ => &[],
        }
    }

    /// Check a mapping against this section's record type.
    pub fn validate(&self, content: &ParsedObject) -> Result<(), String> {
        let value = Value::Object(content.clone());
        let result = match self {
            Self::Introduction => check::<IntroductionSection>(value),
            Self::OverallDescription => check::<OverallDescriptionSection>(value),
            Self::SystemFeatures => check::<SystemFeaturesSection>(value),
            Self::ExternalInterfaces => check::<ExternalInterfacesSection>(value),
            Self::NonFunctionalRequirements => check::<NonFunctionalRequirementsSection>(value),
            Self::Glossary => check::<GlossaryResponse>(value),
            Self::Assumptions => check::<AssumptionsSection>(value),
        };
        result.map_err(|e| e.to_string())
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn check<T: for<'de> Deserialize<'de>>(value: Value) -> Result<(), serde_json::Error> {
    serde_json::from_value::<T>(value).map(|_| ())
}

// ──────────────────────────────────────────────
// Shared
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitledText {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermDefinition {
    pub term: String,
    pub definition: String,
}

// ──────────────────────────────────────────────
// 1. Introduction
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntroductionSection {
    pub title: String,
    pub purpose: TitledText,
    pub intended_audience: IntendedAudience,
    pub project_scope: ProjectScope,
    #[serde(default)]
    pub definitions: Option<Definitions>,
    #[serde(default)]
    pub document_conventions: Option<DocumentConventions>,
    pub references: References,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntendedAudience {
    pub title: String,
    pub audience_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectScope {
    pub title: String,
    pub included: Vec<String>,
    pub excluded: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definitions {
    pub title: String,
    pub items: Vec<TermDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConventions {
    pub title: String,
    pub conventions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct References {
    pub title: String,
    pub references: Vec<ReferenceItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: String,
    pub description: String,
}

// ──────────────────────────────────────────────
// 2. Overall Description
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallDescriptionSection {
    pub title: String,
    pub product_perspective: TitledText,
    pub product_features: ProductFeatures,
    pub user_classes_and_characteristics: UserClasses,
    pub operating_environment: OperatingEnvironment,
    pub design_and_implementation_constraints: Constraints,
    pub user_documentation: UserDocumentation,
    pub assumptions_and_dependencies: AssumptionsAndDependencies,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductFeatures {
    pub title: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClasses {
    pub title: String,
    pub user_classes: Vec<UserClass>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClass {
    pub user_class: String,
    pub characteristics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingEnvironment {
    pub title: String,
    pub environments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraints {
    pub title: String,
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocumentation {
    pub title: String,
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssumptionsAndDependencies {
    pub title: String,
    pub assumptions: Vec<String>,
    pub dependencies: Vec<String>,
}

// ──────────────────────────────────────────────
// 3. System Features
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemFeaturesSection {
    pub title: String,
    pub features: Vec<SystemFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemFeature {
    pub feature_name: String,
    pub description: String,
    pub stimulus_response: Vec<StimulusResponse>,
    pub functional_requirements: Vec<FunctionalRequirement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StimulusResponse {
    pub stimulus: String,
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionalRequirement {
    pub description: String,
}

// ──────────────────────────────────────────────
// 4. External Interfaces
// ──────────────────────────────────────────────

/// Keys of the four diagram-bearing interface blocks.
pub const INTERFACE_KEYS: &[&str] = &[
    "user_interfaces",
    "hardware_interfaces",
    "software_interfaces",
    "communication_interfaces",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalInterfacesSection {
    pub title: String,
    pub user_interfaces: InterfaceSection,
    pub hardware_interfaces: InterfaceSection,
    pub software_interfaces: InterfaceSection,
    pub communication_interfaces: InterfaceSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceSection {
    pub title: String,
    pub description: String,
    pub interface_diagram: InterfaceDiagram,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDiagram {
    /// Always "mermaid".
    pub diagram_type: String,
    pub code: String,
}

// ──────────────────────────────────────────────
// 5. Non-Functional Requirements
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonFunctionalRequirementsSection {
    pub title: String,
    pub performance_requirements: RequirementGroup,
    pub safety_requirements: RequirementGroup,
    pub security_requirements: RequirementGroup,
    pub quality_attributes: RequirementGroup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementGroup {
    pub title: String,
    pub requirements: Vec<NonFunctionalRequirement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonFunctionalRequirement {
    pub description: String,
    pub rationale: String,
}

// ──────────────────────────────────────────────
// 6. Glossary / 7. Assumptions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryResponse {
    pub sections: Vec<GlossarySection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossarySection {
    pub title: String,
    pub terms: Vec<TermDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssumptionsSection {
    pub title: String,
    pub assumptions: Vec<AssumptionItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssumptionItem {
    pub description: String,
    pub impact: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> ParsedObject {
        value.as_object().cloned().unwrap()
    }

    fn interface(title: &str) -> Value {
        json!({
            "title": title,
            "description": "d",
            "interface_diagram": {"diagram_type": "mermaid", "code": "graph TD\nA-->B"}
        })
    }

    #[test]
    fn assumptions_minimal_object_validates() {
        let content = obj(json!({"title": "X", "assumptions": []}));
        assert!(SectionKind::Assumptions.validate(&content).is_ok());
    }

    #[test]
    fn missing_required_field_fails() {
        let content = obj(json!({"title": "X"}));
        let err = SectionKind::Assumptions.validate(&content).unwrap_err();
        assert!(err.contains("assumptions"));
    }

    #[test]
    fn wrong_nested_type_fails() {
        let content = obj(json!({"title": "X", "assumptions": [{"description": "only"}]}));
        assert!(SectionKind::Assumptions.validate(&content).is_err());
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let content = obj(json!({"title": "X", "assumptions": [], "notes": "extra"}));
        assert!(SectionKind::Assumptions.validate(&content).is_ok());
    }

    #[test]
    fn introduction_optional_blocks_may_be_absent() {
        let content = obj(json!({
            "title": "1. Introduction",
            "purpose": {"title": "1.1 Purpose", "description": "p"},
            "intended_audience": {"title": "1.2", "audience_groups": ["Developers"]},
            "project_scope": {"title": "1.3", "included": ["a"], "excluded": []},
            "references": {"title": "1.5", "references": [{"id": "R1", "description": "IEEE 830"}]}
        }));
        assert!(SectionKind::Introduction.validate(&content).is_ok());
    }

    #[test]
    fn external_interfaces_requires_all_four_blocks() {
        let mut full = json!({"title": "4. External Interfaces"});
        for key in INTERFACE_KEYS {
            full[*key] = interface(key);
        }
        assert!(SectionKind::ExternalInterfaces.validate(&obj(full.clone())).is_ok());

        full.as_object_mut().unwrap().remove("hardware_interfaces");
        assert!(SectionKind::ExternalInterfaces.validate(&obj(full)).is_err());
    }

    #[test]
    fn glossary_wraps_sections() {
        let content = obj(json!({
            "sections": [{"title": "Terms", "terms": [{"term": "SRS", "definition": "Software Requirements Specification"}]}]
        }));
        assert!(SectionKind::Glossary.validate(&content).is_ok());
        assert!(SectionKind::Glossary
            .validate(&obj(json!({"title": "Glossary", "terms": []})))
            .is_err());
    }

    #[test]
    fn only_glossary_and_assumptions_have_dependencies() {
        for kind in SectionKind::all() {
            let deps = kind.depends_on();
            match kind {
                SectionKind::Glossary | SectionKind::Assumptions => {
                    assert_eq!(deps.len(), 4);
                    assert!(!deps.contains(&SectionKind::ExternalInterfaces));
                }
                _ => assert!(deps.is_empty()),
            }
        }
    }

    #[test]
    fn display_and_serde_names_agree() {
        let json = serde_json::to_value(SectionKind::ExternalInterfaces).unwrap();
        assert_eq!(json, json!("external_interfaces"));
        assert_eq!(SectionKind::ExternalInterfaces.to_string(), "external_interfaces");
        assert_eq!(SectionKind::all().len(), 7);
    }
}
