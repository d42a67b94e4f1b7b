use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use serde_json::{json, Map, Value};

use super::builder::SrsDocument;
use super::diagrams::file_slug;
use super::DocumentError;
use crate::config::{APP_NAME, APP_VERSION};
use crate::pipeline::structuring::SectionKind;

/// Persists a built document. Returns the written file's path.
pub trait DocumentWriter {
    fn write(&self, doc: &SrsDocument, out_dir: &Path) -> Result<PathBuf, DocumentError>;
}

// ═══════════════════════════════════════════════════════════
// JSON
// ═══════════════════════════════════════════════════════════

/// Writes `<project>_srs.json`.
#[derive(Debug, Default)]
pub struct JsonDocumentWriter;

impl JsonDocumentWriter {
    pub fn to_value(doc: &SrsDocument) -> Value {
        let mut sections = Map::new();
        for result in &doc.sections {
            sections.insert(
                result.section.context_key().to_string(),
                Value::Object(result.content.clone()),
            );
        }
        let images: Map<String, Value> = doc
            .diagram_images
            .iter()
            .map(|(key, path)| (key.clone(), Value::String(path.display().to_string())))
            .collect();

        json!({
            "metadata": {
                "build_id": doc.build_id,
                "project_name": doc.project_name,
                "authors": doc.authors,
                "organization": doc.organization,
                "generated_at": doc.generated_at,
                "provider": doc.provider,
                "generator": format!("{APP_NAME} {APP_VERSION}"),
            },
            "sections": sections,
            "diagram_placeholders": doc.diagram_placeholders,
            "diagram_images": images,
        })
    }
}

impl DocumentWriter for JsonDocumentWriter {
    fn write(&self, doc: &SrsDocument, out_dir: &Path) -> Result<PathBuf, DocumentError> {
        fs::create_dir_all(out_dir)?;
        let path = out_dir.join(format!("{}_srs.json", file_slug(&doc.project_name)));
        let text = serde_json::to_string_pretty(&Self::to_value(doc))?;
        fs::write(&path, text)?;
        tracing::info!(path = %path.display(), "SRS JSON written");
        Ok(path)
    }
}

// ═══════════════════════════════════════════════════════════
// Markdown
// ═══════════════════════════════════════════════════════════

/// Writes `<project>_srs.md` in the IEEE section layout.
#[derive(Debug, Default)]
pub struct MarkdownDocumentWriter;

impl DocumentWriter for MarkdownDocumentWriter {
    fn write(&self, doc: &SrsDocument, out_dir: &Path) -> Result<PathBuf, DocumentError> {
        fs::create_dir_all(out_dir)?;
        let path = out_dir.join(format!("{}_srs.md", file_slug(&doc.project_name)));
        fs::write(&path, render_markdown(doc))?;
        tracing::info!(path = %path.display(), "SRS Markdown written");
        Ok(path)
    }
}

/// Render the whole document. Missing fields fall back to default headings
/// or are skipped.
pub fn render_markdown(doc: &SrsDocument) -> String {
    let mut md = Markdown::default();

    md.line("# Software Requirements Specification");
    md.blank();
    md.line(&format!("**for {}**", doc.project_name));
    md.blank();
    if !doc.authors.is_empty() {
        md.line(&format!("Prepared by {}", doc.authors.join(", ")));
        md.blank();
    }
    if let Some(organization) = &doc.organization {
        md.line(&format!("Organization: {organization}"));
        md.blank();
    }
    md.line(&format!("Date Created: {}", doc.generated_at.format("%m/%d/%Y")));
    md.blank();

    let content = |kind: SectionKind| doc.section(kind).map(|s| &s.content).unwrap_or(&*EMPTY);

    introduction(&mut md, content(SectionKind::Introduction));
    overall_description(&mut md, content(SectionKind::OverallDescription));
    system_features(&mut md, content(SectionKind::SystemFeatures));
    external_interfaces(&mut md, content(SectionKind::ExternalInterfaces), doc);
    non_functional(&mut md, content(SectionKind::NonFunctionalRequirements));
    glossary(&mut md, content(SectionKind::Glossary));
    assumptions(&mut md, content(SectionKind::Assumptions));

    md.finish()
}

fn introduction(md: &mut Markdown, s: &Map<String, Value>) {
    md.heading(1, text_or(s, "title", "1. Introduction"));

    let purpose = obj(s, "purpose");
    md.heading(2, text_or(purpose, "title", "1.1 Purpose"));
    md.paragraph(text_or(purpose, "description", ""));

    let audience = obj(s, "intended_audience");
    md.heading(2, text_or(audience, "title", "1.2 Intended Audience"));
    md.bullets(strings(audience, "audience_groups"));

    let scope = obj(s, "project_scope");
    md.heading(2, text_or(scope, "title", "1.3 Project Scope"));
    let included = strings(scope, "included");
    if !included.is_empty() {
        md.label("In Scope:");
        md.bullets(included);
    }
    let excluded = strings(scope, "excluded");
    if !excluded.is_empty() {
        md.label("Out of Scope:");
        md.bullets(excluded);
    }

    if let Some(definitions) = s.get("definitions").and_then(Value::as_object) {
        md.heading(2, text_or(definitions, "title", "Definitions"));
        for item in objects(definitions, "items") {
            md.term(text_or(item, "term", ""), text_or(item, "definition", ""));
        }
    }

    let conventions = obj(s, "document_conventions");
    md.heading(2, text_or(conventions, "title", "1.4 Document Conventions"));
    md.bullets(strings(conventions, "conventions"));

    let references = obj(s, "references");
    md.heading(2, text_or(references, "title", "1.5 References"));
    let refs: Vec<String> = objects(references, "references")
        .map(|r| format!("[{}] {}", text_or(r, "id", ""), text_or(r, "description", "")))
        .collect();
    md.bullets(refs.iter().map(String::as_str).collect());
}

fn overall_description(md: &mut Markdown, s: &Map<String, Value>) {
    md.heading(1, text_or(s, "title", "2. Overall Description"));

    let perspective = obj(s, "product_perspective");
    md.heading(2, text_or(perspective, "title", "2.1 Product Perspective"));
    md.paragraph(text_or(perspective, "description", ""));

    let features = obj(s, "product_features");
    md.heading(2, text_or(features, "title", "2.2 Product Features"));
    md.bullets(strings(features, "features"));

    let classes = obj(s, "user_classes_and_characteristics");
    md.heading(2, text_or(classes, "title", "2.3 User Classes and Characteristics"));
    for class in objects(classes, "user_classes") {
        md.label(&format!("{}:", text_or(class, "user_class", "")));
        md.bullets(strings(class, "characteristics"));
    }

    let environment = obj(s, "operating_environment");
    md.heading(2, text_or(environment, "title", "2.4 Operating Environment"));
    md.bullets(strings(environment, "environments"));

    let constraints = obj(s, "design_and_implementation_constraints");
    md.heading(2, text_or(constraints, "title", "2.5 Design and Implementation Constraints"));
    md.bullets(strings(constraints, "constraints"));

    let documentation = obj(s, "user_documentation");
    md.heading(2, text_or(documentation, "title", "2.6 User Documentation"));
    md.bullets(strings(documentation, "documents"));

    let deps = obj(s, "assumptions_and_dependencies");
    md.heading(2, text_or(deps, "title", "2.7 Assumptions and Dependencies"));
    let assumptions = strings(deps, "assumptions");
    if !assumptions.is_empty() {
        md.label("Assumptions:");
        md.bullets(assumptions);
    }
    let dependencies = strings(deps, "dependencies");
    if !dependencies.is_empty() {
        md.label("Dependencies:");
        md.bullets(dependencies);
    }
}

fn system_features(md: &mut Markdown, s: &Map<String, Value>) {
    md.heading(1, text_or(s, "title", "3. System Features"));

    for (idx, feature) in objects(s, "features").enumerate() {
        let n = idx + 1;
        let fallback = format!("Feature {n}");
        md.heading(2, &format!("3.{n} {}", text_or(feature, "feature_name", &fallback)));

        let description = text_or(feature, "description", "");
        if !description.is_empty() {
            md.paragraph(&format!("Description: {description}"));
        }

        let pairs: Vec<_> = objects(feature, "stimulus_response").collect();
        if !pairs.is_empty() {
            md.heading(3, "Stimulus/Response Sequences");
            for pair in pairs {
                md.paragraph(&format!("**Stimulus:** {}", text_or(pair, "stimulus", "")));
                md.paragraph(&format!("**Response:** {}", text_or(pair, "response", "")));
            }
        }

        let requirements: Vec<&str> = objects(feature, "functional_requirements")
            .map(|r| text_or(r, "description", ""))
            .collect();
        if !requirements.is_empty() {
            md.heading(3, "Functional Requirements");
            md.bullets(requirements);
        }
    }
}

fn external_interfaces(md: &mut Markdown, s: &Map<String, Value>, doc: &SrsDocument) {
    md.heading(1, text_or(s, "title", "4. External Interface Requirements"));

    let defaults = [
        ("user_interfaces", "4.1 User Interfaces"),
        ("hardware_interfaces", "4.2 Hardware Interfaces"),
        ("software_interfaces", "4.3 Software Interfaces"),
        ("communication_interfaces", "4.4 Communication Interfaces"),
    ];
    for (key, default_title) in defaults {
        let block = obj(s, key);
        md.heading(2, text_or(block, "title", default_title));
        md.paragraph(text_or(block, "description", ""));

        if let Some(image) = doc.diagram_images.get(key) {
            let name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| image.display().to_string());
            md.line(&format!("![{default_title} diagram]({name})"));
            md.blank();
        } else if let Some(code) = obj(block, "interface_diagram").get("code").and_then(Value::as_str) {
            md.fenced("mermaid", code);
        }
    }
}

fn non_functional(md: &mut Markdown, s: &Map<String, Value>) {
    md.heading(1, text_or(s, "title", "5. Non-Functional Requirements"));

    let groups = [
        ("performance_requirements", "5.1 Performance Requirements"),
        ("safety_requirements", "5.2 Safety Requirements"),
        ("security_requirements", "5.3 Security Requirements"),
        ("quality_attributes", "5.4 Quality Attributes"),
    ];
    for (key, default_title) in groups {
        let group = obj(s, key);
        md.heading(2, text_or(group, "title", default_title));
        for req in objects(group, "requirements") {
            md.bullet(text_or(req, "description", ""));
            let rationale = text_or(req, "rationale", "");
            if !rationale.is_empty() {
                md.line(&format!("  *Rationale: {rationale}*"));
            }
        }
        md.blank();
    }
}

fn glossary(md: &mut Markdown, s: &Map<String, Value>) {
    md.heading(1, "6. Glossary");
    for section in objects(s, "sections") {
        let title = text_or(section, "title", "");
        if !title.is_empty() {
            md.heading(2, title);
        }
        for term in objects(section, "terms") {
            md.term(text_or(term, "term", ""), text_or(term, "definition", ""));
        }
    }
}

fn assumptions(md: &mut Markdown, s: &Map<String, Value>) {
    md.heading(1, text_or(s, "title", "7. Assumptions"));
    for (idx, item) in objects(s, "assumptions").enumerate() {
        md.heading(3, &format!("Assumption {}", idx + 1));
        md.paragraph(text_or(item, "description", ""));
        let impact = text_or(item, "impact", "");
        if !impact.is_empty() {
            md.paragraph(&format!("**Impact:** {impact}"));
        }
    }
}

// ──────────────────────────────────────────────
// Field access
// ──────────────────────────────────────────────

static EMPTY: LazyLock<Map<String, Value>> = LazyLock::new(Map::new);

fn obj<'a>(map: &'a Map<String, Value>, key: &str) -> &'a Map<String, Value> {
    map.get(key).and_then(Value::as_object).unwrap_or(&*EMPTY)
}

fn text_or<'a>(map: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn strings<'a>(map: &'a Map<String, Value>, key: &str) -> Vec<&'a str> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn objects<'a>(
    map: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
    map.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

// ──────────────────────────────────────────────
// Markdown buffer
// ──────────────────────────────────────────────

#[derive(Default)]
struct Markdown {
    out: String,
}

impl Markdown {
    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn heading(&mut self, level: usize, text: &str) {
        let _ = writeln!(self.out, "{} {}\n", "#".repeat(level + 1), text.trim());
    }

    fn paragraph(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let _ = writeln!(self.out, "{}\n", text.trim());
    }

    fn label(&mut self, text: &str) {
        let _ = writeln!(self.out, "**{}**\n", text.trim());
    }

    fn bullet(&mut self, text: &str) {
        let _ = writeln!(self.out, "- {}", text.trim());
    }

    fn bullets(&mut self, items: Vec<&str>) {
        if items.is_empty() {
            return;
        }
        for item in items {
            self.bullet(item);
        }
        self.blank();
    }

    fn term(&mut self, term: &str, definition: &str) {
        let _ = writeln!(self.out, "- **{}**: {}", term.trim(), definition.trim());
    }

    fn fenced(&mut self, lang: &str, body: &str) {
        let _ = writeln!(self.out, "```{lang}\n{}\n```\n", body.trim_end());
    }

    fn finish(self) -> String {
        let mut out = self.out.trim_end().to_string();
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::mock::sample_section;
    use crate::pipeline::structuring::SectionResult;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn document(sections: Vec<SectionResult>) -> SrsDocument {
        SrsDocument {
            build_id: Uuid::new_v4(),
            project_name: "Hire Smart".into(),
            authors: vec!["Dana".into(), "Lee".into()],
            organization: Some("Acme Talent".into()),
            generated_at: Utc::now(),
            provider: "groq".into(),
            sections,
            diagram_placeholders: vec!["hardware_interfaces".into()],
            diagram_images: BTreeMap::new(),
        }
    }

    fn full_document() -> SrsDocument {
        document(
            SectionKind::all()
                .iter()
                .map(|&kind| SectionResult {
                    section: kind,
                    content: sample_section(kind).as_object().cloned().unwrap(),
                })
                .collect(),
        )
    }

    #[test]
    fn json_writer_keys_sections_by_context_name() {
        let dir = tempfile::tempdir().unwrap();
        let doc = full_document();
        let path = JsonDocumentWriter.write(&doc, dir.path()).unwrap();

        assert_eq!(path, dir.path().join("Hire_Smart_srs.json"));
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["metadata"]["project_name"], "Hire Smart");
        assert_eq!(written["metadata"]["provider"], "groq");
        assert_eq!(written["metadata"]["authors"], json!(["Dana", "Lee"]));
        assert_eq!(written["metadata"]["organization"], "Acme Talent");
        assert_eq!(written["metadata"]["build_id"], doc.build_id.to_string());
        assert_eq!(written["sections"]["nfr_section"]["title"], "5. Other Nonfunctional Requirements");
        assert_eq!(written["sections"].as_object().unwrap().len(), 7);
        assert_eq!(written["diagram_placeholders"][0], "hardware_interfaces");
    }

    #[test]
    fn json_writer_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/srs");
        let path = JsonDocumentWriter.write(&full_document(), &nested).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn markdown_follows_section_layout() {
        let md = render_markdown(&full_document());

        assert!(md.starts_with("# Software Requirements Specification\n"));
        assert!(md.contains("**for Hire Smart**"));
        assert!(md.contains("## 1. Introduction\n"));
        assert!(md.contains("### 1.1 Purpose\n\nHiring assistant."));
        assert!(md.contains("**Out of Scope:**\n\n- Payroll"));
        assert!(md.contains("### 3.1 Resume Screening"));
        assert!(md.contains("**Stimulus:** Upload"));
        assert!(md.contains("- The system shall parse PDF resumes."));
        assert!(md.contains("  *Rationale: UX.*"));
        assert!(md.contains("## 6. Glossary"));
        assert!(md.contains("- **ATS**: Applicant tracking system."));
        assert!(md.contains("#### Assumption 1"));
        assert!(md.contains("**Impact:** Onboarding needed."));
    }

    #[test]
    fn markdown_title_block_lists_authors_and_organization() {
        let md = render_markdown(&full_document());
        assert!(md.contains("**for Hire Smart**\n\nPrepared by Dana, Lee\n\nOrganization: Acme Talent\n"));

        let mut anonymous = full_document();
        anonymous.authors.clear();
        anonymous.organization = None;
        let md = render_markdown(&anonymous);
        assert!(!md.contains("Prepared by"));
        assert!(!md.contains("Organization:"));
        assert!(md.contains("**for Hire Smart**\n\nDate Created: "));
    }

    #[test]
    fn markdown_fills_default_headings_for_missing_fields() {
        let doc = document(vec![SectionResult {
            section: SectionKind::Introduction,
            content: Map::new(),
        }]);
        let md = render_markdown(&doc);

        assert!(md.contains("## 1. Introduction"));
        assert!(md.contains("### 1.1 Purpose"));
        assert!(md.contains("### 1.5 References"));
        assert!(md.contains("## 2. Overall Description"));
        assert!(md.contains("### 4.4 Communication Interfaces"));
        assert!(md.contains("### 5.4 Quality Attributes"));
        assert!(md.contains("## 7. Assumptions"));
    }

    #[test]
    fn markdown_prefers_rendered_images_over_inline_code() {
        let mut doc = full_document();
        doc.diagram_images.insert(
            "user_interfaces".into(),
            PathBuf::from("/tmp/out/Hire_Smart_user_interfaces_diagram.png"),
        );
        let md = render_markdown(&doc);

        assert!(md.contains("![4.1 User Interfaces diagram](Hire_Smart_user_interfaces_diagram.png)"));
        assert!(md.contains("```mermaid\ngraph LR\nApp --> DB\n```"));
    }

    #[test]
    fn markdown_writer_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = MarkdownDocumentWriter.write(&full_document(), dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "Hire_Smart_srs.md");
        assert!(fs::read_to_string(path).unwrap().ends_with('\n'));
    }
}
