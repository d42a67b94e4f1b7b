//! Interface diagram post-processing: in-place sanitization of the External
//! Interfaces section and optional rendering to images.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use super::DocumentError;
use crate::pipeline::structuring::{sanitize_diagram_or_placeholder, ParsedObject, INTERFACE_KEYS};

/// Renders Mermaid text to an image file.
pub trait DiagramRenderer: Send + Sync {
    fn render(&self, code: &str, output: &Path) -> Result<(), DocumentError>;
}

/// Shells out to the Mermaid CLI (`mmdc`).
pub struct MermaidCliRenderer {
    program: PathBuf,
    background: String,
    width: u32,
}

impl Default for MermaidCliRenderer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("mmdc"),
            background: "white".to_string(),
            width: 1600,
        }
    }
}

impl MermaidCliRenderer {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Whether the CLI runs at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl DiagramRenderer for MermaidCliRenderer {
    fn render(&self, code: &str, output: &Path) -> Result<(), DocumentError> {
        let source = output.with_extension("mmd");
        fs::write(&source, code)?;

        let result = Command::new(&self.program)
            .arg("-i")
            .arg(&source)
            .arg("-o")
            .arg(output)
            .args(["-b", &self.background, "-w", &self.width.to_string()])
            .output();

        if let Err(e) = fs::remove_file(&source) {
            tracing::debug!(path = %source.display(), error = %e, "Could not remove diagram source");
        }

        let out = result.map_err(|e| {
            DocumentError::Render(format!("failed to run {}: {e}", self.program.display()))
        })?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(DocumentError::Render(
                stderr.trim().chars().take(300).collect(),
            ));
        }
        Ok(())
    }
}

/// Sanitize every `<interface>.interface_diagram.code` in place.
///
/// Diagrams that fail sanitization are replaced with the placeholder. Returns
/// the interface keys that received the placeholder. Blocks without a string
/// `code` field are left untouched.
pub fn sanitize_interface_diagrams(section: &mut ParsedObject) -> Vec<String> {
    let mut replaced = Vec::new();

    for key in INTERFACE_KEYS {
        let Some(code) = section
            .get_mut(*key)
            .and_then(|block| block.get_mut("interface_diagram"))
            .and_then(|diagram| diagram.get_mut("code"))
        else {
            continue;
        };
        let Some(raw) = code.as_str() else {
            continue;
        };

        let (clean, placeholder) = sanitize_diagram_or_placeholder(raw);
        if placeholder {
            tracing::warn!(interface = key, "Diagram unusable, substituted placeholder");
            replaced.push(key.to_string());
        }
        *code = Value::String(clean);
    }

    replaced
}

/// `<project>_<interface>_diagram.png`, with the project name reduced to a
/// filesystem-safe slug.
pub fn diagram_file_name(project_name: &str, interface_key: &str) -> String {
    format!("{}_{interface_key}_diagram.png", file_slug(project_name))
}

pub(crate) fn file_slug(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

/// Render each interface diagram into `out_dir`.
///
/// A failed render is logged and skipped; the returned map holds only the
/// images that were written.
pub fn render_interface_diagrams(
    renderer: &dyn DiagramRenderer,
    section: &ParsedObject,
    project_name: &str,
    out_dir: &Path,
) -> BTreeMap<String, PathBuf> {
    let mut images = BTreeMap::new();

    for key in INTERFACE_KEYS {
        let Some(code) = section
            .get(*key)
            .and_then(|block| block.get("interface_diagram"))
            .and_then(|diagram| diagram.get("code"))
            .and_then(Value::as_str)
        else {
            continue;
        };

        let path = out_dir.join(diagram_file_name(project_name, key));
        match renderer.render(code, &path) {
            Ok(()) => {
                tracing::info!(interface = key, path = %path.display(), "Diagram rendered");
                images.insert(key.to_string(), path);
            }
            Err(e) => {
                tracing::warn!(interface = key, error = %e, "Diagram render failed, omitting image");
            }
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::DIAGRAM_PLACEHOLDER;
    use serde_json::json;
    use std::sync::Mutex;

    fn interfaces(codes: [&str; 4]) -> ParsedObject {
        let mut obj = json!({"title": "4. External Interface Requirements"});
        for (key, code) in INTERFACE_KEYS.iter().zip(codes) {
            obj[*key] = json!({
                "title": key,
                "description": "d",
                "interface_diagram": {"diagram_type": "mermaid", "code": code}
            });
        }
        obj.as_object().cloned().unwrap()
    }

    fn code_of(section: &ParsedObject, key: &str) -> String {
        section[key]["interface_diagram"]["code"].as_str().unwrap().to_string()
    }

    /// Records requested paths; fails for one interface.
    struct RecordingRenderer {
        fail_on: &'static str,
        rendered: Mutex<Vec<PathBuf>>,
    }

    impl DiagramRenderer for RecordingRenderer {
        fn render(&self, _code: &str, output: &Path) -> Result<(), DocumentError> {
            if output.to_string_lossy().contains(self.fail_on) {
                return Err(DocumentError::Render("syntax error".into()));
            }
            self.rendered.lock().unwrap().push(output.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn sanitizes_in_place_and_reports_placeholders() {
        let mut section = interfaces([
            "```mermaid\nA ----> B\n```",
            "I'm sorry, I cannot draw hardware.",
            "graph LR\nX[Svc --> Y",
            "sequenceDiagram\nC->>S: TLS",
        ]);
        let replaced = sanitize_interface_diagrams(&mut section);

        assert_eq!(code_of(&section, "user_interfaces"), "graph TD\nA --> B");
        assert_eq!(code_of(&section, "hardware_interfaces"), DIAGRAM_PLACEHOLDER);
        assert_eq!(code_of(&section, "software_interfaces"), DIAGRAM_PLACEHOLDER);
        assert_eq!(code_of(&section, "communication_interfaces"), "sequenceDiagram\nC->>S: TLS");
        assert_eq!(replaced, vec!["hardware_interfaces", "software_interfaces"]);
    }

    #[test]
    fn missing_or_non_string_code_is_left_alone() {
        let mut section = json!({
            "title": "4.",
            "user_interfaces": {"title": "UI", "description": "d"},
            "hardware_interfaces": {"interface_diagram": {"code": 42}}
        })
        .as_object()
        .cloned()
        .unwrap();
        let before = section.clone();
        assert!(sanitize_interface_diagrams(&mut section).is_empty());
        assert_eq!(section, before);
    }

    #[test]
    fn file_names_are_slugged() {
        assert_eq!(
            diagram_file_name("Hire Smart/v2", "user_interfaces"),
            "Hire_Smart_v2_user_interfaces_diagram.png"
        );
        assert_eq!(file_slug("   "), "project");
    }

    #[test]
    fn render_failures_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let section = interfaces(["graph TD\nA-->B"; 4]);
        let renderer = RecordingRenderer {
            fail_on: "hardware",
            rendered: Mutex::new(Vec::new()),
        };

        let images = render_interface_diagrams(&renderer, &section, "Demo", dir.path());

        assert_eq!(images.len(), 3);
        assert!(!images.contains_key("hardware_interfaces"));
        assert_eq!(
            images["user_interfaces"],
            dir.path().join("Demo_user_interfaces_diagram.png")
        );
        assert_eq!(renderer.rendered.lock().unwrap().len(), 3);
    }

    #[test]
    fn missing_cli_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MermaidCliRenderer::with_program("/nonexistent/mmdc-for-tests");
        assert!(!renderer.is_available());

        let out = dir.path().join("d.png");
        let err = renderer.render("graph TD\nA-->B", &out).unwrap_err();
        assert!(matches!(err, DocumentError::Render(_)));
        // The temporary source file is cleaned up either way.
        assert!(!dir.path().join("d.mmd").exists());
    }
}
