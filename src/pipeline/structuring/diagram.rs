// Normalize Mermaid diagram text produced by the model and reject refusals
// or output that looks truncated.

use std::sync::LazyLock;

use regex::Regex;

use super::extract::strip_code_fence;

/// Header line prepended when the model omitted the diagram type.
pub const DEFAULT_DIAGRAM_HEADER: &str = "graph TD";

/// Diagram used in place of one that failed sanitization.
pub const DIAGRAM_PLACEHOLDER: &str = "graph TD\n    A[Diagram unavailable]";

/// Recognized Mermaid diagram-type keywords.
const DIAGRAM_HEADERS: &[&str] = &[
    "graph",
    "flowchart",
    "sequenceDiagram",
    "classDiagram",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "journey",
    "gantt",
    "pie",
    "mindmap",
    "timeline",
    "gitGraph",
    "C4Context",
    "quadrantChart",
    "requirementDiagram",
];

const BRACKET_PAIRS: &[(char, char)] = &[('[', ']'), ('(', ')'), ('{', '}')];

/// Phrases that mean the model declined instead of drawing.
static REFUSAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:i['’]m sorry|i am sorry|i apologi[sz]e|i cannot|i can['’]t|i['’]m unable|i am unable|as an ai)\b",
    )
    .unwrap()
});

static THICK_ARROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"={2,}>").unwrap());
static LONG_ARROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{3,}>").unwrap());
static REVERSE_ARROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<-{3,}").unwrap());
static LABELED_ARROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-->\s*\|\s*([^|]*?)\s*\|").unwrap());

/// Sanitize diagram text. Returns `None` for empty input, refusals, or
/// unbalanced brackets; never fails on merely odd-looking syntax.
pub fn sanitize_diagram(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    if contains_refusal(text) {
        tracing::warn!("Diagram rejected: model refusal detected");
        return None;
    }

    let unfenced = strip_code_fence(text);
    let mut lines: Vec<String> = unfenced
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(normalize_arrows)
        .collect();

    if lines.is_empty() {
        return None;
    }

    if !has_diagram_header(&lines[0]) {
        lines.insert(0, DEFAULT_DIAGRAM_HEADER.to_string());
    }

    let diagram = lines.join("\n");

    if let Some((open, close)) = first_unbalanced_pair(&diagram) {
        tracing::warn!(
            open = %open,
            close = %close,
            "Diagram rejected: unbalanced brackets (likely truncated)"
        );
        return None;
    }

    Some(diagram)
}

/// Sanitize, falling back to [`DIAGRAM_PLACEHOLDER`]. Returns whether the
/// placeholder was used.
pub fn sanitize_diagram_or_placeholder(text: &str) -> (String, bool) {
    match sanitize_diagram(text) {
        Some(clean) => (clean, false),
        None => (DIAGRAM_PLACEHOLDER.to_string(), true),
    }
}

fn contains_refusal(text: &str) -> bool {
    REFUSAL.is_match(text)
}

fn normalize_arrows(line: &str) -> String {
    let line = THICK_ARROW.replace_all(line, "-->");
    let line = LONG_ARROW.replace_all(&line, "-->");
    let line = REVERSE_ARROW.replace_all(&line, "<--");
    LABELED_ARROW.replace_all(&line, "-->| $1 |").into_owned()
}

fn has_diagram_header(first_line: &str) -> bool {
    let keyword = first_line.split_whitespace().next().unwrap_or("");
    DIAGRAM_HEADERS.iter().any(|h| keyword == *h)
}

fn first_unbalanced_pair(text: &str) -> Option<(char, char)> {
    BRACKET_PAIRS.iter().copied().find(|(open, close)| {
        text.chars().filter(|c| c == open).count() != text.chars().filter(|c| c == close).count()
    })
}
