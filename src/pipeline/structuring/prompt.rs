/// Constraints appended to the section's system prompt for the second attempt.
pub const STRICT_JSON_CONSTRAINTS: &str = r#"
STRICT OUTPUT RULES (your previous answer could not be parsed):
1. Return ONLY a single valid JSON object. No prose before or after it.
2. Do NOT wrap the object in markdown code fences.
3. Use double quotes for every key and string value. No trailing commas.
4. Escape newlines inside strings as \n.
5. If you are close to your output limit, shorten descriptions rather than
   leaving the object unfinished. A complete short object beats a truncated long one.
"#;

/// System prompt for the repair pass.
pub const REPAIR_SYSTEM_PROMPT: &str = "\
You are a strict JSON repair tool. You receive text that was meant to be a \
single JSON object and return that object as valid JSON. You never add \
commentary, never use markdown fences, and never answer the content itself.";

/// System prompt for the second attempt: the original prompt plus strict constraints.
pub fn build_reinforced_system_prompt(system_text: &str) -> String {
    format!("{}\n{STRICT_JSON_CONSTRAINTS}", system_text.trim_end())
}

/// User prompt for the repair pass, embedding the previous raw output verbatim.
pub fn build_repair_prompt(raw_output: &str) -> String {
    format!(
        r#"Convert the following text into valid JSON.

Rules:
- Preserve the existing top-level keys and their content.
- Do NOT invent new top-level keys.
- Remove any prose, markdown fences, or comments around the object.
- If the content is incomplete or truncated, close it off and return a minimal valid object
  that keeps every field that was already present.
- Return ONLY the JSON object.

<text>
{raw_output}
</text>"#
    )
}
