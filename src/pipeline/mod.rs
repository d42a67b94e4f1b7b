pub mod backend;
pub mod prompt_templates;
pub mod structuring;
