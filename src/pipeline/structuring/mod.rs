pub mod types;
pub mod prompt;
pub mod extract;
pub mod diagram;
pub mod schema;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod mock;

pub use types::*;
pub use prompt::*;
pub use extract::*;
pub use diagram::*;
pub use schema::*;
pub use orchestrator::*;

use reqwest::StatusCode;
use thiserror::Error;

/// Coarse error classes surfaced to the top-level caller.
///
/// The caller decides between a "fix your credentials" message and a
/// "try again" message from this alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required selection or credential missing. Detected before any network call.
    Configuration,
    /// The provider rejected the credentials.
    Authentication,
    /// Transient or permanent backend failure unrelated to credentials.
    Provider,
}

#[derive(Error, Debug)]
pub enum StructuringError {
    #[error("LLM configuration error: {0}")]
    Config(String),

    #[error("LLM authentication failed: {0}")]
    Auth(String),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("Failed to generate section '{section}': {detail}")]
    SectionFailed { section: String, detail: String },

    #[error("LLM returned an empty response for '{section}'")]
    EmptyResponse { section: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl StructuringError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Auth(_) => ErrorKind::Authentication,
            Self::Provider(_)
            | Self::SectionFailed { .. }
            | Self::EmptyResponse { .. }
            | Self::HttpClient(_)
            | Self::ResponseParsing(_) => ErrorKind::Provider,
        }
    }

    /// Whether this error stops a request outright (no tier escalation, no fallback).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Authentication
        )
    }

    /// HTTP status class a request surface should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Configuration | ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Provider => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "LLM_NOT_CONFIGURED",
            Self::Auth(_) => "LLM_AUTH_FAILED",
            Self::SectionFailed { .. } => "SECTION_GENERATION_FAILED",
            Self::EmptyResponse { .. } => "LLM_EMPTY_RESPONSE",
            Self::Provider(_) | Self::HttpClient(_) | Self::ResponseParsing(_) => {
                "LLM_PROVIDER_ERROR"
            }
        }
    }
}
