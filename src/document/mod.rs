//! SRS assembly: concurrent section generation, diagram post-processing,
//! output writers, and the free-text section enhancer.

pub mod builder;
pub mod diagrams;
pub mod enhance;
pub mod output;

pub use builder::{BuildOptions, DocumentBuilder, SrsDocument};
pub use diagrams::{DiagramRenderer, MermaidCliRenderer};
pub use enhance::{enhance_section, EnhanceKind};
pub use output::{DocumentWriter, JsonDocumentWriter, MarkdownDocumentWriter};

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::structuring::StructuringError;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error(transparent)]
    Structuring(#[from] StructuringError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Diagram rendering failed: {0}")]
    Render(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DocumentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Structuring(e) => e.status_code(),
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) | Self::Json(_) | Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Structuring(e) => e.error_code(),
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Io(_) | Self::Json(_) | Self::Render(_) => "INTERNAL",
        }
    }

    /// Structured error body for machine consumers.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                code: self.error_code(),
                status: self.status_code().as_u16(),
                message: self.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub status: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structuring_errors_keep_their_status() {
        let auth: DocumentError = StructuringError::Auth("Invalid GROQ_API_KEY.".into()).into();
        assert_eq!(auth.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(auth.error_code(), "LLM_AUTH_FAILED");

        let failed: DocumentError = StructuringError::SectionFailed {
            section: "glossary".into(),
            detail: "no valid JSON".into(),
        }
        .into();
        assert_eq!(failed.status_code(), StatusCode::BAD_GATEWAY);
        assert!(failed.to_string().contains("glossary"));
    }

    #[test]
    fn local_failures_map_to_server_or_client_errors() {
        let io: DocumentError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            DocumentError::Render("mmdc missing".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            DocumentError::InvalidInput("blank".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn error_body_serializes() {
        let body = DocumentError::InvalidInput("user_input is empty".into()).to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "INVALID_INPUT");
        assert_eq!(json["error"]["status"], 400);
        assert!(json["error"]["message"].as_str().unwrap().contains("user_input"));
    }
}
