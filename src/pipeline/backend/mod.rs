//! Generation backends: Groq (primary), Gemini (secondary), and the
//! cross-provider fallback wrapper.

pub mod fallback;
pub mod gemini;
pub mod groq;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

pub use fallback::FallbackClient;
pub use gemini::GeminiClient;
pub use groq::GroqClient;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, RetryPolicy};

use crate::config::{LlmConfig, ProviderKind};
use crate::pipeline::structuring::{LlmClient, StructuringError};

/// Build the configured backend over a real HTTPS transport.
///
/// Fails with `Config` before any network call when the selected provider
/// has no key.
pub fn build_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>, StructuringError> {
    config.ensure_credentials()?;
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(config.timeout)?);
    build_client_with_transport(config, transport)
}

/// Groq is wrapped in a [`FallbackClient`] with Gemini as secondary when a
/// Gemini key is present. Gemini as the selected provider has no fallback.
pub fn build_client_with_transport(
    config: &LlmConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<Box<dyn LlmClient>, StructuringError> {
    config.ensure_credentials()?;

    match config.provider {
        ProviderKind::Groq => {
            let groq = GroqClient::new(
                Arc::clone(&transport),
                config.groq_api_key.as_deref().unwrap_or_default(),
                &config.groq_model,
                config.retry_policy(),
            );
            let secondary = config.gemini_api_key.as_deref().map(|key| {
                Box::new(GeminiClient::new(Arc::clone(&transport), key, &config.gemini_model))
                    as Box<dyn LlmClient>
            });
            tracing::info!(
                provider = "groq",
                model = %config.groq_model,
                fallback = secondary.is_some(),
                "LLM backend configured"
            );
            Ok(Box::new(FallbackClient::new(Box::new(groq), secondary)))
        }
        ProviderKind::Gemini => {
            tracing::info!(provider = "gemini", model = %config.gemini_model, "LLM backend configured");
            Ok(Box::new(GeminiClient::new(
                transport,
                config.gemini_api_key.as_deref().unwrap_or_default(),
                &config.gemini_model,
            )))
        }
    }
}
