use std::fmt;
use std::time::Duration;

use crate::pipeline::backend::gemini::DEFAULT_GEMINI_MODEL;
use crate::pipeline::backend::groq::AUTO_MODEL;
use crate::pipeline::backend::transport::{
    RetryPolicy, DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
};
use crate::pipeline::structuring::orchestrator::DEFAULT_TEMPERATURE;
use crate::pipeline::structuring::StructuringError;

/// Application-level constants
pub const APP_NAME: &str = "SRS Engine";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default output token budget per section call.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "srs_engine=info,warn"
}

/// Which backend serves generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Groq,
    Gemini,
}

impl ProviderKind {
    /// Unknown or empty names select Groq.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "gemini" => Self::Gemini,
            _ => Self::Groq,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backend selection and call parameters. Built once, passed explicitly.
#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    /// Normalized Groq model id, or `auto`.
    pub groq_model: String,
    /// Normalized Gemini model id.
    pub gemini_model: String,
    pub groq_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

// Keys stay out of logs.
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("groq_model", &self.groq_model)
            .field("gemini_model", &self.gemini_model)
            .field("groq_api_key", &self.groq_api_key.as_ref().map(|_| "<set>"))
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<set>"))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff_base", &self.backoff_base)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

impl LlmConfig {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = ProviderKind::parse(&get("LLM_PROVIDER").unwrap_or_default());
        let override_model = get("LLM_MODEL");

        let mut groq_model = normalize_groq_model(&get("GROQ_MODEL").unwrap_or_default());
        let mut gemini_model = normalize_gemini_model(&get("GEMINI_MODEL").unwrap_or_default());
        if let Some(model) = override_model {
            match provider {
                ProviderKind::Groq => groq_model = normalize_groq_model(&model),
                ProviderKind::Gemini => gemini_model = normalize_gemini_model(&model),
            }
        }

        let timeout_secs = parse_or(get("SRS_LLM_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS);
        let max_output_tokens = parse_or(get("SRS_MAX_OUTPUT_TOKENS"), DEFAULT_MAX_OUTPUT_TOKENS);

        Self {
            provider,
            groq_model,
            gemini_model,
            groq_api_key: get("GROQ_API_KEY"),
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")),
            timeout: Duration::from_secs(timeout_secs),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens,
        }
    }

    /// Model of the selected provider.
    pub fn selected_model(&self) -> &str {
        match self.provider {
            ProviderKind::Groq => &self.groq_model,
            ProviderKind::Gemini => &self.gemini_model,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
        }
    }

    /// Pre-flight check: the selected provider must have a key.
    pub fn ensure_credentials(&self) -> Result<(), StructuringError> {
        match self.provider {
            ProviderKind::Groq if self.groq_api_key.is_none() => Err(StructuringError::Config(
                "Missing GROQ_API_KEY for Groq provider.".into(),
            )),
            ProviderKind::Gemini if self.gemini_api_key.is_none() => {
                Err(StructuringError::Config(
                    "Missing GEMINI_API_KEY (or GOOGLE_API_KEY) for Gemini provider.".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(value = %raw, "Ignoring unparseable numeric setting");
            default
        }),
        None => default,
    }
}

/// Groq model ids: blank/`auto`/`default` mean auto, `groq/` and any
/// vendor prefix are dropped.
pub fn normalize_groq_model(model: &str) -> String {
    let m = model.trim();
    if m.is_empty() || m.eq_ignore_ascii_case("auto") || m.eq_ignore_ascii_case("default") {
        return AUTO_MODEL.to_string();
    }
    let m = m.strip_prefix("groq/").unwrap_or(m);
    m.rsplit('/').next().unwrap_or(m).to_string()
}

/// Gemini model ids: blank means the default, a `gemini/` prefix is dropped.
pub fn normalize_gemini_model(model: &str) -> String {
    let m = model.trim();
    if m.is_empty() {
        return DEFAULT_GEMINI_MODEL.to_string();
    }
    m.strip_prefix("gemini/").unwrap_or(m).to_string()
}
