use crate::pipeline::structuring::{GenerationRequest, LlmClient, StructuringError};

/// Primary backend with an optional secondary for provider-class failures.
///
/// Credential and configuration errors from the primary never fall back.
/// The secondary is tried at most once per request and its outcome is final.
pub struct FallbackClient {
    primary: Box<dyn LlmClient>,
    secondary: Option<Box<dyn LlmClient>>,
}

impl FallbackClient {
    pub fn new(primary: Box<dyn LlmClient>, secondary: Option<Box<dyn LlmClient>>) -> Self {
        Self { primary, secondary }
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }
}

impl LlmClient for FallbackClient {
    fn provider(&self) -> &str {
        self.primary.provider()
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, StructuringError> {
        let err = match self.primary.complete(request) {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };

        match &self.secondary {
            Some(secondary) if !err.is_fatal() => {
                tracing::warn!(
                    primary = self.primary.provider(),
                    secondary = secondary.provider(),
                    error = %err,
                    "Primary provider failed, falling back"
                );
                secondary.complete(request)
            }
            _ => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::mock::ScriptedLlmClient;
    use std::sync::Arc;

    fn request() -> GenerationRequest {
        GenerationRequest::structured("sys", "user", 0.3, 512)
    }

    fn pair(
        primary: Vec<Result<String, StructuringError>>,
        secondary: Option<Vec<Result<String, StructuringError>>>,
    ) -> (Arc<ScriptedLlmClient>, Option<Arc<ScriptedLlmClient>>, FallbackClient) {
        let p = Arc::new(ScriptedLlmClient::named("groq", primary));
        let s = secondary.map(|r| Arc::new(ScriptedLlmClient::named("gemini", r)));
        let client = FallbackClient::new(
            Box::new(Arc::clone(&p)),
            s.as_ref().map(|s| Box::new(Arc::clone(s)) as Box<dyn LlmClient>),
        );
        (p, s, client)
    }

    #[test]
    fn primary_success_never_touches_secondary() {
        let (p, s, client) = pair(vec![Ok("{}".into())], Some(vec![Ok("unused".into())]));
        assert_eq!(client.complete(&request()).unwrap(), "{}");
        assert_eq!(p.call_count(), 1);
        assert_eq!(s.unwrap().call_count(), 0);
    }

    #[test]
    fn provider_error_falls_back_once() {
        let (p, s, client) = pair(
            vec![Err(StructuringError::Provider("503".into()))],
            Some(vec![Ok("{\"from\": \"gemini\"}".into())]),
        );
        assert_eq!(client.complete(&request()).unwrap(), "{\"from\": \"gemini\"}");
        assert_eq!(p.call_count(), 1);
        let s = s.unwrap();
        assert_eq!(s.call_count(), 1);
        assert_eq!(s.requests()[0], request());
    }

    #[test]
    fn secondary_failure_is_final() {
        let (_p, s, client) = pair(
            vec![Err(StructuringError::Provider("timeout".into()))],
            Some(vec![
                Err(StructuringError::Provider("gemini down".into())),
                Ok("never".into()),
            ]),
        );
        let err = client.complete(&request()).unwrap_err();
        assert!(matches!(err, StructuringError::Provider(ref m) if m == "gemini down"));
        assert_eq!(s.unwrap().call_count(), 1);
    }

    #[test]
    fn auth_error_never_falls_back() {
        let (_p, s, client) = pair(
            vec![Err(StructuringError::Auth("Invalid GROQ_API_KEY.".into()))],
            Some(vec![Ok("unused".into())]),
        );
        assert!(matches!(client.complete(&request()), Err(StructuringError::Auth(_))));
        assert_eq!(s.unwrap().call_count(), 0);
    }

    #[test]
    fn config_error_never_falls_back() {
        let (_p, s, client) = pair(
            vec![Err(StructuringError::Config("Missing GROQ_API_KEY.".into()))],
            Some(vec![Ok("unused".into())]),
        );
        assert!(matches!(client.complete(&request()), Err(StructuringError::Config(_))));
        assert_eq!(s.unwrap().call_count(), 0);
    }

    #[test]
    fn without_secondary_error_propagates() {
        let (_p, _s, client) = pair(vec![Err(StructuringError::Provider("down".into()))], None);
        assert!(!client.has_secondary());
        assert!(matches!(client.complete(&request()), Err(StructuringError::Provider(_))));
    }

    #[test]
    fn reports_primary_provider() {
        let (_p, _s, client) = pair(vec![], Some(vec![]));
        assert_eq!(client.provider(), "groq");
    }
}
