use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use super::transport::{HttpResponse, HttpTransport};
use crate::pipeline::structuring::StructuringError;

type Responder = Box<dyn Fn(&HttpCall) -> Result<HttpResponse, StructuringError> + Send + Sync>;

/// One recorded request.
#[derive(Debug, Clone)]
pub struct HttpCall {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpCall {
    /// `model` field of a chat-completions body, if any.
    pub fn model(&self) -> Option<&str> {
        self.body.as_ref()?.get("model")?.as_str()
    }
}

/// Mock transport: answers through a responder closure and records every call.
pub struct MockTransport {
    responder: Responder,
    calls: Mutex<Vec<HttpCall>>,
}

impl MockTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&HttpCall) -> Result<HttpResponse, StructuringError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replays responses in order; an exhausted script fails the call.
    pub fn sequence(responses: Vec<Result<HttpResponse, StructuringError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(StructuringError::HttpClient("script exhausted".into())))
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<HttpCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: HttpCall) -> Result<HttpResponse, StructuringError> {
        let result = (self.responder)(&call);
        self.calls.lock().unwrap().push(call);
        result
    }
}

impl HttpTransport for MockTransport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, StructuringError> {
        self.record(HttpCall {
            method: "GET",
            url: url.to_string(),
            headers: own_headers(headers),
            body: None,
        })
    }

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<HttpResponse, StructuringError> {
        self.record(HttpCall {
            method: "POST",
            url: url.to_string(),
            headers: own_headers(headers),
            body: Some(body.clone()),
        })
    }
}

fn own_headers(headers: &[(&str, &str)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// OpenAI-style chat completion body carrying `content`.
pub fn chat_body(content: &str) -> String {
    serde_json::json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

/// Model listing body with the given ids.
pub fn models_body(ids: &[&str]) -> String {
    let data: Vec<Value> = ids.iter().map(|id| serde_json::json!({"id": id})).collect();
    serde_json::json!({"object": "list", "data": data}).to_string()
}

pub fn model_not_found_body(model: &str) -> String {
    serde_json::json!({
        "error": {
            "message": format!("The model `{model}` does not exist or you do not have access to it."),
            "type": "invalid_request_error",
            "code": "model_not_found"
        }
    })
    .to_string()
}
