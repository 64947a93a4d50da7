use crate::error::InferenceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "llama3";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InferenceError>;
}

#[async_trait]
impl<T> TextGenerator for Box<T>
where
    T: TextGenerator + ?Sized,
{
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        (**self).generate(model, prompt).await
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateFragment {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for an Ollama-compatible `/api/generate` endpoint. The request body
/// is `{"model", "prompt"}` and nothing else.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    endpoint: Url,
    client: Client,
}

impl OllamaClient {
    pub fn new(endpoint: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            client: Client::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn unavailable(&self, error: reqwest::Error) -> InferenceError {
        InferenceError::Unavailable {
            endpoint: self.endpoint.to_string(),
            details: error.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&GenerateRequest { model, prompt })
            .send()
            .await
            .map_err(|error| self.unavailable(error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| self.unavailable(error))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<GenerateFragment>(&body)
                .ok()
                .and_then(|fragment| fragment.error)
                .unwrap_or(body);
            return Err(InferenceError::Response(format!("HTTP {status}: {reason}")));
        }

        parse_generate_body(&body)
    }
}

/// Accepts a single JSON object or the NDJSON fragments Ollama streams when
/// `stream` is not set.
pub(crate) fn parse_generate_body(body: &str) -> Result<String, InferenceError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(InferenceError::Response("empty response body".to_string()));
    }

    if let Ok(fragment) = serde_json::from_str::<GenerateFragment>(body) {
        return fragment_text(fragment)?
            .ok_or_else(|| InferenceError::Response("missing field `response`".to_string()));
    }

    let mut text = String::new();
    let mut seen_response = false;
    for line in body.lines().filter(|line| !line.trim().is_empty()) {
        let fragment: GenerateFragment = serde_json::from_str(line)
            .map_err(|error| InferenceError::Response(format!("malformed json: {error}")))?;
        if let Some(piece) = fragment_text(fragment)? {
            seen_response = true;
            text.push_str(&piece);
        }
    }

    if !seen_response {
        return Err(InferenceError::Response(
            "missing field `response`".to_string(),
        ));
    }

    Ok(text)
}

fn fragment_text(fragment: GenerateFragment) -> Result<Option<String>, InferenceError> {
    if let Some(error) = fragment.error {
        return Err(InferenceError::Response(error));
    }
    Ok(fragment.response)
}
