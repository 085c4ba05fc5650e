//! Local causal-language-model generation.
//!
//! [`Generator`] is the single capability the query phase needs: one prompt
//! in, one completion out. The production implementation posts one blocking
//! request to a local Ollama-compatible `/api/generate` endpoint with a
//! bounded output length and a newline stop sequence. There is no retry,
//! no timeout, and no streaming; a failure aborts the query.

use std::fmt;

use crate::config::GenerationConfig;

/// Generation failures.
#[derive(Debug)]
pub enum GenerateError {
    /// The model server could not be reached.
    Http(String),
    /// The model server answered with a non-success status.
    Api { status: u16, body: String },
    /// The response body did not have the expected shape.
    BadResponse(String),
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::Http(e) => write!(f, "generation request failed: {}", e),
            GenerateError::Api { status, body } => {
                write!(f, "model server error {}: {}", status, body)
            }
            GenerateError::BadResponse(e) => write!(f, "malformed model response: {}", e),
        }
    }
}

impl std::error::Error for GenerateError {}

/// Produces a completion for a fully assembled prompt.
pub trait Generator {
    fn complete(&self, prompt: &str) -> Result<String, GenerateError>;
}

/// Generation against a local Ollama-compatible server.
pub struct OllamaGenerator {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    max_tokens: u32,
    stop: Vec<String>,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url: config.url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            stop: config.stop.clone(),
        }
    }
}

impl Generator for OllamaGenerator {
    fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_predict": self.max_tokens,
                "stop": self.stop,
            },
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .map_err(|e| {
                GenerateError::Http(format!(
                    "is the model server running at {}? {}",
                    self.url, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().unwrap_or_default();
            return Err(GenerateError::Api {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| GenerateError::BadResponse(e.to_string()))?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| GenerateError::BadResponse("missing response field".to_string()))
    }
}
