//! Blocking client for the Generative Language `generateContent` endpoint.

use crate::ai::{AiError, Model, Turn};
use crate::config::ModelConfig;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const TRACING_TARGET: &str = "midnight_ai::gemini";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Gemini REST client. One request at a time, no automatic retries.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    /// Build a client from config, reading the API key from the configured
    /// environment variable.
    pub fn from_config(config: &ModelConfig) -> Result<Self, AiError> {
        let api_key = env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AiError::MissingApiKey {
                var: config.api_key_env.clone(),
            })?;
        Self::new(config, api_key)
    }

    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self, AiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint(&config.api_base, &config.name),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn send(&self, turns: &[Turn]) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: turns
                .iter()
                .map(|turn| Content {
                    role: turn.role.as_str(),
                    parts: [Part { text: &turn.text }],
                })
                .collect(),
        };

        tracing::debug!(target: TRACING_TARGET, turns = turns.len(), "sending generateContent");
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(classify_error(status, &body));
        }
        extract_text(&body)
    }
}

impl Model for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, AiError> {
        self.send(&[Turn::user(prompt)])
    }

    fn chat(&self, history: &[Turn]) -> Result<String, AiError> {
        self.send(history)
    }
}

fn endpoint(api_base: &str, model: &str) -> String {
    let model = model.trim().trim_start_matches("models/");
    format!(
        "{}/models/{}:generateContent",
        api_base.trim().trim_end_matches('/'),
        model
    )
}

fn classify_error(status: StatusCode, body: &str) -> AiError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect());

    let access_problem = matches!(status, StatusCode::NOT_FOUND | StatusCode::FORBIDDEN)
        || message.contains("is not found")
        || message.contains("does not have access");

    tracing::warn!(target: TRACING_TARGET, status = status.as_u16(), "AI backend error: {message}");

    if access_problem {
        AiError::ModelAccess {
            status: status.as_u16(),
            message,
        }
    } else {
        AiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

fn extract_text(body: &str) -> Result<String, AiError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| AiError::InvalidResponse {
            message: e.to_string(),
        })?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(text)
}
