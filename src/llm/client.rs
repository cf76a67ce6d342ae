//! Async LLM client for intent extraction
//!
//! Model-agnostic HTTP client speaking both Anthropic and OpenAI-compatible
//! wire formats. The one job of the model here is mapping a command plus a
//! system prompt to schema-valid JSON; everything downstream is typed.

use crate::core::config::Settings;
use crate::core::error::{OrchestraError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The opaque completion collaborator the orchestration core depends on.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Send one completion request, returning the raw text response.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Post-deserialization checks for structured LLM output.
///
/// A failed validation consumes a retry, same as malformed JSON.
pub trait ValidateResponse {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Parse a structured response from the model, retrying on malformed or
/// schema-invalid output.
///
/// Returns `None` after the retry budget is exhausted; callers treat that
/// as "command not understood", never as a fatal error. Transport errors
/// abort immediately since retrying them is the resilience layer's job.
pub async fn parse_structured<T>(
    model: &dyn CompletionModel,
    system: &str,
    user: &str,
    max_retries: u32,
) -> Option<T>
where
    T: DeserializeOwned + ValidateResponse,
{
    for attempt in 0..=max_retries {
        let response = match model.complete(system, user).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("completion request failed: {e}");
                break;
            }
        };

        let json_str = match extract_json(&response) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("no JSON in response (attempt {}): {e}", attempt + 1);
                continue;
            }
        };

        match serde_json::from_str::<T>(json_str) {
            Ok(parsed) => match parsed.validate() {
                Ok(()) => return Some(parsed),
                Err(e) => {
                    tracing::warn!("schema validation failed (attempt {}): {e}", attempt + 1)
                }
            },
            Err(e) => tracing::warn!("failed to decode JSON (attempt {}): {e}", attempt + 1),
        }
    }

    tracing::error!("failed to parse structured response after all retries");
    None
}

/// Extract the JSON object from an LLM response (handles surrounding text)
fn extract_json(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| OrchestraError::Llm("no JSON found in response".into()))?;
    let end = response
        .rfind('}')
        .ok_or_else(|| OrchestraError::Llm("no closing brace found in response".into()))?;
    Ok(&response[start..=end])
}

/// API format type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

/// HTTP-backed completion model
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
}

impl LlmClient {
    /// Create a new LLM client with explicit configuration
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            model,
            api_format,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| OrchestraError::Llm("LLM_API_KEY not set".into()))?;
        Ok(Self::new(
            api_key,
            settings.api_url.clone(),
            settings.model.clone(),
        ))
    }

    /// Detect API format from URL
    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            // DeepSeek, OpenAI, and other compatible APIs use OpenAI format
            ApiFormat::OpenAI
        }
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            temperature: 0.1,
            system: system.into(),
            messages: vec![Message {
                role: "user".into(),
                content: user.into(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| OrchestraError::Llm(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OrchestraError::Llm(format!("API error: {}", error_text)));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| OrchestraError::Llm(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| OrchestraError::Llm("empty response".into()))
    }

    async fn complete_openai(&self, system: &str, user: &str) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            temperature: 0.1,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system.into(),
                },
                Message {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| OrchestraError::Llm(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OrchestraError::Llm(format!("API error: {}", error_text)));
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| OrchestraError::Llm(e.to_string()))?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| OrchestraError::Llm("empty response".into()))
    }
}

#[async_trait]
impl CompletionModel for LlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match self.api_format {
            ApiFormat::Anthropic => self.complete_anthropic(system, user).await,
            ApiFormat::OpenAI => self.complete_openai(system, user).await,
        }
    }
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format (DeepSeek, OpenAI, etc.)
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}
