//! Google Gemini generation client.
//!
//! Implements [`GenerationClient`] against the `generateContent` REST
//! endpoint. The API key can be set via the constructor or the
//! `GEMINI_API_KEY` environment variable.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{strip_code_fences, GenerationClient, GenerationRequest, GenerationServiceError};

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini script-generation integration.
///
/// # Configuration
///
/// The API key can be set via:
/// - Constructor: `GeminiClient::new().with_api_key("...")`
/// - Environment: `GEMINI_API_KEY`
pub struct GeminiClient {
    /// API key for authentication
    api_key: Option<String>,
    /// Model name (e.g. "gemini-2.5-flash")
    model: String,
    /// Sampling temperature, if overridden
    temperature: Option<f32>,
    /// HTTP client
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client with default settings.
    ///
    /// Defaults:
    /// - Model: `gemini-2.5-flash`
    /// - API key: from `GEMINI_API_KEY` environment variable
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").ok(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            client: Client::new(),
        }
    }

    /// Set the API key explicitly.
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the model name.
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Get the API key, returning an error if not configured.
    fn get_api_key(&self) -> Result<&str, GenerationServiceError> {
        self.api_key.as_deref().ok_or_else(|| {
            GenerationServiceError::Configuration(
                "GEMINI_API_KEY not set. Set it via environment variable or with_api_key()"
                    .to_string(),
            )
        })
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<String>, GenerationServiceError> {
        let api_key = self.get_api_key()?;
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            API_BASE, self.model, api_key
        );

        let body = GenerateContentRequest {
            system_instruction: Content {
                parts: vec![Part {
                    text: request.system_instruction.clone(),
                }],
            },
            contents: vec![Content {
                parts: vec![Part {
                    text: request.user_content.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                candidate_count: request.candidate_count as u32,
                temperature: self.temperature,
            },
        };

        debug!(
            model = %self.model,
            candidates = request.candidate_count,
            "requesting script candidates"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationServiceError::Transport(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| GenerationServiceError::Transport(format!("api error: {e}")))?;

        let decoded: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationServiceError::Malformed(e.to_string()))?;

        let candidates: Vec<String> = decoded
            .candidates
            .into_iter()
            .filter_map(|c| {
                let text: String = c
                    .content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("");
                let stripped = strip_code_fences(&text);
                if stripped.is_empty() {
                    None
                } else {
                    Some(stripped)
                }
            })
            .collect();

        if candidates.is_empty() {
            // A valid (if unhelpful) response; the caller counts it as a
            // failed attempt against the retry budget.
            warn!(model = %self.model, "generation returned no usable candidates");
        }

        Ok(candidates)
    }
}

// Request/Response types for the Gemini API

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "candidateCount")]
    candidate_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_serializes_with_camel_case_fields() {
        let body = GenerateContentRequest {
            system_instruction: Content {
                parts: vec![Part {
                    text: "write scripts".to_string(),
                }],
            },
            contents: vec![Content {
                parts: vec![Part {
                    text: "trim the clip".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                candidate_count: 3,
                temperature: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["candidateCount"], 3);
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "write scripts");
        assert!(json["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn response_with_no_candidates_decodes() {
        let decoded: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(decoded.candidates.is_empty());
    }

    #[test]
    fn response_candidate_text_decodes() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "import os\n"}, {"text": "print(1)"}]}}
            ]
        }"#;
        let decoded: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let text: String = decoded.candidates[0]
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(text, "import os\nprint(1)");
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let client = GeminiClient {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            client: Client::new(),
        };
        assert!(matches!(
            client.get_api_key(),
            Err(GenerationServiceError::Configuration(_))
        ));
    }
}
