//! Schema structuring: turn free OCR text into a validated [`HazardReport`].
//!
//! This stage owns the one generative-model call and everything after it:
//! prompt construction (from [`crate::prompts`]), completion cleanup, strict
//! JSON parsing, and field validation. The model call is made exactly once —
//! a generative completion is non-deterministic, so a retry has no
//! convergence guarantee and is not attempted.

use crate::config::ServiceConfig;
use crate::error::IngestError;
use crate::pipeline::postprocess;
use crate::prompts;
use crate::report::HazardReport;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Seam for the generative-model collaborator: one prompt in, the raw
/// completion text out.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Run a single-turn completion and return its text.
    ///
    /// Implementations must report a response without usable completion text
    /// as [`IngestError::MissingModelContent`].
    async fn complete(&self, prompt: &str) -> Result<String, IngestError>;
}

/// Structure one OCR text into a validated report.
///
/// The cleanup step runs on every completion, fenced or not; the parsed
/// object is then validated field-by-field before it may reach the store.
pub async fn structure_report(
    model: &dyn CompletionModel,
    ocr_text: &str,
) -> Result<HazardReport, IngestError> {
    let prompt = prompts::extraction_prompt(ocr_text);
    let completion = model.complete(&prompt).await?;

    let cleaned = postprocess::clean_completion(&completion);
    let value: serde_json::Value =
        serde_json::from_str(&cleaned).map_err(|e| IngestError::MalformedModelOutput {
            raw: completion.clone(),
            detail: e.to_string(),
        })?;

    HazardReport::from_model_value(&value)
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Gemini `generateContent` client.
pub struct GeminiModel {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiModel {
    /// Build a client from the service configuration.
    pub fn new(config: &ServiceConfig) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.model_timeout_secs))
            .build()
            .map_err(|e| IngestError::ModelTransport {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.model_base_url.clone(),
            model: config.model.clone(),
            api_key: config.model_api_key.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[async_trait]
impl CompletionModel for GeminiModel {
    async fn complete(&self, prompt: &str) -> Result<String, IngestError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, prompt_chars = prompt.len(), "requesting completion");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| IngestError::ModelTransport {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                "model service rejected the request"
            );
            return Err(IngestError::ModelService {
                status: status.as_u16(),
                detail,
            });
        }

        let raw = response
            .text()
            .await
            .map_err(|e| IngestError::ModelService {
                status: status.as_u16(),
                detail: format!("unreadable completion response: {e}"),
            })?;

        extract_completion_text(&raw)
    }
}

/// Pull the completion text out of a `generateContent` response body.
///
/// The text lives at `candidates[0].content.parts[*].text`; a response where
/// that path is absent or empty is the malformed-call / quota-exhausted
/// shape and maps to [`IngestError::MissingModelContent`].
fn extract_completion_text(raw: &str) -> Result<String, IngestError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(raw).map_err(|_| IngestError::MissingModelContent)?;

    let text = parsed
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|part| part.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(IngestError::MissingModelContent);
    }

    debug!(completion_chars = text.len(), "completion received");
    Ok(text)
}
