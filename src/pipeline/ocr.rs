//! Text extraction: send the form photo to the OCR service and collect the
//! full-page text.
//!
//! The concrete client targets the Google Vision `images:annotate` endpoint
//! in `DOCUMENT_TEXT_DETECTION` mode — the forms are printed/handwritten
//! documents, so the dense document detector, not the sparse scene-text one.
//! The call is awaited to completion; no partial results are consumed and
//! nothing is retried here.

use crate::config::ServiceConfig;
use crate::error::IngestError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Seam for the OCR collaborator. The pipeline only ever needs "image bytes
/// in, document text out"; tests substitute a scripted implementation.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the full document text from one image.
    ///
    /// Returns the concatenated page text, which may be empty when the
    /// service detected nothing. Emptiness is policy, and policy belongs to
    /// the pipeline, not the client.
    async fn extract_document_text(&self, image: &[u8]) -> Result<String, IngestError>;
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: Vec<Feature<'a>>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    feature_type: &'a str,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<FullTextAnnotation>,
    error: Option<RpcStatus>,
}

#[derive(Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

// ── Client ───────────────────────────────────────────────────────────────────

const DOCUMENT_TEXT_DETECTION: &str = "DOCUMENT_TEXT_DETECTION";

/// Google Vision OCR client.
pub struct GoogleVisionOcr {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GoogleVisionOcr {
    /// Build a client from the service configuration.
    pub fn new(config: &ServiceConfig) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ocr_timeout_secs))
            .build()
            .map_err(|e| IngestError::OcrTransport {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: config.vision_endpoint.clone(),
            api_key: config.vision_api_key.clone(),
        })
    }
}

#[async_trait]
impl TextExtractor for GoogleVisionOcr {
    async fn extract_document_text(&self, image: &[u8]) -> Result<String, IngestError> {
        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: vec![Feature {
                    feature_type: DOCUMENT_TEXT_DETECTION,
                }],
            }],
        };

        debug!(bytes = image.len(), "sending image to OCR service");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| IngestError::OcrTransport {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "OCR service rejected the request");
            return Err(IngestError::OcrService {
                status: status.as_u16(),
                detail,
            });
        }

        let annotate: AnnotateResponse =
            response.json().await.map_err(|e| IngestError::OcrService {
                status: status.as_u16(),
                detail: format!("unreadable annotate response: {e}"),
            })?;

        let Some(first) = annotate.responses.into_iter().next() else {
            return Err(IngestError::OcrService {
                status: status.as_u16(),
                detail: "annotate response carried no per-image results".into(),
            });
        };

        // A 2xx envelope can still carry a per-image error status.
        if let Some(error) = first.error {
            return Err(IngestError::OcrService {
                status: status.as_u16(),
                detail: format!("annotate error {}: {}", error.code, error.message),
            });
        }

        let text = first
            .full_text_annotation
            .map(|annotation| annotation.text)
            .unwrap_or_default();

        debug!(chars = text.len(), "OCR text extracted");
        Ok(text)
    }
}
