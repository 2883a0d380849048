//! The ingest pipeline: one form photo in, one persisted report out.
//!
//! [`Pipeline::process`] is the orchestrator the HTTP layer calls. It runs
//! the stages strictly in order — decode, OCR, structure, insert — and stops
//! at the first failure; the `?` chain makes the stop-on-first-failure
//! contract structural rather than conventional. The pipeline itself is
//! stateless between invocations: any number of `process` calls may run
//! concurrently on independent requests.

use crate::config::ServiceConfig;
use crate::error::IngestError;
use crate::pipeline::ocr::{GoogleVisionOcr, TextExtractor};
use crate::pipeline::persist::{ReportSink, SupabaseSink};
use crate::pipeline::structurer::{structure_report, CompletionModel, GeminiModel};
use crate::report::{IngestOutcome, IngestStats};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// The assembled pipeline: three collaborators behind their seams.
pub struct Pipeline {
    ocr: Arc<dyn TextExtractor>,
    model: Arc<dyn CompletionModel>,
    sink: Arc<dyn ReportSink>,
}

impl Pipeline {
    /// Wire the production collaborators from the service configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, IngestError> {
        Ok(Self {
            ocr: Arc::new(GoogleVisionOcr::new(config)?),
            model: Arc::new(GeminiModel::new(config)?),
            sink: Arc::new(SupabaseSink::new(config)?),
        })
    }

    /// Assemble a pipeline from explicit collaborators.
    ///
    /// This is the seam integration tests use to substitute scripted OCR,
    /// model, and store implementations.
    pub fn new(
        ocr: Arc<dyn TextExtractor>,
        model: Arc<dyn CompletionModel>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self { ocr, model, sink }
    }

    /// Run one submission through the full pipeline.
    ///
    /// # Errors
    /// Every stage failure surfaces as an [`IngestError`]; see
    /// [`crate::error::ErrorClass`] for how each maps to a response. No
    /// external call is made after the first failure, and none is ever
    /// retried.
    pub async fn process(&self, image_base64: &str) -> Result<IngestOutcome, IngestError> {
        let total_start = Instant::now();
        let mut stats = IngestStats::default();

        // ── Step 1: Decode the image payload ─────────────────────────────
        let image = decode_image(image_base64)?;
        stats.image_bytes = image.len();

        // ── Step 2: Document text detection ──────────────────────────────
        let ocr_start = Instant::now();
        let text = self.ocr.extract_document_text(&image).await?;
        stats.ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;
        stats.extracted_chars = text.chars().count();

        // A blank or unreadable photo, not a transient fault: stop before
        // spending a model call on empty text.
        if text.trim().is_empty() {
            warn!("OCR detected no text; terminating before model call");
            return Err(IngestError::NoTextDetected);
        }
        info!(
            chars = stats.extracted_chars,
            ms = stats.ocr_duration_ms,
            "text extracted"
        );

        // ── Step 3: Structure into the report schema ─────────────────────
        let model_start = Instant::now();
        let report = structure_report(self.model.as_ref(), &text).await?;
        stats.model_duration_ms = model_start.elapsed().as_millis() as u64;
        info!(
            observation_type = ?report.observation_type,
            ms = stats.model_duration_ms,
            "report structured"
        );

        // ── Step 4: Persist ──────────────────────────────────────────────
        let insert_start = Instant::now();
        let rows = self.sink.insert(&report).await?;
        stats.insert_duration_ms = insert_start.elapsed().as_millis() as u64;

        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        info!(
            rows = rows.len(),
            total_ms = stats.total_duration_ms,
            "report persisted"
        );

        Ok(IngestOutcome {
            report,
            rows,
            stats,
        })
    }
}

/// Decode the inbound base64 image payload.
///
/// Runs at the gate so an undecodable payload is rejected before any
/// external call. The OCR client re-encodes for its own wire format.
pub fn decode_image(image_base64: &str) -> Result<Vec<u8>, IngestError> {
    STANDARD
        .decode(image_base64.trim())
        .map_err(|e| IngestError::InvalidImageEncoding {
            detail: e.to_string(),
        })
}
