//! Scripted collaborator doubles for the integration suites.
//!
//! Each double counts its invocations so tests can assert the pipeline's
//! call-gating contract: no external call after a failure, no call at all
//! when the gate rejects.

// Each integration binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

use async_trait::async_trait;
use form2report::pipeline::ocr::TextExtractor;
use form2report::pipeline::persist::ReportSink;
use form2report::pipeline::structurer::CompletionModel;
use form2report::{HazardReport, IngestError, Pipeline};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// OCR double: replays a fixed outcome.
pub struct ScriptedOcr {
    reply: Result<String, ()>,
    pub calls: AtomicUsize,
}

impl ScriptedOcr {
    /// Always detects `text`.
    pub fn text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Always fails as the OCR service.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for ScriptedOcr {
    async fn extract_document_text(&self, _image: &[u8]) -> Result<String, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(()) => Err(IngestError::OcrService {
                status: 500,
                detail: "annotate backend unavailable".into(),
            }),
        }
    }
}

/// Model double: replays a fixed completion (or the no-content failure).
pub struct ScriptedModel {
    completion: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedModel {
    /// Always completes with `completion`.
    pub fn completing(completion: &str) -> Arc<Self> {
        Arc::new(Self {
            completion: Some(completion.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Always reports a response with no usable content.
    pub fn without_content() -> Arc<Self> {
        Arc::new(Self {
            completion: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, _prompt: &str) -> Result<String, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.completion {
            Some(text) => Ok(text.clone()),
            None => Err(IngestError::MissingModelContent),
        }
    }
}

/// Sink double: records what it was asked to insert.
pub struct RecordingSink {
    failure: Option<String>,
    pub calls: AtomicUsize,
    pub inserted: Mutex<Option<HazardReport>>,
}

impl RecordingSink {
    /// Accepts every insert, echoing the row back with a store-assigned id.
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            failure: None,
            calls: AtomicUsize::new(0),
            inserted: Mutex::new(None),
        })
    }

    /// Rejects every insert with `detail` (e.g. a constraint violation).
    pub fn rejecting(detail: &str) -> Arc<Self> {
        Arc::new(Self {
            failure: Some(detail.to_string()),
            calls: AtomicUsize::new(0),
            inserted: Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_inserted(&self) -> Option<HazardReport> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn insert(&self, report: &HazardReport) -> Result<Vec<Value>, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(detail) = &self.failure {
            return Err(IngestError::InsertFailed {
                table: "hazard_reports".into(),
                detail: detail.clone(),
            });
        }
        *self.inserted.lock().unwrap() = Some(report.clone());

        let mut row = serde_json::to_value(report).unwrap();
        let object = row.as_object_mut().unwrap();
        object.insert("id".into(), json!(1));
        object.insert("created_at".into(), json!("2024-03-12T08:00:00Z"));
        Ok(vec![row])
    }
}

/// Assemble a pipeline from the three doubles.
pub fn pipeline(
    ocr: &Arc<ScriptedOcr>,
    model: &Arc<ScriptedModel>,
    sink: &Arc<RecordingSink>,
) -> Pipeline {
    let ocr: Arc<dyn TextExtractor> = ocr.clone();
    let model: Arc<dyn CompletionModel> = model.clone();
    let sink: Arc<dyn ReportSink> = sink.clone();
    Pipeline::new(ocr, model, sink)
}

/// A small valid JPEG-ish payload, base64-encoded.
pub fn sample_image_base64() -> String {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    STANDARD.encode(b"\xff\xd8\xff\xe0 not a real jpeg \xff\xd9")
}

/// The model completion used by the happy-path scenario.
pub const COMPLETE_REPORT_JSON: &str = r#"{
  "reporter_name": "Budi",
  "reporter_position": "Supervisor",
  "location": "Plant A",
  "report_date": "2024-03-12",
  "observation_type": "Unsafe Condition",
  "hazard_description": "Oil spill",
  "suggested_action": "Clean up"
}"#;

/// OCR text for the happy-path scenario.
pub const SAMPLE_OCR_TEXT: &str = "LAPORAN SUMBER BAHAYA\n\
    Nama Pelapor: Budi\n\
    Jabatan: Supervisor\n\
    Lokasi: Plant A\n\
    Tanggal: 12 Maret 2024\n\
    [X] Unsafe Condition  [ ] Unsafe Action  [ ] Intervensi\n\
    Uraian: Oil spill\n\
    Saran: Clean up";
