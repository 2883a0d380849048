//! Error types for the form2report pipeline.
//!
//! One enum, [`IngestError`], covers every way an ingest can fail. Each
//! variant belongs to exactly one [`ErrorClass`]; the class decides how the
//! HTTP boundary renders the failure (status code, plain text vs. JSON) and
//! how it is logged. Stages return `Result<_, IngestError>` and propagate
//! with `?` — no failure crosses the server boundary as a panic.

use thiserror::Error;

/// The four failure classes of the ingest pipeline.
///
/// | Class | Facing | Retry guidance |
/// |-------|--------|----------------|
/// | `InvalidRequest` | client | caller retries with different input |
/// | `UpstreamServiceFailure` | server | not retried internally |
/// | `MalformedAiOutput` | server | not retried (generative call is non-deterministic) |
/// | `PersistenceFailure` | server | not retried |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidRequest,
    UpstreamServiceFailure,
    MalformedAiOutput,
    PersistenceFailure,
}

/// All errors returned by the form2report pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The request body carried no `image_base64` field (or an empty one).
    #[error("Missing image_base64 in request body")]
    MissingImage,

    /// The `image_base64` payload could not be decoded as base64.
    #[error("image_base64 is not valid base64: {detail}")]
    InvalidImageEncoding { detail: String },

    /// OCR completed but found no text. The image is presumed blank or
    /// unreadable, not a transient fault, so the caller gets a 4xx.
    #[error("No text detected in image")]
    NoTextDetected,

    // ── OCR service errors ────────────────────────────────────────────────
    /// The OCR request never produced a response (connect/timeout/transport).
    #[error("OCR request failed: {detail}")]
    OcrTransport { detail: String },

    /// The OCR service answered with a non-success status.
    #[error("OCR service returned HTTP {status}: {detail}")]
    OcrService { status: u16, detail: String },

    // ── Model service errors ──────────────────────────────────────────────
    /// The model request never produced a response (connect/timeout/transport).
    #[error("Model request failed: {detail}")]
    ModelTransport { detail: String },

    /// The model service answered with a non-success status.
    #[error("Model service returned HTTP {status}: {detail}")]
    ModelService { status: u16, detail: String },

    /// A 2xx model response carried no usable completion text. Distinct from
    /// a parse failure: this is the malformed-call / exhausted-quota shape.
    #[error("Model response contained no completion content")]
    MissingModelContent,

    // ── Model output errors ───────────────────────────────────────────────
    /// The cleaned completion was not parseable JSON. Carries the unparsed
    /// text so the failure can be diagnosed from logs.
    #[error("Model output was not valid JSON: {detail}")]
    MalformedModelOutput { raw: String, detail: String },

    /// The completion parsed as JSON but violated the report schema
    /// (wrong value type, unknown observation type, malformed date).
    #[error("Model output failed schema validation: {detail}")]
    SchemaViolation { raw: String, detail: String },

    // ── Persistence errors ────────────────────────────────────────────────
    /// The store rejected or never acknowledged the insert.
    #[error("Insert into '{table}' failed: {detail}")]
    InsertFailed { table: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Construction-time configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IngestError {
    /// The failure class this variant belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            IngestError::MissingImage
            | IngestError::InvalidImageEncoding { .. }
            | IngestError::NoTextDetected => ErrorClass::InvalidRequest,

            IngestError::OcrTransport { .. }
            | IngestError::OcrService { .. }
            | IngestError::ModelTransport { .. }
            | IngestError::ModelService { .. }
            | IngestError::MissingModelContent => ErrorClass::UpstreamServiceFailure,

            IngestError::MalformedModelOutput { .. } | IngestError::SchemaViolation { .. } => {
                ErrorClass::MalformedAiOutput
            }

            IngestError::InsertFailed { .. } => ErrorClass::PersistenceFailure,

            // Config errors are caught at startup; if one ever reaches the
            // boundary it is a server-side fault.
            IngestError::InvalidConfig(_) => ErrorClass::PersistenceFailure,
        }
    }

    /// HTTP status code the response composer uses for this error.
    ///
    /// Upstream dependency failures map to 502 so callers can tell a broken
    /// collaborator apart from a broken pipeline; everything else server-side
    /// is 500.
    pub fn status(&self) -> u16 {
        match self.class() {
            ErrorClass::InvalidRequest => 400,
            ErrorClass::UpstreamServiceFailure => 502,
            ErrorClass::MalformedAiOutput | ErrorClass::PersistenceFailure => 500,
        }
    }

    /// Whether this error is reported to the caller as their fault (4xx).
    pub fn is_client_error(&self) -> bool {
        self.class() == ErrorClass::InvalidRequest
    }

    /// The raw model payload attached to output errors, for diagnostics.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            IngestError::MalformedModelOutput { raw, .. }
            | IngestError::SchemaViolation { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_image_is_client_error() {
        let e = IngestError::MissingImage;
        assert_eq!(e.class(), ErrorClass::InvalidRequest);
        assert_eq!(e.status(), 400);
        assert!(e.is_client_error());
        assert_eq!(e.to_string(), "Missing image_base64 in request body");
    }

    #[test]
    fn no_text_detected_is_client_error() {
        let e = IngestError::NoTextDetected;
        assert_eq!(e.status(), 400);
        assert_eq!(e.to_string(), "No text detected in image");
    }

    #[test]
    fn upstream_failures_are_502() {
        let e = IngestError::OcrService {
            status: 403,
            detail: "key revoked".into(),
        };
        assert_eq!(e.class(), ErrorClass::UpstreamServiceFailure);
        assert_eq!(e.status(), 502);
        assert!(e.to_string().contains("403"));

        let e = IngestError::MissingModelContent;
        assert_eq!(e.status(), 502);
    }

    #[test]
    fn malformed_output_keeps_raw_payload() {
        let e = IngestError::MalformedModelOutput {
            raw: "not json".into(),
            detail: "expected value at line 1".into(),
        };
        assert_eq!(e.class(), ErrorClass::MalformedAiOutput);
        assert_eq!(e.status(), 500);
        assert_eq!(e.raw_output(), Some("not json"));
    }

    #[test]
    fn insert_failed_names_the_table() {
        let e = IngestError::InsertFailed {
            table: "hazard_reports".into(),
            detail: "duplicate key value violates unique constraint".into(),
        };
        assert_eq!(e.class(), ErrorClass::PersistenceFailure);
        assert!(e.to_string().contains("hazard_reports"));
        assert!(e.to_string().contains("duplicate key"));
    }
}
