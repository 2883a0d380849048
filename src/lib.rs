//! # form2report
//!
//! Turn photographed safety-observation forms into structured hazard
//! reports.
//!
//! ## Why this crate?
//!
//! Paper "Laporan Sumber Bahaya" forms are filled in by hand in the field
//! and photographed with a phone. Typing them into the reporting system
//! loses time and introduces transcription errors. This service reads the
//! photo with a document OCR service, has a generative model map the free
//! text onto the fixed report schema, validates the result, and stores it
//! as one database row.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /process-hazard-report
//!  │
//!  ├─ 1. Gate       method + image_base64 presence + base64 decode
//!  ├─ 2. OCR        Vision images:annotate, DOCUMENT_TEXT_DETECTION
//!  ├─ 3. Structure  Gemini generateContent with the fixed extraction prompt
//!  ├─ 4. Validate   fence stripping, strict JSON parse, field validation
//!  ├─ 5. Persist    one PostgREST insert, service-role credential
//!  └─ 6. Respond    201 {"success": true, "data": [row]}  |  4xx/5xx
//! ```
//!
//! Stages run strictly in order and stop at the first failure; every
//! external call happens at most once per request. See
//! [`error::ErrorClass`] for the failure taxonomy and its response mapping.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use form2report::{AppState, Pipeline, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GOOGLE_VISION_API_KEY, GOOGLE_API_KEY, SUPABASE_URL,
//!     // SUPABASE_SERVICE_ROLE_KEY from the environment.
//!     let config = ServiceConfig::from_env()?;
//!     let pipeline = Pipeline::from_config(&config)?;
//!     form2report::serve("0.0.0.0:8787".parse()?, AppState::new(pipeline)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Enables the `form2report-server` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `server` when embedding only the library:
//! ```toml
//! form2report = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::{ErrorClass, IngestError};
pub use ingest::Pipeline;
pub use report::{HazardReport, IngestOutcome, IngestStats, ObservationType};
pub use server::{serve, AppState};
