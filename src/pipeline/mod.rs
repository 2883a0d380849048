//! Pipeline stages for form-photo-to-hazard-report ingestion.
//!
//! Each submodule implements exactly one stage. Keeping stages separate
//! makes each independently testable and lets tests substitute a single
//! collaborator (OCR, model, store) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! image ──▶ ocr ──▶ structurer ──▶ postprocess ──▶ persist
//! (bytes)  (Vision) (Gemini)      (fences, parse,  (PostgREST
//!                                  validation)      insert)
//! ```
//!
//! 1. [`ocr`]         — document text detection via the Vision annotate API;
//!    the first of the three network stages
//! 2. [`structurer`]  — single-turn model completion mapping free text onto
//!    the report schema
//! 3. [`postprocess`] — deterministic completion cleanup (fence stripping)
//!    before the strict JSON parse
//! 4. [`persist`]     — one atomic row insert through the store's REST
//!    surface
//!
//! Stages run strictly sequentially; each consumes the previous stage's
//! output, so there is nothing to parallelise inside one invocation.

pub mod ocr;
pub mod persist;
pub mod postprocess;
pub mod structurer;
