//! HTTP surface: the request gate and the response composer.
//!
//! One route accepts submissions (`POST /process-hazard-report`); a liveness
//! route (`GET /health`) answers deployment probes. The gate validates the
//! request shape before any external call; the composer is the single place
//! a pipeline outcome becomes an HTTP response, so the error taxonomy maps
//! to statuses in exactly one match.
//!
//! Response contract:
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | wrong method | 405 | plain text |
//! | missing/undecodable image | 400 | plain text |
//! | no text detected | 400 | plain text |
//! | OCR/model upstream failure | 502 | `{"error": …}` |
//! | unparsable or invalid model output | 500 | `{"error": …}` |
//! | insert failure | 500 | `{"error": …}` |
//! | success | 201 | `{"success": true, "data": [rows]}` |

use crate::error::{ErrorClass, IngestError};
use crate::ingest::Pipeline;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Shared application state: the assembled pipeline.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// One form submission. `image_base64` is optional at the type level so its
/// absence is our 400, not a deserialisation rejection.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/process-hazard-report",
            post(process_hazard_report).fallback(method_not_allowed),
        )
        .route("/health", get(health))
        .with_state(state)
}

/// Bind and serve until the listener is closed.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("form2report listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "OK"
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response()
}

async fn process_hazard_report(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    // Gate: the image field must be present and non-empty before anything
    // leaves this process.
    let Some(image_base64) = request.image_base64.filter(|s| !s.is_empty()) else {
        return compose_error(&IngestError::MissingImage);
    };

    match state.pipeline.process(&image_base64).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "data": outcome.rows })),
        )
            .into_response(),
        Err(err) => compose_error(&err),
    }
}

// ── Response composition ─────────────────────────────────────────────────────

/// Map a pipeline error to its response, logging it appropriately.
fn compose_error(err: &IngestError) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match err.class() {
        ErrorClass::InvalidRequest => {
            warn!(%err, "request rejected");
            // Client errors are plain text, mirroring the gate's contract.
            (status, err.to_string()).into_response()
        }
        ErrorClass::MalformedAiOutput => {
            // The raw completion is the only evidence of what the model did;
            // log it for diagnosis but never echo it to the caller.
            error!(%err, raw = err.raw_output().unwrap_or(""), "model output rejected");
            (status, Json(json!({ "error": err.to_string() }))).into_response()
        }
        ErrorClass::UpstreamServiceFailure | ErrorClass::PersistenceFailure => {
            error!(%err, "pipeline failed");
            (status, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}
