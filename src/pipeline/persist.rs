//! Persistence: insert the validated report as one row and return what the
//! store persisted.
//!
//! The store is an opaque PostgREST surface: one `POST /rest/v1/{table}`
//! with the service-role key. The pipeline runs as a trusted backend
//! principal, so the service-role credential (which bypasses row-level
//! security) is correct here; end-user credentials never reach this process.
//! A failed insert is terminal — there is no retry and nothing upstream to
//! roll back, since the OCR and model calls are stateless.

use crate::config::ServiceConfig;
use crate::error::IngestError;
use crate::report::HazardReport;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Seam for the persistence collaborator: a report in, the inserted row(s)
/// out.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Insert one report atomically and return the stored representation.
    async fn insert(&self, report: &HazardReport) -> Result<Vec<Value>, IngestError>;
}

/// PostgREST-backed sink (Supabase's REST surface).
pub struct SupabaseSink {
    client: Client,
    insert_url: String,
    service_role_key: String,
    table: String,
}

impl SupabaseSink {
    /// Build a sink from the service configuration.
    pub fn new(config: &ServiceConfig) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.insert_timeout_secs))
            .build()
            .map_err(|e| IngestError::InsertFailed {
                table: config.table.clone(),
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            insert_url: format!("{}/rest/v1/{}", config.store_url, config.table),
            service_role_key: config.store_service_role_key.clone(),
            table: config.table.clone(),
        })
    }
}

#[async_trait]
impl ReportSink for SupabaseSink {
    async fn insert(&self, report: &HazardReport) -> Result<Vec<Value>, IngestError> {
        debug!(table = %self.table, "inserting hazard report");

        // PostgREST takes an array of rows; `return=representation` asks for
        // the inserted rows (with store-assigned id/timestamps) back.
        let response = self
            .client
            .post(&self.insert_url)
            .header("apikey", &self.service_role_key)
            .header(
                "Authorization",
                format!("Bearer {}", self.service_role_key),
            )
            .header("Prefer", "return=representation")
            .json(&[report])
            .send()
            .await
            .map_err(|e| IngestError::InsertFailed {
                table: self.table.clone(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), table = %self.table, "insert rejected");
            return Err(IngestError::InsertFailed {
                table: self.table.clone(),
                detail: format!("HTTP {status}: {detail}"),
            });
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| IngestError::InsertFailed {
                table: self.table.clone(),
                detail: format!("unreadable insert response: {e}"),
            })?;

        debug!(rows = rows.len(), table = %self.table, "insert acknowledged");
        Ok(rows)
    }
}
