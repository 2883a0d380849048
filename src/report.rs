//! The hazard-report schema and its validation.
//!
//! [`HazardReport`] is the target of the whole pipeline: seven fields, every
//! one nullable, always fully keyed. The model is *asked* to emit exactly
//! this shape, but its output is not contractually guaranteed, so
//! [`HazardReport::from_model_value`] re-validates every field before the
//! record is allowed anywhere near the store. Violations are reported as
//! schema errors rather than coerced — guessing what the model meant would
//! silently corrupt reports.

use crate::error::IngestError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The closed set of observation types a form can carry.
///
/// `Intervensi` is the form's own label for an intervention record and is
/// stored verbatim; translating it would desynchronise the database from the
/// printed forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "Unsafe Condition")]
    UnsafeCondition,
    #[serde(rename = "Unsafe Action")]
    UnsafeAction,
    #[serde(rename = "Intervensi")]
    Intervensi,
}

impl ObservationType {
    /// All wire labels, in the order the prompt enumerates them.
    pub const LABELS: [&'static str; 3] = ["Unsafe Condition", "Unsafe Action", "Intervensi"];

    /// Parse a wire label. Exact match only; the prompt tells the model the
    /// allowed values, so anything else is a schema violation upstream.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Unsafe Condition" => Some(ObservationType::UnsafeCondition),
            "Unsafe Action" => Some(ObservationType::UnsafeAction),
            "Intervensi" => Some(ObservationType::Intervensi),
            _ => None,
        }
    }

    /// The wire label for this variant.
    pub fn as_label(&self) -> &'static str {
        match self {
            ObservationType::UnsafeCondition => "Unsafe Condition",
            ObservationType::UnsafeAction => "Unsafe Action",
            ObservationType::Intervensi => "Intervensi",
        }
    }
}

impl fmt::Display for ObservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

static RE_REPORT_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// A structured hazard report extracted from one photographed form.
///
/// Serialisation always emits all seven keys; absent or ambiguous source
/// fields are explicit nulls, never dropped keys, so every inserted row has
/// the same column footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardReport {
    pub reporter_name: Option<String>,
    pub reporter_position: Option<String>,
    pub location: Option<String>,
    /// ISO date, `YYYY-MM-DD`.
    pub report_date: Option<String>,
    pub observation_type: Option<ObservationType>,
    pub hazard_description: Option<String>,
    pub suggested_action: Option<String>,
}

impl HazardReport {
    /// Field names of the report schema, in column order.
    pub const FIELDS: [&'static str; 7] = [
        "reporter_name",
        "reporter_position",
        "location",
        "report_date",
        "observation_type",
        "hazard_description",
        "suggested_action",
    ];

    /// Validate and normalise a parsed model completion into a report.
    ///
    /// Rules:
    /// - the value must be a JSON object;
    /// - a missing key normalises to an explicit null;
    /// - `null` stays null, a string is taken as-is, anything else
    ///   (number, bool, array, object) is a schema violation;
    /// - `observation_type` must be one of [`ObservationType::LABELS`];
    /// - `report_date` must be shaped `YYYY-MM-DD`.
    ///
    /// Keys outside the schema are ignored; the original pipeline only ever
    /// forwarded the seven named fields.
    pub fn from_model_value(value: &Value) -> Result<Self, IngestError> {
        let raw = value.to_string();
        let violation = |detail: String| IngestError::SchemaViolation {
            raw: raw.clone(),
            detail,
        };

        let object = value
            .as_object()
            .ok_or_else(|| violation(format!("expected a JSON object, got {}", kind_of(value))))?;

        let text_field = |name: &str| -> Result<Option<String>, IngestError> {
            match object.get(name) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(violation(format!(
                    "field '{name}' must be a string or null, got {}",
                    kind_of(other)
                ))),
            }
        };

        let report_date = match text_field("report_date")? {
            None => None,
            Some(date) if RE_REPORT_DATE.is_match(&date) => Some(date),
            Some(date) => {
                return Err(violation(format!(
                    "field 'report_date' must be YYYY-MM-DD, got '{date}'"
                )))
            }
        };

        let observation_type = match text_field("observation_type")? {
            None => None,
            Some(label) => Some(ObservationType::from_label(&label).ok_or_else(|| {
                violation(format!(
                    "field 'observation_type' must be one of {:?}, got '{label}'",
                    ObservationType::LABELS
                ))
            })?),
        };

        Ok(Self {
            reporter_name: text_field("reporter_name")?,
            reporter_position: text_field("reporter_position")?,
            location: text_field("location")?,
            report_date,
            observation_type,
            hazard_description: text_field("hazard_description")?,
            suggested_action: text_field("suggested_action")?,
        })
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Per-stage timings and sizes for one completed ingest.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    /// Bytes of decoded image submitted to OCR.
    pub image_bytes: usize,
    /// Characters of text the OCR service detected.
    pub extracted_chars: usize,
    pub ocr_duration_ms: u64,
    pub model_duration_ms: u64,
    pub insert_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The result of one successful ingest: the validated report, the row set
/// the store returned for it, and stage timings.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub report: HazardReport,
    /// Inserted row(s) as returned by the store, including store-assigned
    /// identity and timestamps.
    pub rows: Vec<Value>,
    pub stats: IngestStats,
}
