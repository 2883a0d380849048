//! The extraction instruction sent to the generative model.
//!
//! Centralising the prompt here keeps a single source of truth for the field
//! list and lets unit tests inspect the instruction without calling a model.
//! The field names must match [`crate::report::HazardReport`] exactly — the
//! completion is parsed against that schema.

use crate::report::ObservationType;

/// Fixed instruction template. `{ocr_text}` is replaced with the OCR output,
/// `{types}` with the allowed observation-type labels.
const EXTRACTION_TEMPLATE: &str = r#"The following text is the OCR output of a hazard observation report form ("Laporan Sumber Bahaya"):

"{ocr_text}"

Extract the information from the text and return it as JSON. Identify values for these fields:
- reporter_name (the reporting person's name)
- reporter_position (their position or job title)
- location (where the observation was made)
- report_date (date of the report, formatted as YYYY-MM-DD)
- observation_type (exactly one of: {types}, whichever is marked or selected on the form)
- hazard_description (the hazard observation description)
- suggested_action (the intervention or suggested corrective action)

If a field is not found or is unclear, use null as its value.
Return valid JSON and JSON only, with no extra text. Example:
{
  "reporter_name": "Name",
  "reporter_position": "Position",
  "location": "Location",
  "report_date": "YYYY-MM-DD",
  "observation_type": "Unsafe Condition",
  "hazard_description": "Description...",
  "suggested_action": "Suggestion..."
}"#;

/// Build the single-turn extraction prompt for one OCR text.
pub fn extraction_prompt(ocr_text: &str) -> String {
    let types = ObservationType::LABELS
        .iter()
        .map(|label| format!("'{label}'"))
        .collect::<Vec<_>>()
        .join(", ");
    EXTRACTION_TEMPLATE
        .replace("{ocr_text}", ocr_text)
        .replace("{types}", &types)
}
