//! Pipeline integration tests against scripted collaborators.
//!
//! Every external dependency is a counting double, so each test can assert
//! both the outcome and the call-gating contract: stages after a failure
//! are never invoked, and nothing is ever invoked twice.

mod common;

use common::{
    pipeline, RecordingSink, ScriptedModel, ScriptedOcr, COMPLETE_REPORT_JSON, SAMPLE_OCR_TEXT,
};
use form2report::{IngestError, ObservationType};

#[tokio::test]
async fn legible_form_is_extracted_structured_and_persisted() {
    let ocr = ScriptedOcr::text(SAMPLE_OCR_TEXT);
    let model = ScriptedModel::completing(COMPLETE_REPORT_JSON);
    let sink = RecordingSink::accepting();

    let outcome = pipeline(&ocr, &model, &sink)
        .process(&common::sample_image_base64())
        .await
        .expect("happy path should persist");

    assert_eq!(ocr.call_count(), 1);
    assert_eq!(model.call_count(), 1);
    assert_eq!(sink.call_count(), 1);

    assert_eq!(outcome.report.reporter_name.as_deref(), Some("Budi"));
    assert_eq!(
        outcome.report.observation_type,
        Some(ObservationType::UnsafeCondition)
    );

    assert_eq!(outcome.rows.len(), 1);
    let row = &outcome.rows[0];
    assert_eq!(row["id"], 1);
    assert_eq!(row["reporter_name"], "Budi");
    assert_eq!(row["location"], "Plant A");
    assert_eq!(row["report_date"], "2024-03-12");
    assert_eq!(row["observation_type"], "Unsafe Condition");
    assert_eq!(row["hazard_description"], "Oil spill");
    assert_eq!(row["suggested_action"], "Clean up");
}

#[tokio::test]
async fn undecodable_payload_is_rejected_before_any_external_call() {
    let ocr = ScriptedOcr::text(SAMPLE_OCR_TEXT);
    let model = ScriptedModel::completing(COMPLETE_REPORT_JSON);
    let sink = RecordingSink::accepting();

    let err = pipeline(&ocr, &model, &sink)
        .process("@@@not-base64@@@")
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::InvalidImageEncoding { .. }));
    assert_eq!(ocr.call_count(), 0);
    assert_eq!(model.call_count(), 0);
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
async fn blank_image_short_circuits_before_the_model() {
    let ocr = ScriptedOcr::text("");
    let model = ScriptedModel::completing(COMPLETE_REPORT_JSON);
    let sink = RecordingSink::accepting();

    let err = pipeline(&ocr, &model, &sink)
        .process(&common::sample_image_base64())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::NoTextDetected));
    assert!(err.is_client_error());
    assert_eq!(ocr.call_count(), 1);
    assert_eq!(model.call_count(), 0);
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
async fn whitespace_only_text_counts_as_no_text() {
    let ocr = ScriptedOcr::text("  \n\t ");
    let model = ScriptedModel::completing(COMPLETE_REPORT_JSON);
    let sink = RecordingSink::accepting();

    let err = pipeline(&ocr, &model, &sink)
        .process(&common::sample_image_base64())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::NoTextDetected));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn ocr_failure_propagates_without_reaching_the_model() {
    let ocr = ScriptedOcr::failing();
    let model = ScriptedModel::completing(COMPLETE_REPORT_JSON);
    let sink = RecordingSink::accepting();

    let err = pipeline(&ocr, &model, &sink)
        .process(&common::sample_image_base64())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::OcrService { .. }));
    assert_eq!(ocr.call_count(), 1, "OCR is attempted exactly once");
    assert_eq!(model.call_count(), 0);
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
async fn fenced_completion_with_nulls_is_stripped_parsed_and_persisted() {
    let fenced = "```json\n{\"reporter_name\":null,\"reporter_position\":null,\
                  \"location\":null,\"report_date\":null,\"observation_type\":null,\
                  \"hazard_description\":\"Kabel terkelupas\",\"suggested_action\":null}\n```";
    let ocr = ScriptedOcr::text("kabel terkelupas di area workshop");
    let model = ScriptedModel::completing(fenced);
    let sink = RecordingSink::accepting();

    let outcome = pipeline(&ocr, &model, &sink)
        .process(&common::sample_image_base64())
        .await
        .expect("fenced output should still parse");

    let inserted = sink.last_inserted().unwrap();
    assert_eq!(inserted.reporter_name, None);
    assert_eq!(
        inserted.hazard_description.as_deref(),
        Some("Kabel terkelupas")
    );

    // Nulls are preserved in the persisted row, not dropped.
    let row = &outcome.rows[0];
    assert!(row["reporter_name"].is_null());
    assert!(row["suggested_action"].is_null());
}

#[tokio::test]
async fn non_json_completion_never_reaches_the_sink() {
    let ocr = ScriptedOcr::text(SAMPLE_OCR_TEXT);
    let model = ScriptedModel::completing("Sorry, I could not find any fields in this text.");
    let sink = RecordingSink::accepting();

    let err = pipeline(&ocr, &model, &sink)
        .process(&common::sample_image_base64())
        .await
        .unwrap_err();

    match &err {
        IngestError::MalformedModelOutput { raw, .. } => {
            assert!(raw.contains("Sorry"), "raw completion kept for diagnosis");
        }
        other => panic!("expected MalformedModelOutput, got {other:?}"),
    }
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
async fn out_of_set_observation_type_never_reaches_the_sink() {
    let ocr = ScriptedOcr::text(SAMPLE_OCR_TEXT);
    let model = ScriptedModel::completing(r#"{"observation_type": "Near Miss"}"#);
    let sink = RecordingSink::accepting();

    let err = pipeline(&ocr, &model, &sink)
        .process(&common::sample_image_base64())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::SchemaViolation { .. }));
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
async fn model_without_content_is_an_upstream_failure() {
    let ocr = ScriptedOcr::text(SAMPLE_OCR_TEXT);
    let model = ScriptedModel::without_content();
    let sink = RecordingSink::accepting();

    let err = pipeline(&ocr, &model, &sink)
        .process(&common::sample_image_base64())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::MissingModelContent));
    assert_eq!(err.status(), 502);
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
async fn insert_failure_surfaces_without_repeating_upstream_calls() {
    let ocr = ScriptedOcr::text(SAMPLE_OCR_TEXT);
    let model = ScriptedModel::completing(COMPLETE_REPORT_JSON);
    let sink = RecordingSink::rejecting("duplicate key value violates unique constraint");

    let err = pipeline(&ocr, &model, &sink)
        .process(&common::sample_image_base64())
        .await
        .unwrap_err();

    match &err {
        IngestError::InsertFailed { detail, .. } => {
            assert!(detail.contains("unique constraint"));
        }
        other => panic!("expected InsertFailed, got {other:?}"),
    }
    assert_eq!(ocr.call_count(), 1, "OCR not re-invoked");
    assert_eq!(model.call_count(), 1, "model not re-invoked");
    assert_eq!(sink.call_count(), 1, "insert attempted exactly once");
}

#[tokio::test]
async fn stats_reflect_the_stages_that_ran() {
    let ocr = ScriptedOcr::text(SAMPLE_OCR_TEXT);
    let model = ScriptedModel::completing(COMPLETE_REPORT_JSON);
    let sink = RecordingSink::accepting();

    let outcome = pipeline(&ocr, &model, &sink)
        .process(&common::sample_image_base64())
        .await
        .unwrap();

    assert!(outcome.stats.image_bytes > 0);
    assert_eq!(
        outcome.stats.extracted_chars,
        SAMPLE_OCR_TEXT.chars().count()
    );
}
