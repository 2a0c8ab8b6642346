use httpmock::prelude::*;
use httpmock::Mock;
use medform_etl::{
    AzureFormClient, BatchEngine, CliConfig, ExtractionConfig, FormPipeline, LocalStorage,
};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const ANALYZE_PATH: &str = "/formrecognizer/documentModels/prebuilt-layout:analyze";

fn test_client(server: &MockServer) -> AzureFormClient {
    AzureFormClient::new(
        server.base_url(),
        "test-key".to_string(),
        "prebuilt-layout".to_string(),
        "2023-07-31".to_string(),
        Duration::from_millis(10),
        5,
    )
}

fn test_config(input_dir: &str, server: &MockServer) -> CliConfig {
    CliConfig {
        input_dir: input_dir.to_string(),
        endpoint: Some(server.base_url()),
        api_key: Some("test-key".to_string()),
        output: "output_diagnoses.csv".to_string(),
        config_file: None,
        icd10_file: None,
        terms_file: None,
        verbose: false,
        monitor: false,
    }
}

/// Mock one document's analysis: submit matched on the exact image bytes,
/// followed by a successful poll with the given recognized lines.
fn mock_analysis<'a>(
    server: &'a MockServer,
    image_bytes: &str,
    operation: &str,
    lines: &[&str],
) -> (Mock<'a>, Mock<'a>) {
    let operation_path = format!("/operations/{}", operation);

    let submit = server.mock(|when, then| {
        when.method(POST)
            .path(ANALYZE_PATH)
            .header("Ocp-Apim-Subscription-Key", "test-key")
            .body(image_bytes);
        then.status(202)
            .header("Operation-Location", &server.url(&operation_path));
    });

    let lines_json: Vec<serde_json::Value> = lines
        .iter()
        .map(|content| serde_json::json!({"content": content, "polygon": [0.0, 0.0, 1.0, 1.0]}))
        .collect();

    let poll = server.mock(|when, then| {
        when.method(GET).path(operation_path);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "status": "succeeded",
                "analyzeResult": {"pages": [{"lines": lines_json}]}
            }));
    });

    (submit, poll)
}

async fn run_batch(input_dir: &str, server: &MockServer, config: CliConfig) -> String {
    let storage = LocalStorage::new(input_dir.to_string());
    let pipeline = FormPipeline::new(
        storage,
        test_client(server),
        config,
        ExtractionConfig::default(),
    )
    .unwrap();

    BatchEngine::new(pipeline).run().await.unwrap()
}

#[tokio::test]
async fn test_end_to_end_batch_over_real_http() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().to_str().unwrap().to_string();

    fs::write(temp_dir.path().join("form_a.jpg"), "image-a").unwrap();
    fs::write(temp_dir.path().join("form_b.png"), "image-b").unwrap();
    fs::write(temp_dir.path().join("README.txt"), "not an image").unwrap();

    let server = MockServer::start();
    let (submit_a, poll_a) = mock_analysis(
        &server,
        "image-a",
        "a",
        &["Patient: Jane Doe", "Diagnosis:", "Type 2 Diabetes"],
    );
    let (submit_b, poll_b) = mock_analysis(
        &server,
        "image-b",
        "b",
        &["Patient: John Roe", "Impression:", "Acute Appendicitis"],
    );

    let output_path = run_batch(&input_dir, &server, test_config(&input_dir, &server)).await;

    submit_a.assert();
    poll_a.assert();
    submit_b.assert();
    poll_b.assert();

    assert!(output_path.ends_with("output_diagnoses.csv"));

    let content = fs::read_to_string(temp_dir.path().join("output_diagnoses.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "file_name,provisional_diagnosis");
    assert_eq!(lines[1], "form_a.jpg,Type 2 Diabetes");
    assert_eq!(lines[2], "form_b.png,Acute Appendicitis");
}

#[tokio::test]
async fn test_failing_image_is_skipped_and_batch_continues() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().to_str().unwrap().to_string();

    fs::write(temp_dir.path().join("bad.jpg"), "image-bad").unwrap();
    fs::write(temp_dir.path().join("good.jpg"), "image-good").unwrap();

    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path(ANALYZE_PATH).body("image-bad");
        then.status(400)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "error": {"code": "InvalidRequest", "message": "unsupported image"}
            }));
    });
    let (submit_good, _poll_good) = mock_analysis(
        &server,
        "image-good",
        "good",
        &["Diagnosis:", "Bronchial Asthma"],
    );

    run_batch(&input_dir, &server, test_config(&input_dir, &server)).await;

    submit_good.assert();

    let content = fs::read_to_string(temp_dir.path().join("output_diagnoses.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "good.jpg,Bronchial Asthma");
}

#[tokio::test]
async fn test_rerun_produces_identical_output() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().to_str().unwrap().to_string();

    fs::write(temp_dir.path().join("form.jpg"), "image-1").unwrap();

    let server = MockServer::start();
    mock_analysis(&server, "image-1", "op1", &["Diagnosis:", "Hernia"]);

    run_batch(&input_dir, &server, test_config(&input_dir, &server)).await;
    let first = fs::read_to_string(temp_dir.path().join("output_diagnoses.csv")).unwrap();

    run_batch(&input_dir, &server, test_config(&input_dir, &server)).await;
    let second = fs::read_to_string(temp_dir.path().join("output_diagnoses.csv")).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_empty_folder_writes_header_only_table() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();

    run_batch(&input_dir, &server, test_config(&input_dir, &server)).await;

    let content = fs::read_to_string(temp_dir.path().join("output_diagnoses.csv")).unwrap();
    assert_eq!(content.trim_end(), "file_name,provisional_diagnosis");
}

#[tokio::test]
async fn test_full_pipeline_with_lexicon_and_icd10() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().to_str().unwrap().to_string();

    fs::write(temp_dir.path().join("form.jpg"), "image-1").unwrap();

    let terms_path = temp_dir.path().join("medical_terms.txt");
    fs::write(&terms_path, "appendicitis\ndiabetes\n").unwrap();

    let icd10_path = temp_dir.path().join("icd10_codes.csv");
    fs::write(
        &icd10_path,
        "Level-3 Code,Level-3 Desc\nK35,Acute appendicitis\nE11,Type 2 diabetes mellitus\n",
    )
    .unwrap();

    let server = MockServer::start();
    // The OCR misreads the trailing "is"; the lexicon repairs it before the
    // ICD-10 lookup runs.
    mock_analysis(
        &server,
        "image-1",
        "op1",
        &["Provisional Diagnosis:", "acute appendicitos"],
    );

    let mut config = test_config(&input_dir, &server);
    config.terms_file = Some(terms_path.to_str().unwrap().to_string());
    config.icd10_file = Some(icd10_path.to_str().unwrap().to_string());

    run_batch(&input_dir, &server, config).await;

    let content = fs::read_to_string(temp_dir.path().join("output_diagnoses.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines[0],
        "file_name,provisional_diagnosis,icd10_code,icd10_description"
    );
    assert_eq!(lines[1], "form.jpg,acute appendicitis,K35,Acute appendicitis");
}
