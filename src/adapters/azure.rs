//! REST client for the Azure Document Intelligence layout model.
//!
//! Analysis is a long-running operation: the document is POSTed to the
//! `:analyze` route, the service answers `202 Accepted` with an
//! `Operation-Location` header, and that URL is polled until the operation
//! settles.

use crate::domain::model::RecognizedLine;
use crate::domain::ports::OcrClient;
use crate::utils::error::{PipelineError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

pub struct AzureFormClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model_id: String,
    api_version: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl AzureFormClient {
    pub fn new(
        endpoint: String,
        api_key: String,
        model_id: String,
        api_version: String,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            api_key,
            model_id,
            api_version,
            poll_interval,
            max_polls,
        }
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}:analyze?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.model_id,
            self.api_version
        )
    }

    /// Submit the document and return the operation URL to poll.
    async fn submit(&self, image: &[u8]) -> Result<String> {
        let response = self
            .client
            .post(self.analyze_url())
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::ACCEPTED {
            return Err(rejection_error(response).await);
        }

        response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| PipelineError::ProcessingError {
                message: "analyze response carried no Operation-Location header".to_string(),
            })
    }

    async fn await_result(&self, operation_url: &str) -> Result<AnalyzeResult> {
        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let response = self
                .client
                .get(operation_url)
                .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(rejection_error(response).await);
            }

            let operation: AnalyzeOperation = response.json().await?;
            match operation.status.as_str() {
                "succeeded" => {
                    return operation
                        .analyze_result
                        .ok_or_else(|| PipelineError::ProcessingError {
                            message: "operation succeeded without an analyzeResult".to_string(),
                        })
                }
                "failed" => {
                    return Err(match operation.error {
                        Some(e) => PipelineError::ServiceError {
                            code: e.code,
                            message: e.message,
                        },
                        None => PipelineError::ServiceError {
                            code: "Unknown".to_string(),
                            message: "operation failed without error details".to_string(),
                        },
                    })
                }
                status => {
                    tracing::debug!(
                        "operation {} (poll {}/{})",
                        status,
                        attempt,
                        self.max_polls
                    );
                }
            }
        }

        Err(PipelineError::OperationTimeout {
            attempts: self.max_polls,
        })
    }
}

impl OcrClient for AzureFormClient {
    async fn analyze(&self, image: &[u8]) -> Result<Vec<RecognizedLine>> {
        tracing::debug!("Submitting {} bytes to {}", image.len(), self.analyze_url());
        let operation_url = self.submit(image).await?;

        tracing::debug!("Analysis accepted, polling {}", operation_url);
        let result = self.await_result(&operation_url).await?;

        let lines: Vec<RecognizedLine> = result
            .pages
            .into_iter()
            .flat_map(|page| page.lines)
            .map(|line| RecognizedLine::new(line.content, line.polygon))
            .collect();

        if lines.is_empty() {
            return Err(PipelineError::EmptyResult);
        }

        Ok(lines)
    }
}

async fn rejection_error(response: reqwest::Response) -> PipelineError {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => PipelineError::ServiceError {
            code: body.error.code,
            message: body.error.message,
        },
        Err(_) => PipelineError::ServiceError {
            code: status.to_string(),
            message: "request rejected".to_string(),
        },
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResult {
    #[serde(default)]
    pages: Vec<AnalyzePage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzePage {
    #[serde(default)]
    lines: Vec<AnalyzeLine>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeLine {
    content: String,
    #[serde(default)]
    polygon: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: OperationError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> AzureFormClient {
        AzureFormClient::new(
            server.base_url(),
            "test-key".to_string(),
            "prebuilt-layout".to_string(),
            "2023-07-31".to_string(),
            Duration::from_millis(10),
            3,
        )
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let server = MockServer::start();

        let submit_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/formrecognizer/documentModels/prebuilt-layout:analyze")
                .query_param("api-version", "2023-07-31")
                .header("Ocp-Apim-Subscription-Key", "test-key");
            then.status(202)
                .header("Operation-Location", &server.url("/operations/1"));
        });

        let poll_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/operations/1")
                .header("Ocp-Apim-Subscription-Key", "test-key");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "status": "succeeded",
                    "analyzeResult": {
                        "pages": [{
                            "lines": [
                                {"content": "Diagnosis:", "polygon": [0.0, 1.0, 2.0, 1.0]},
                                {"content": "Type 2 Diabetes", "polygon": [0.0, 2.0, 2.0, 2.0]}
                            ]
                        }]
                    }
                }));
        });

        let lines = client(&server).analyze(b"fake image bytes").await.unwrap();

        submit_mock.assert();
        poll_mock.assert();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].content, "Diagnosis:");
        assert_eq!(lines[1].content, "Type 2 Diabetes");
        assert_eq!(lines[1].polygon, vec![0.0, 2.0, 2.0, 2.0]);
    }

    #[tokio::test]
    async fn test_submit_rejection_carries_service_code() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(POST)
                .path("/formrecognizer/documentModels/prebuilt-layout:analyze");
            then.status(400)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "error": {"code": "InvalidRequest", "message": "unsupported image"}
                }));
        });

        let err = client(&server).analyze(b"bad").await.unwrap_err();
        match err {
            PipelineError::ServiceError { code, message } => {
                assert_eq!(code, "InvalidRequest");
                assert_eq!(message, "unsupported image");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_operation_location_is_an_error() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(POST)
                .path("/formrecognizer/documentModels/prebuilt-layout:analyze");
            then.status(202);
        });

        let err = client(&server).analyze(b"img").await.unwrap_err();
        assert!(matches!(err, PipelineError::ProcessingError { .. }));
    }

    #[tokio::test]
    async fn test_failed_operation_maps_to_service_error() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(POST)
                .path("/formrecognizer/documentModels/prebuilt-layout:analyze");
            then.status(202)
                .header("Operation-Location", &server.url("/operations/2"));
        });

        server.mock(|when, then| {
            when.method(GET).path("/operations/2");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "status": "failed",
                    "error": {"code": "InternalServerError", "message": "analysis failed"}
                }));
        });

        let err = client(&server).analyze(b"img").await.unwrap_err();
        match err {
            PipelineError::ServiceError { code, .. } => assert_eq!(code, "InternalServerError"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_poll_exhaustion_times_out() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(POST)
                .path("/formrecognizer/documentModels/prebuilt-layout:analyze");
            then.status(202)
                .header("Operation-Location", &server.url("/operations/3"));
        });

        let poll_mock = server.mock(|when, then| {
            when.method(GET).path("/operations/3");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"status": "running"}));
        });

        let err = client(&server).analyze(b"img").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::OperationTimeout { attempts: 3 }
        ));
        assert_eq!(poll_mock.hits(), 3);
    }

    #[tokio::test]
    async fn test_no_recognized_text_is_empty_result() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(POST)
                .path("/formrecognizer/documentModels/prebuilt-layout:analyze");
            then.status(202)
                .header("Operation-Location", &server.url("/operations/4"));
        });

        server.mock(|when, then| {
            when.method(GET).path("/operations/4");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "status": "succeeded",
                    "analyzeResult": {"pages": [{"lines": []}]}
                }));
        });

        let err = client(&server).analyze(b"blank page").await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyResult));
    }
}
