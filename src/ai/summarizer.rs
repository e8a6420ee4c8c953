use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::pipeline::text::truncate_chars;

/// Longest input sent to the model, in characters.
pub const MAX_INPUT_CHARS: usize = 1000;
pub const MIN_SUMMARY_LENGTH: u32 = 30;
pub const MAX_SUMMARY_LENGTH: u32 = 130;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct SummaryRequest<'a> {
    inputs: &'a str,
    parameters: SummaryParameters,
}

#[derive(Debug, Serialize)]
struct SummaryParameters {
    min_length: u32,
    max_length: u32,
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary_text: Option<String>,
}

/// Client for a hosted summarization model (Hugging Face inference API
/// response shape: `[{"summary_text": "..."}]`).
pub struct Summarizer {
    client: Client,
    api_url: String,
    api_token: String,
}

impl Summarizer {
    pub fn new(api_url: String, api_token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("infocrumbs/1.0")
            .build()?;
        Ok(Self {
            client,
            api_url,
            api_token,
        })
    }

    /// Summarize `text`, returning an empty string on any failure.
    pub async fn summarize(&self, text: &str) -> String {
        match self.generate_summary(text).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!("Summarization failed: {}", e);
                String::new()
            }
        }
    }

    pub async fn generate_summary(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(String::new());
        }

        let request = SummaryRequest {
            inputs: truncate_chars(text, MAX_INPUT_CHARS),
            parameters: SummaryParameters {
                min_length: MIN_SUMMARY_LENGTH,
                max_length: MAX_SUMMARY_LENGTH,
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Summarizer(format!(
                "HTTP {}: {}",
                status,
                truncate_chars(&error_text, 200)
            )));
        }

        let outputs: Vec<SummaryOutput> = response.json().await?;

        outputs
            .into_iter()
            .next()
            .and_then(|output| output.summary_text)
            .map(|summary| summary.trim().to_string())
            .filter(|summary| !summary.is_empty())
            .ok_or_else(|| AppError::Summarizer("No summary_text in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn summarizer_for(server: &MockServer) -> Summarizer {
        Summarizer::new(format!("{}/model", server.uri()), "hf_test".to_string()).unwrap()
    }

    #[tokio::test]
    async fn sends_truncated_input_with_length_bounds() {
        let server = MockServer::start().await;
        let long_text = "é".repeat(MAX_INPUT_CHARS + 50);
        let expected_input = "é".repeat(MAX_INPUT_CHARS);

        Mock::given(method("POST"))
            .and(path("/model"))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_json(json!({
                "inputs": expected_input,
                "parameters": {"min_length": 30, "max_length": 130}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"summary_text": " A short summary. "}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let summarizer = summarizer_for(&server).await;
        assert_eq!(summarizer.summarize(&long_text).await, "A short summary.");
    }

    #[tokio::test]
    async fn http_errors_yield_empty_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let summarizer = summarizer_for(&server).await;
        assert_eq!(summarizer.summarize("Some article text.").await, "");
    }

    #[tokio::test]
    async fn malformed_responses_yield_empty_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
            .mount(&server)
            .await;

        let summarizer = summarizer_for(&server).await;
        assert_eq!(summarizer.summarize("Some article text.").await, "");
    }

    #[tokio::test]
    async fn empty_input_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let summarizer = summarizer_for(&server).await;
        assert_eq!(summarizer.summarize("   ").await, "");
    }
}
