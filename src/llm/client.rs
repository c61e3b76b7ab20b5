//! Gemini `generateContent` client with timeouts and bounded retry

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::response::ResponseParser;
use super::TextGenerator;
use crate::config::GenerationConfig;
use crate::errors::PatientRagError;
use crate::errors::Result;

/// Header carrying the generation API key; keeps it out of request URLs
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

/// Client for the text-generation endpoint
#[derive(Debug, Clone)]
pub struct GenerationClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl GenerationClient {
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PatientRagError::HttpError(e.to_string()))?;

        if config.api_key.is_empty() {
            warn!("No generation API key configured, requests will likely be rejected");
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// POST the prompt, retrying timeouts, connection failures, 429 and 5xx.
    ///
    /// Returns the final status and body; only transport failures after the
    /// last attempt become an error.
    pub async fn send(&self, prompt: &str) -> Result<(StatusCode, String)> {
        let url = self.url();
        let payload = GenerateContentRequest::from_prompt(prompt);
        let mut attempt = 0u32;

        loop {
            debug!("Calling generation API: {} (attempt {})", url, attempt + 1);
            let mut request = self.client.post(&url).json(&payload);
            if !self.api_key.is_empty() {
                request = request.header(API_KEY_HEADER, self.api_key.as_str());
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if is_transient_status(status) && attempt < self.max_retries {
                        warn!(
                            "Attempt {}/{}: generation API returned {}",
                            attempt + 1,
                            self.max_retries + 1,
                            status
                        );
                        tokio::time::sleep(self.backoff(attempt)).await;
                        attempt += 1;
                        continue;
                    }

                    let body = response.text().await.map_err(|e| {
                        PatientRagError::Generation(format!(
                            "reading response failed: {}",
                            e.without_url()
                        ))
                    })?;
                    return Ok((status, body));
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    let e = e.without_url();
                    warn!(
                        "Attempt {}/{}: generation request failed: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        e
                    );
                    tokio::time::sleep(self.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(PatientRagError::Generation(format!(
                        "request to generation API failed: {}",
                        e.without_url()
                    )))
                }
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(1 << attempt.min(16))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl TextGenerator for GenerationClient {
    async fn generate(&self, prompt: &str) -> String {
        match self.send(prompt).await {
            Ok((status, body)) => ResponseParser::parse_body(status.as_u16(), &body),
            Err(e) => {
                error!("Generation failed: {}", e);
                format!("Error: {e}")
            }
        }
    }
}
