use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{InferenceApi, RunInput, RunStatus};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the serverless GPU endpoint that performs the actual
/// video edit. The endpoint exposes `POST {base}/run` returning an async
/// handle and `GET {base}/status/{id}` for polling.
#[derive(Clone)]
pub struct InferenceClient {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    input: &'a RunInput,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    id: String,
}

impl InferenceClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

impl InferenceApi for InferenceClient {
    async fn submit(&self, input: &RunInput) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/run", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&RunRequest { input })
            .send()
            .await
            .map_err(|e| anyhow!("Inference submit request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Inference endpoint error {}: {}", status, body));
        }

        let run: RunResponse = response.json().await?;
        Ok(run.id)
    }

    async fn status(&self, run_id: &str) -> Result<RunStatus> {
        let response = self
            .client
            .get(format!("{}/status/{}", self.base_url, run_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| anyhow!("Inference status request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("Inference status error: {}", response.status()));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{RunState, RunStatus};

    #[test]
    fn parses_running_status() {
        let status: RunStatus = serde_json::from_str(r#"{"status": "RUNNING"}"#).unwrap();
        assert_eq!(status.status, RunState::Running);
        assert!(status.output.is_none());
        assert!(status.error.is_none());
    }

    #[test]
    fn parses_queued_status() {
        let status: RunStatus = serde_json::from_str(r#"{"status": "IN_QUEUE"}"#).unwrap();
        assert_eq!(status.status, RunState::InQueue);
    }

    #[test]
    fn parses_completed_status_with_output() {
        let status: RunStatus = serde_json::from_str(
            r#"{"status": "COMPLETED", "output": {"edited_video_url": "https://x/y.mp4"}}"#,
        )
        .unwrap();
        assert_eq!(status.status, RunState::Completed);
        assert_eq!(
            status.output.unwrap().edited_video_url.as_deref(),
            Some("https://x/y.mp4")
        );
    }

    #[test]
    fn parses_failed_status_with_error() {
        let status: RunStatus =
            serde_json::from_str(r#"{"status": "FAILED", "error": "cuda OOM"}"#).unwrap();
        assert_eq!(status.status, RunState::Failed);
        assert_eq!(status.error.as_deref(), Some("cuda OOM"));
    }
}
