pub mod client;

use serde::{Deserialize, Serialize};

/// Payload submitted to the remote editing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RunInput {
    pub video_url: String,
    pub instruction: String,
}

/// Status reported by the remote endpoint for a submitted run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunStatus {
    pub status: RunState,
    #[serde(default)]
    pub output: Option<RunOutput>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    InQueue,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunOutput {
    pub edited_video_url: Option<String>,
}

/// The GPU endpoint is an opaque external dependency: submit a run, then
/// poll its status by handle until it reports a terminal state.
pub trait InferenceApi {
    fn submit(
        &self,
        input: &RunInput,
    ) -> impl std::future::Future<Output = anyhow::Result<String>> + Send;

    fn status(
        &self,
        run_id: &str,
    ) -> impl std::future::Future<Output = anyhow::Result<RunStatus>> + Send;
}
