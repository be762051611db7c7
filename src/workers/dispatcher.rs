use anyhow::{anyhow, bail};
use futures_util::StreamExt;
use lapin::options::BasicAckOptions;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::infrastructure::inference::{InferenceApi, RunInput, RunState};
use crate::infrastructure::queue::VIDEO_JOBS_QUEUE;
use crate::modules::job::events::ProcessVideoJob;
use crate::modules::job::repository::JobStore;
use crate::state::AppState;

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const MAX_POLL_ATTEMPTS: u32 = 60; // 10 minute deadline overall

// One job can hold a worker for the full poll deadline, so deliveries are
// processed in parallel tasks. Prefetch caps how many run at once.
const PREFETCH_COUNT: u16 = 8;

pub async fn start_dispatcher_worker(state: AppState) {
    info!("🎬 Starting dispatcher worker...");

    let mut consumer = match state
        .queue
        .consume(VIDEO_JOBS_QUEUE, "dispatcher_worker", PREFETCH_COUNT)
        .await
    {
        Ok(consumer) => consumer,
        Err(e) => {
            error!("Dispatcher failed to attach to queue: {}", e);
            return;
        }
    };

    info!("🎬 Dispatcher listening on '{}'", VIDEO_JOBS_QUEUE);

    while let Some(delivery) = consumer.next().await {
        if let Ok(delivery) = delivery {
            let state = state.clone();

            tokio::spawn(async move {
                match serde_json::from_slice::<ProcessVideoJob>(&delivery.data) {
                    Ok(event) => process_job(&state.db, &state.inference, event.job_id).await,
                    Err(e) => error!("❌ Failed to parse job message: {}", e),
                }

                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    error!("Failed to ack message: {}", e);
                }
            });
        }
    }
}

/// Drives one job through its state machine. Every failure past the claim
/// lands in the row's error_message; nothing is retried or re-enqueued.
async fn process_job<S: JobStore, A: InferenceApi>(store: &S, api: &A, job_id: Uuid) {
    let job = match store.find_by_id(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            warn!("Job {} not found, dropping message", job_id);
            return;
        }
        Err(e) => {
            error!("Failed to fetch job {}: {}", job_id, e);
            return;
        }
    };

    match store.try_mark_processing(job_id).await {
        Ok(true) => {}
        Ok(false) => {
            info!("Job {} already claimed or terminal, skipping", job_id);
            return;
        }
        Err(e) => {
            error!("Failed to claim job {}: {}", job_id, e);
            return;
        }
    }

    info!("⚙️ Processing job {}", job_id);

    match drive_job(api, &job.original_video_url, &job.instruction).await {
        Ok(edited_video_url) => match store.mark_completed(job_id, &edited_video_url).await {
            Ok(()) => info!("✅ Job {} completed: {}", job_id, edited_video_url),
            Err(e) => error!("Failed to persist completion for job {}: {}", job_id, e),
        },
        Err(e) => {
            error!("❌ Job {} failed: {}", job_id, e);
            // Best-effort write; the job stays 'processing' if even this fails.
            if let Err(db_err) = store.mark_failed(job_id, &e.to_string()).await {
                error!("Failed to persist failure for job {}: {}", job_id, db_err);
            }
        }
    }
}

/// Submits the edit to the remote endpoint and polls until terminal.
/// Returns the edited video URL on success; any other outcome is an error
/// whose text becomes the job's error_message.
async fn drive_job<A: InferenceApi>(
    api: &A,
    video_url: &str,
    instruction: &str,
) -> anyhow::Result<String> {
    let input = RunInput {
        video_url: video_url.to_string(),
        instruction: instruction.to_string(),
    };

    let run_id = api.submit(&input).await?;
    poll_for_result(api, &run_id).await
}

async fn poll_for_result<A: InferenceApi>(api: &A, run_id: &str) -> anyhow::Result<String> {
    for attempt in 1..=MAX_POLL_ATTEMPTS {
        sleep(POLL_INTERVAL).await;

        let status = match api.status(run_id).await {
            Ok(status) => status,
            Err(e) => {
                // Transient; retried on the next tick but still consumes a slot.
                warn!("Status poll for run {} failed (attempt {}): {}", run_id, attempt, e);
                continue;
            }
        };

        match status.status {
            RunState::Completed => {
                return status
                    .output
                    .and_then(|output| output.edited_video_url)
                    .ok_or_else(|| anyhow!("Inference completed without a result URL"));
            }
            RunState::Failed => {
                bail!(
                    "{}",
                    status
                        .error
                        .unwrap_or_else(|| "Unknown inference error".to_string())
                );
            }
            RunState::Running | RunState::InQueue => {}
        }
    }

    bail!(
        "Processing timed out after {} seconds",
        POLL_INTERVAL.as_secs() * MAX_POLL_ATTEMPTS as u64
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::inference::{RunOutput, RunStatus};
    use crate::modules::job::model::Job;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use time::OffsetDateTime;
    use tokio::time::Instant;

    enum PlannedPoll {
        Status(RunStatus),
        TransientError,
    }

    /// Replays a scripted sequence of poll responses; once the script runs
    /// out it reports RUNNING forever.
    struct FakeInference {
        submit_ok: bool,
        polls: Mutex<VecDeque<PlannedPoll>>,
        submit_calls: AtomicU32,
        status_calls: AtomicU32,
    }

    impl FakeInference {
        fn new(submit_ok: bool, polls: Vec<PlannedPoll>) -> Self {
            Self {
                submit_ok,
                polls: Mutex::new(polls.into()),
                submit_calls: AtomicU32::new(0),
                status_calls: AtomicU32::new(0),
            }
        }

        fn submit_call_count(&self) -> u32 {
            self.submit_calls.load(Ordering::SeqCst)
        }

        fn status_call_count(&self) -> u32 {
            self.status_calls.load(Ordering::SeqCst)
        }
    }

    impl InferenceApi for FakeInference {
        async fn submit(&self, _input: &RunInput) -> anyhow::Result<String> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            if self.submit_ok {
                Ok("run-1".to_string())
            } else {
                Err(anyhow!("Inference endpoint error 500: worker unavailable"))
            }
        }

        async fn status(&self, _run_id: &str) -> anyhow::Result<RunStatus> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            match self.polls.lock().unwrap().pop_front() {
                Some(PlannedPoll::Status(status)) => Ok(status),
                Some(PlannedPoll::TransientError) => Err(anyhow!("status endpoint returned 503")),
                None => Ok(running()),
            }
        }
    }

    /// In-memory store: one optional job row plus a record of the terminal
    /// writes the dispatcher performed.
    struct FakeStore {
        job: Option<Job>,
        claim_result: bool,
        claim_calls: AtomicU32,
        completed: Mutex<Option<(String, Instant)>>,
        failed: Mutex<Option<String>>,
    }

    impl FakeStore {
        fn with_job(id: Uuid) -> Self {
            Self {
                job: Some(pending_job(id)),
                claim_result: true,
                claim_calls: AtomicU32::new(0),
                completed: Mutex::new(None),
                failed: Mutex::new(None),
            }
        }

        fn empty() -> Self {
            Self {
                job: None,
                claim_result: true,
                claim_calls: AtomicU32::new(0),
                completed: Mutex::new(None),
                failed: Mutex::new(None),
            }
        }

        fn already_claimed(id: Uuid) -> Self {
            Self {
                claim_result: false,
                ..Self::with_job(id)
            }
        }

        fn completed_write(&self) -> Option<(String, Instant)> {
            self.completed.lock().unwrap().clone()
        }

        fn failed_write(&self) -> Option<String> {
            self.failed.lock().unwrap().clone()
        }

        fn claim_call_count(&self) -> u32 {
            self.claim_calls.load(Ordering::SeqCst)
        }
    }

    impl JobStore for FakeStore {
        async fn find_by_id(&self, _id: Uuid) -> anyhow::Result<Option<Job>> {
            Ok(self.job.clone())
        }

        async fn try_mark_processing(&self, _id: Uuid) -> anyhow::Result<bool> {
            self.claim_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.claim_result)
        }

        async fn mark_completed(&self, _id: Uuid, edited_video_url: &str) -> anyhow::Result<()> {
            *self.completed.lock().unwrap() =
                Some((edited_video_url.to_string(), Instant::now()));
            Ok(())
        }

        async fn mark_failed(&self, _id: Uuid, error_message: &str) -> anyhow::Result<()> {
            *self.failed.lock().unwrap() = Some(error_message.to_string());
            Ok(())
        }
    }

    fn pending_job(id: Uuid) -> Job {
        Job {
            id,
            instruction: "remove silence".to_string(),
            status: "pending".to_string(),
            original_video_url: "https://x/in.mp4".to_string(),
            edited_video_url: None,
            error_message: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn running() -> RunStatus {
        RunStatus {
            status: RunState::Running,
            output: None,
            error: None,
        }
    }

    fn completed(url: Option<&str>) -> RunStatus {
        RunStatus {
            status: RunState::Completed,
            output: Some(RunOutput {
                edited_video_url: url.map(str::to_string),
            }),
            error: None,
        }
    }

    fn failed(error: Option<&str>) -> RunStatus {
        RunStatus {
            status: RunState::Failed,
            output: None,
            error: error.map(str::to_string),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completed_run_resolves_result_url() {
        let api = FakeInference::new(
            true,
            vec![
                PlannedPoll::Status(running()),
                PlannedPoll::Status(completed(Some("https://x/y.mp4"))),
            ],
        );

        let url = drive_job(&api, "https://x/in.mp4", "remove silence")
            .await
            .unwrap();
        assert_eq!(url, "https://x/y.mp4");
        assert_eq!(api.status_call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_run_without_url_is_a_failure() {
        let api = FakeInference::new(true, vec![PlannedPoll::Status(completed(None))]);

        let err = drive_job(&api, "https://x/in.mp4", "remove silence")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("without a result URL"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_reports_remote_error() {
        let api = FakeInference::new(
            true,
            vec![
                PlannedPoll::Status(running()),
                PlannedPoll::Status(failed(Some("model crashed"))),
            ],
        );

        let err = drive_job(&api, "https://x/in.mp4", "remove silence")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "model crashed");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_without_error_text_gets_a_default() {
        let api = FakeInference::new(true, vec![PlannedPoll::Status(failed(None))]);

        let err = drive_job(&api, "https://x/in.mp4", "remove silence")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown inference error");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_poll_errors_are_retried() {
        let api = FakeInference::new(
            true,
            vec![
                PlannedPoll::TransientError,
                PlannedPoll::TransientError,
                PlannedPoll::Status(completed(Some("https://x/y.mp4"))),
            ],
        );

        let url = drive_job(&api, "https://x/in.mp4", "remove silence")
            .await
            .unwrap();
        assert_eq!(url, "https://x/y.mp4");
        assert_eq!(api.status_call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_polls_time_out() {
        let api = FakeInference::new(true, vec![]);

        let err = drive_job(&api, "https://x/in.mp4", "remove silence")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(api.status_call_count(), MAX_POLL_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submission_never_enters_the_poll_loop() {
        let api = FakeInference::new(false, vec![]);

        let err = drive_job(&api, "https://x/in.mp4", "remove silence")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("worker unavailable"));
        assert_eq!(api.status_call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_job_records_the_result_url() {
        let id = Uuid::new_v4();
        let store = FakeStore::with_job(id);
        let api =
            FakeInference::new(true, vec![PlannedPoll::Status(completed(Some("https://x/y.mp4")))]);

        process_job(&store, &api, id).await;

        let (url, _) = store.completed_write().unwrap();
        assert_eq!(url, "https://x/y.mp4");
        assert!(store.failed_write().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submission_records_the_error_message() {
        let id = Uuid::new_v4();
        let store = FakeStore::with_job(id);
        let api = FakeInference::new(false, vec![]);

        process_job(&store, &api, id).await;

        assert!(store.completed_write().is_none());
        assert!(store.failed_write().unwrap().contains("worker unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_job_is_dropped_without_a_claim() {
        let store = FakeStore::empty();
        let api = FakeInference::new(true, vec![]);

        process_job(&store, &api, Uuid::new_v4()).await;

        assert_eq!(store.claim_call_count(), 0);
        assert_eq!(api.submit_call_count(), 0);
        assert!(store.completed_write().is_none());
        assert!(store.failed_write().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn redelivered_message_that_loses_the_claim_is_skipped() {
        let id = Uuid::new_v4();
        let store = FakeStore::already_claimed(id);
        let api = FakeInference::new(true, vec![]);

        process_job(&store, &api, id).await;

        assert_eq!(store.claim_call_count(), 1);
        assert_eq!(api.submit_call_count(), 0);
        assert!(store.completed_write().is_none());
        assert!(store.failed_write().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn queued_job_is_not_blocked_by_a_slow_job_ahead_of_it() {
        let slow_id = Uuid::new_v4();
        let fast_id = Uuid::new_v4();

        let slow_store = FakeStore::with_job(slow_id);
        let slow_api = FakeInference::new(true, vec![]); // never terminal

        let fast_store = FakeStore::with_job(fast_id);
        let fast_api =
            FakeInference::new(true, vec![PlannedPoll::Status(completed(Some("https://x/b.mp4")))]);

        let started = Instant::now();
        tokio::join!(
            process_job(&slow_store, &slow_api, slow_id),
            process_job(&fast_store, &fast_api, fast_id),
        );

        // The fast job finishes on its first poll tick, not after the slow
        // job's full deadline.
        let (_, completed_at) = fast_store.completed_write().unwrap();
        assert_eq!(completed_at - started, POLL_INTERVAL);
        assert!(slow_store.failed_write().unwrap().contains("timed out"));
    }
}
