use bytes::Bytes;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use super::dto::{JobResponse, UploadResponse};
use super::events::ProcessVideoJob;
use super::model::{Job, JobStatus};
use super::repository::JobRepository;
use crate::error::{ApiResult, AppError};
use crate::infrastructure::queue::VIDEO_JOBS_QUEUE;
use crate::state::AppState;

pub struct JobService;

/// What the upload handler pulled out of the multipart form.
pub struct UploadedVideo {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl JobService {
    pub fn validate_upload(instruction: &str, content_type: Option<&str>) -> ApiResult<()> {
        if instruction.trim().is_empty() {
            return Err(AppError::validation("Instruction cannot be empty"));
        }

        match content_type {
            Some(ct) if ct.starts_with("video/") => Ok(()),
            _ => Err(AppError::validation("File must be a video")),
        }
    }

    fn file_extension(file_name: Option<&str>) -> String {
        file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_else(|| ".mp4".to_string())
    }

    /// Validates the upload, persists the blob, inserts the job row and
    /// enqueues it for the dispatcher. The blob goes up first so a job row
    /// never references a missing object.
    pub async fn create_job(
        state: AppState,
        video: UploadedVideo,
        instruction: String,
    ) -> ApiResult<UploadResponse> {
        Self::validate_upload(&instruction, video.content_type.as_deref())?;

        let job_id = Uuid::new_v4();
        let extension = Self::file_extension(video.file_name.as_deref());
        let key = format!("original/{}{}", job_id, extension);
        let content_type = video.content_type.as_deref().unwrap_or("video/mp4");

        let original_video_url = state
            .storage
            .put_object(&key, video.data, content_type)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload video: {}", e)))?;

        let job = JobRepository::insert(&state.db, job_id, instruction.trim(), &original_video_url)
            .await?;

        let event = ProcessVideoJob { job_id: job.id };
        let payload = serde_json::to_vec(&event)
            .map_err(|e| AppError::Internal(format!("Failed to encode job message: {}", e)))?;

        state
            .queue
            .publish(VIDEO_JOBS_QUEUE, &payload)
            .await
            .map_err(|e| AppError::DispatchUnavailable(format!("Failed to enqueue job: {}", e)))?;

        info!("📼 Created job {} and queued for processing", job.id);

        Ok(UploadResponse {
            job_id: job.id,
            status: JobStatus::Pending,
            message: "Video uploaded successfully and queued for processing".to_string(),
        })
    }

    pub async fn list_jobs(state: AppState) -> ApiResult<Vec<JobResponse>> {
        let jobs = JobRepository::list(&state.db).await?;
        Ok(jobs.into_iter().map(JobResponse::from).collect())
    }

    pub async fn get_job(state: AppState, id: Uuid) -> ApiResult<JobResponse> {
        let job: Job = JobRepository::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| AppError::not_found("Job not found"))?;

        Ok(JobResponse::from(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_instruction() {
        let err = JobService::validate_upload("", Some("video/mp4")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_whitespace_instruction() {
        let err = JobService::validate_upload("   ", Some("video/mp4")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_non_video_content_type() {
        let err = JobService::validate_upload("trim the intro", Some("text/plain")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_missing_content_type() {
        let err = JobService::validate_upload("trim the intro", None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn accepts_video_upload() {
        assert!(JobService::validate_upload("trim the intro", Some("video/mp4")).is_ok());
        assert!(JobService::validate_upload("add captions", Some("video/webm")).is_ok());
    }

    #[test]
    fn keeps_uploaded_file_extension() {
        assert_eq!(JobService::file_extension(Some("clip.mov")), ".mov");
        assert_eq!(JobService::file_extension(Some("archive.webm")), ".webm");
    }

    #[test]
    fn defaults_to_mp4_extension() {
        assert_eq!(JobService::file_extension(None), ".mp4");
        assert_eq!(JobService::file_extension(Some("noextension")), ".mp4");
    }
}
