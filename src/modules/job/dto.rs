use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use super::model::{Job, JobStatus};

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub instruction: String,
    pub status: JobStatus,
    pub original_video_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[schema(value_type = String, format = DateTime)]
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            instruction: job.instruction,
            status: JobStatus::from(job.status),
            original_video_url: job.original_video_url,
            edited_video_url: job.edited_video_url,
            error_message: job.error_message,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: &str) -> Job {
        Job {
            id: Uuid::new_v4(),
            instruction: "remove silence".to_string(),
            status: status.to_string(),
            original_video_url: "https://x/in.mp4".to_string(),
            edited_video_url: None,
            error_message: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn response_types_the_stored_status() {
        assert_eq!(JobResponse::from(job("pending")).status, JobStatus::Pending);
        assert_eq!(
            JobResponse::from(job("processing")).status,
            JobStatus::Processing
        );
        assert_eq!(
            JobResponse::from(job("completed")).status,
            JobStatus::Completed
        );
        assert_eq!(JobResponse::from(job("failed")).status, JobStatus::Failed);
    }

    #[test]
    fn status_serializes_lowercase() {
        let body = serde_json::to_value(JobResponse::from(job("completed"))).unwrap();
        assert_eq!(body["status"], "completed");
    }
}
