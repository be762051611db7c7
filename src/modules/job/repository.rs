use sqlx::PgPool;
use uuid::Uuid;

use super::model::{Job, JobStatus};

/// The store operations the dispatcher drives a job through. Split out as a
/// trait so the worker's state machine can run against an in-memory store
/// in tests, the same way the poll loop runs against a fake endpoint.
pub trait JobStore {
    fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = anyhow::Result<Option<Job>>> + Send;

    fn try_mark_processing(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = anyhow::Result<bool>> + Send;

    fn mark_completed(
        &self,
        id: Uuid,
        edited_video_url: &str,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;

    fn mark_failed(
        &self,
        id: Uuid,
        error_message: &str,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

impl JobStore for PgPool {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Job>> {
        Ok(JobRepository::find_by_id(self, id).await?)
    }

    async fn try_mark_processing(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(JobRepository::try_mark_processing(self, id).await?)
    }

    async fn mark_completed(&self, id: Uuid, edited_video_url: &str) -> anyhow::Result<()> {
        Ok(JobRepository::mark_completed(self, id, edited_video_url).await?)
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> anyhow::Result<()> {
        Ok(JobRepository::mark_failed(self, id, error_message).await?)
    }
}

pub struct JobRepository;

impl JobRepository {
    pub async fn insert(
        pool: &PgPool,
        id: Uuid,
        instruction: &str,
        original_video_url: &str,
    ) -> Result<Job, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (id, instruction, status, original_video_url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(instruction)
        .bind(JobStatus::Pending.as_str())
        .bind(original_video_url)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }

    /// Claims the job for processing. The conditional update is the
    /// duplicate-dispatch guard: a redelivered message finds the row no
    /// longer 'pending' (claimed or terminal) and gets `false` back.
    pub async fn try_mark_processing(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(JobStatus::Processing.as_str())
        .bind(id)
        .bind(JobStatus::Pending.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn mark_completed(
        pool: &PgPool,
        id: Uuid,
        edited_video_url: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET status = $1, edited_video_url = $2, updated_at = NOW() \
             WHERE id = $3",
        )
        .bind(JobStatus::Completed.as_str())
        .bind(edited_video_url)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(
        pool: &PgPool,
        id: Uuid,
        error_message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET status = $1, error_message = $2, updated_at = NOW() \
             WHERE id = $3",
        )
        .bind(JobStatus::Failed.as_str())
        .bind(error_message)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
