use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use super::dto::{JobResponse, UploadResponse};
use super::service::{JobService, UploadedVideo};
use crate::common::response::{ApiResponse, ApiSuccess};
use crate::error::{ApiResult, AppError};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/upload",
    responses(
        (status = 201, description = "Job created and queued", body = ApiResponse<UploadResponse>),
        (status = 400, description = "Empty instruction or non-video upload"),
        (status = 500, description = "Storage or database failure"),
        (status = 503, description = "Dispatch unavailable")
    ),
    tag = "Jobs"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut video: Option<UploadedVideo> = None;
    let mut instruction: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "video" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read upload: {}", e)))?;

                video = Some(UploadedVideo {
                    file_name,
                    content_type,
                    data,
                });
            }
            "instruction" => {
                instruction = Some(field.text().await.map_err(|e| {
                    AppError::validation(format!("Failed to read instruction: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let video = video.ok_or_else(|| AppError::validation("Missing 'video' file field"))?;
    let instruction =
        instruction.ok_or_else(|| AppError::validation("Missing 'instruction' field"))?;

    let res = JobService::create_job(state, video, instruction).await?;

    Ok(ApiSuccess(
        ApiResponse::success(res, "Video uploaded successfully"),
        StatusCode::CREATED,
    ))
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    responses(
        (status = 200, description = "All jobs, newest first", body = ApiResponse<Vec<JobResponse>>),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Jobs"
)]
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let res = JobService::list_jobs(state).await?;

    Ok(ApiSuccess(
        ApiResponse::success(res, "Jobs retrieved successfully"),
        StatusCode::OK,
    ))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job detail", body = ApiResponse<JobResponse>),
        (status = 404, description = "Job Not Found"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Jobs"
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let res = JobService::get_job(state, id).await?;

    Ok(ApiSuccess(
        ApiResponse::success(res, "Job retrieved successfully"),
        StatusCode::OK,
    ))
}
