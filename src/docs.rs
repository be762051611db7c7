use utoipa::OpenApi;

use crate::modules::job::dto::{JobResponse, UploadResponse};
use crate::modules::job::model::JobStatus;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::job::handler::upload_video,
        crate::modules::job::handler::list_jobs,
        crate::modules::job::handler::get_job,
    ),
    components(
        schemas(UploadResponse, JobResponse, JobStatus)
    ),
    tags(
        (name = "Jobs", description = "Video editing job submission and status")
    )
)]
pub struct ApiDoc;
