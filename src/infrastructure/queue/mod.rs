pub mod rabbitmq;

/// Queue that feeds the dispatcher worker.
pub const VIDEO_JOBS_QUEUE: &str = "video_edit_jobs";
