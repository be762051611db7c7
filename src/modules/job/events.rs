use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue message enqueued once per created job. Carries only the id; the
/// dispatcher re-fetches the row before touching it.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessVideoJob {
    pub job_id: Uuid,
}
