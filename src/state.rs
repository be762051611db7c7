use crate::infrastructure::db::pool::DbPool;
use crate::infrastructure::inference::client::InferenceClient;
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::infrastructure::storage::s3::StorageService;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub storage: StorageService,
    pub queue: RabbitMqService,
    pub inference: InferenceClient,
}

impl AppState {
    pub fn new(
        db: DbPool,
        storage: StorageService,
        queue: RabbitMqService,
        inference: InferenceClient,
    ) -> Self {
        Self {
            db,
            storage,
            queue,
            inference,
        }
    }
}
