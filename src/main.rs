use dotenvy::dotenv;
use tracing::info;

mod app;
mod common;
mod config;
mod docs;
mod error;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;

use crate::config::settings::AppConfig;
use crate::infrastructure::db::pool::connect_to_db;
use crate::infrastructure::inference::client::InferenceClient;
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::infrastructure::storage::s3::StorageService;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("promptcut=info,tower_http=info")
                }),
        )
        .init();

    info!("Starting server...");

    let config = AppConfig::new()?;

    let db = connect_to_db(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let storage = StorageService::new(
        &config.s3_endpoint,
        &config.s3_bucket,
        &config.s3_access_key,
        &config.s3_secret_key,
        &config.public_url_base,
    )
    .await;

    let queue = RabbitMqService::new(&config.amqp_url).await?;
    let inference = InferenceClient::new(&config.inference_endpoint, &config.inference_api_key)?;

    let state = AppState::new(db, storage, queue, inference);

    tokio::spawn(workers::dispatcher::start_dispatcher_worker(state.clone()));

    let app = app::create_app(state).await;

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
