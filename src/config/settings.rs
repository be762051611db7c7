use crate::config::env::{self, EnvKey};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub amqp_url: String,
    pub s3_endpoint: String,
    pub s3_bucket: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub public_url_base: String,
    pub inference_endpoint: String,
    pub inference_api_key: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 8000),
            database_url: env::get(EnvKey::DatabaseUrl)?,
            amqp_url: env::get(EnvKey::AmqpUrl)?,
            s3_endpoint: env::get(EnvKey::S3Endpoint)?,
            s3_bucket: env::get(EnvKey::S3Bucket)?,
            s3_access_key: env::get(EnvKey::S3AccessKey)?,
            s3_secret_key: env::get(EnvKey::S3SecretKey)?,
            public_url_base: env::get(EnvKey::PublicUrlBase)?,
            inference_endpoint: env::get(EnvKey::InferenceEndpoint)?,
            inference_api_key: env::get(EnvKey::InferenceApiKey)?,
        })
    }
}
