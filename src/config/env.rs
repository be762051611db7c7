use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    DatabaseUrl,
    AmqpUrl,
    S3Endpoint,
    S3Bucket,
    S3AccessKey,
    S3SecretKey,
    PublicUrlBase,
    InferenceEndpoint,
    InferenceApiKey,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::AmqpUrl => "AMQP_URL",
            EnvKey::S3Endpoint => "S3_ENDPOINT",
            EnvKey::S3Bucket => "S3_BUCKET_VIDEOS",
            EnvKey::S3AccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::S3SecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::PublicUrlBase => "S3_PUBLIC_URL",
            EnvKey::InferenceEndpoint => "INFERENCE_ENDPOINT",
            EnvKey::InferenceApiKey => "INFERENCE_API_KEY",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
