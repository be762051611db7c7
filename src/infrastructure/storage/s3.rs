use aws_sdk_s3::config::Builder;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use tracing::info;

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
    pub public_url_base: String,
}

impl StorageService {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        public_url_base: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("auto"))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO/R2
            .build();

        let client = Client::from_conf(config);

        info!("✅ Connected to S3-compatible object store");

        Self {
            client,
            bucket: bucket.to_string(),
            public_url_base: public_url_base.trim_end_matches('/').to_string(),
        }
    }

    /// Uploads a blob and returns its public URL.
    pub async fn put_object(
        &self,
        key: &str,
        body: bytes::Bytes,
        content_type: &str,
    ) -> Result<String, aws_sdk_s3::Error> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await?;

        Ok(format!("{}/{}", self.public_url_base, key))
    }

    pub async fn get_object(&self, key: &str) -> anyhow::Result<bytes::Bytes> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to fetch object {}: {}", key, e))?;

        let data = result.body.collect().await?;

        Ok(data.into_bytes())
    }
}
