//! S3-compatible object reader.
//!
//! Built on `aws-sdk-s3` with path-style addressing so MinIO and other
//! S3-compatible endpoints work unchanged. The GetObject body is handed to the
//! caller as an `AsyncRead` over the HTTP stream, so memory use is bounded by
//! the relay chunk, not the object.

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use url::Url;
use validator::Validate;

use super::{ByteSource, ObjectStorage, Result, StorageError};
use crate::secrets::SecretString;

/// Name reported by the static credentials provider.
const CREDENTIALS_PROVIDER: &str = "backup-relay";

/// Object storage connection settings.
#[derive(Debug, Clone, Validate)]
pub struct StorageConfig {
    /// `host[:port]` (implies https) or a full `http(s)://` URL
    #[validate(length(min = 1, message = "STORAGE_URL cannot be empty"))]
    pub endpoint: String,

    #[validate(length(min = 1, message = "STORAGE_ACCESS_KEY cannot be empty"))]
    pub access_key: String,

    pub secret_key: SecretString,

    /// Temporary credentials only
    pub session_token: Option<SecretString>,

    /// Signing region
    #[validate(length(min = 1, message = "STORAGE_REGION cannot be empty"))]
    pub region: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: SecretString::default(),
            session_token: None,
            region: "us-east-1".to_string(),
        }
    }
}

impl StorageConfig {
    /// Resolve the configured endpoint to a base URL.
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = self.endpoint.trim().trim_end_matches('/');
        let candidate =
            if raw.contains("://") { raw.to_string() } else { format!("https://{}", raw) };

        let url = Url::parse(&candidate)
            .map_err(|e| StorageError::config(format!("Invalid storage endpoint '{}': {}", self.endpoint, e)))?;
        if url.host_str().is_none() {
            return Err(StorageError::config(format!("Storage endpoint '{}' has no host", self.endpoint)));
        }
        Ok(url)
    }

    fn credentials(&self) -> Credentials {
        Credentials::new(
            &self.access_key,
            self.secret_key.expose_secret(),
            self.session_token.as_ref().map(|t| t.expose_secret().to_string()),
            None,
            CREDENTIALS_PROVIDER,
        )
    }
}

/// Path-style S3 client implementing [`ObjectStorage`].
#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    client: Client,
}

impl S3ObjectStorage {
    /// Build the client. No request is made until the first open.
    ///
    /// Retries are disabled: a download is a single attempt.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        if config.secret_key.is_empty() {
            return Err(StorageError::config("STORAGE_SECRET_KEY cannot be empty"));
        }
        let endpoint = config.endpoint_url()?;

        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(config.credentials())
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .endpoint_url(endpoint.as_str().trim_end_matches('/'))
            .force_path_style(true)
            .build();

        tracing::info!(endpoint = %endpoint, region = %config.region, "Object storage configured");
        Ok(Self { client: Client::from_conf(s3_config) })
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn open(&self, bucket: &str, key: &str) -> Result<ByteSource> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify_get_object_error(bucket, key, err))?;

        tracing::debug!(bucket = %bucket, key = %key, content_length = ?output.content_length(), "Object opened");

        Ok(Box::new(Box::pin(output.body.into_async_read())))
    }
}

fn is_missing(err: &GetObjectError) -> bool {
    err.is_no_such_key() || matches!(err.code(), Some("NoSuchKey" | "NoSuchBucket" | "NotFound"))
}

fn classify_get_object_error<R>(bucket: &str, key: &str, err: SdkError<GetObjectError, R>) -> StorageError
where
    R: std::fmt::Debug,
{
    if let SdkError::ServiceError(context) = &err {
        if is_missing(context.err()) {
            return StorageError::not_found(bucket, key);
        }
    }

    tracing::warn!(bucket = %bucket, key = %key, error = %DisplayErrorContext(&err), "GetObject rejected");
    StorageError::connection(format!("GetObject {}/{} failed: {}", bucket, key, DisplayErrorContext(&err)))
}
