use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::primitives::{ByteStream, SdkBody};
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;

use crate::config::{CannedAcl, StorageConfig};
use crate::progress::ProgressBody;
use crate::transform::UploadHeaders;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Destination bucket of a mirror run.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Whether `key` is already present.
    async fn exists(&self, key: &str) -> Result<bool, BoxError>;

    /// Writes `body` under `key` with the given headers and canned ACL.
    async fn put(
        &self,
        key: &str,
        body: ProgressBody,
        headers: &UploadHeaders,
        acl: CannedAcl,
    ) -> Result<(), BoxError>;
}

/// Client settings for the destination. Retries and timeouts are off: every
/// step gets exactly one attempt.
pub fn s3_config(cfg: &StorageConfig) -> aws_sdk_s3::config::Builder {
    let credentials = Credentials::new(
        cfg.access_key.clone(),
        cfg.secret.clone(),
        None,
        None,
        "curlitos",
    );
    let mut builder = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(cfg.region.clone()))
        .credentials_provider(credentials)
        .retry_config(RetryConfig::disabled())
        .timeout_config(TimeoutConfig::disabled())
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired);

    if let Some(endpoint) = &cfg.endpoint {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    builder
}

#[derive(Debug, Clone)]
pub struct S3Bucket {
    client: Client,
    bucket: String,
}

impl S3Bucket {
    pub fn new(cfg: &StorageConfig) -> Self {
        Self::from_conf(s3_config(cfg).build(), &cfg.bucket)
    }

    pub fn from_conf(conf: aws_sdk_s3::Config, bucket: &str) -> Self {
        Self {
            client: Client::from_conf(conf),
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl Bucket for S3Bucket {
    async fn exists(&self, key: &str) -> Result<bool, BoxError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(
        &self,
        key: &str,
        body: ProgressBody,
        headers: &UploadHeaders,
        acl: CannedAcl,
    ) -> Result<(), BoxError> {
        let len = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(&headers.content_type)
            .set_content_encoding(headers.content_encoding.clone())
            .content_length(len as i64)
            .acl(ObjectCannedAcl::from(acl.as_str()))
            .body(ByteStream::new(SdkBody::from_body_1_x(body)))
            .send()
            .await?;
        Ok(())
    }
}
