// src/services/object_store.rs
//! Whole-object reads and writes against an S3-compatible bucket

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::common::AppConfig;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object store request failed: {0}")]
    Unavailable(String),

    #[error("write precondition failed for '{0}'")]
    PreconditionFailed(String),
}

/// Object bytes plus the entity tag the store reported for them
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub etag: Option<String>,
}

/// Condition attached to a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePrecondition {
    /// Unconditional overwrite
    None,
    /// Only create; fail if the key already exists
    IfAbsent,
    /// Only replace the version carrying this entity tag
    IfMatch(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object at `key`; `Ok(None)` when it does not exist
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, ObjectStoreError>;

    /// Replace the object at `key` with `body` in a single request
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        precondition: WritePrecondition,
    ) -> Result<(), ObjectStoreError>;
}

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build the client once at startup. Credentials come from the ambient AWS
    /// chain; every operation is bounded by the outbound timeout and never retried.
    pub async fn connect(config: &AppConfig) -> Self {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(config.outbound_timeout)
            .build();

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.storage_region.clone()))
            .endpoint_url(&config.storage_endpoint)
            .timeout_config(timeouts)
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        info!(
            bucket = %config.data_bucket,
            endpoint = %config.storage_endpoint,
            "Object store client initialized"
        );

        Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.data_bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, ObjectStoreError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .map(|service_err| service_err.is_no_such_key())
                    .unwrap_or(false)
                    || e.raw_response().map(|r| r.status().as_u16()) == Some(404);
                if missing {
                    debug!(bucket = %self.bucket, key = %key, "Object not found");
                    return Ok(None);
                }
                error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %self.bucket,
                    key = %key,
                    "Failed to fetch object"
                );
                return Err(ObjectStoreError::Unavailable(format!(
                    "get '{}' failed: {}",
                    key, e
                )));
            }
        };

        let etag = output.e_tag().map(str::to_string);
        let data = output.body.collect().await.map_err(|e| {
            error!(error = %e, key = %key, "Failed to read object body");
            ObjectStoreError::Unavailable(format!("reading '{}' failed: {}", key, e))
        })?;
        let bytes = data.into_bytes();

        debug!(key = %key, size = bytes.len(), etag = ?etag, "Fetched object");
        Ok(Some(StoredObject { bytes, etag }))
    }

    async fn put(
        &self,
        key: &str,
        body: Bytes,
        precondition: WritePrecondition,
    ) -> Result<(), ObjectStoreError> {
        let size = body.len();
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type("application/json");

        request = match &precondition {
            WritePrecondition::None => request,
            WritePrecondition::IfAbsent => request.if_none_match("*"),
            WritePrecondition::IfMatch(etag) => request.if_match(etag),
        };

        request.send().await.map_err(|e| {
            let status = e.raw_response().map(|r| r.status().as_u16());
            if matches!(status, Some(409) | Some(412)) {
                debug!(key = %key, precondition = ?precondition, "Conditional write rejected");
                return ObjectStoreError::PreconditionFailed(key.to_string());
            }
            error!(
                error = %DisplayErrorContext(&e),
                bucket = %self.bucket,
                key = %key,
                "Failed to write object"
            );
            ObjectStoreError::Unavailable(format!("put '{}' failed: {}", key, e))
        })?;

        debug!(key = %key, size, precondition = ?precondition, "Wrote object");
        Ok(())
    }
}
