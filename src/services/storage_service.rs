//! src/services/storage_service.rs
//!
//! Object store client. `ObjectStore` is the seam the ingestion handler talks
//! to; `S3ObjectStore` implements it over `aws-sdk-s3` with a single
//! public-read `PutObject` per upload. SDK retries are disabled and every write
//! is bounded by the configured timeout, so a call either confirms the object
//! or reports exactly one failure.

use crate::{
    config::{ConfigError, StorageConfig},
    models::object::{AccessPolicy, StorageKey, StoredObject},
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, retry::RetryConfig, timeout::TimeoutConfig};
use aws_sdk_s3::{
    Client,
    config::{Credentials, RequestChecksumCalculation},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::put_object::PutObjectError,
    primitives::ByteStream,
    types::ObjectCannedAcl,
};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::Utc;
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, info_span, Instrument};

/// Failures of a store write.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Transient: the store could not be reached, timed out, or failed
    /// server-side. The caller may resubmit the whole upload.
    #[error("object store unreachable: {0}")]
    Network(String),
    /// Credentials were rejected. Requires operator intervention.
    #[error("object store rejected credentials: {0}")]
    Authorization(String),
    /// The store refused the request for any other reason.
    #[error("object store rejected the write: {0}")]
    Rejected(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A durable key-to-blob store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` under `key` with a public-read policy.
    ///
    /// Returns only once the store has confirmed the write.
    async fn put_object(
        &self,
        key: &StorageKey,
        body: Bytes,
        content_type: &str,
    ) -> StorageResult<StoredObject>;

    /// Public locator of the object stored under `key`.
    fn public_url(&self, key: &StorageKey) -> String;

    /// Bucket the store writes into.
    fn bucket(&self) -> &str;
}

/// The handler's view of storage readiness.
///
/// Built once at startup: either a ready client, or the configuration error
/// that prevented building one. Requests against a misconfigured slot fail
/// before any I/O.
#[derive(Clone)]
pub enum StoreSlot {
    Ready(Arc<dyn ObjectStore>),
    Misconfigured(ConfigError),
}

impl StoreSlot {
    pub fn ready(&self) -> Result<&Arc<dyn ObjectStore>, ConfigError> {
        match self {
            StoreSlot::Ready(store) => Ok(store),
            StoreSlot::Misconfigured(err) => Err(err.clone()),
        }
    }
}

impl fmt::Debug for StoreSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreSlot::Ready(store) => f.debug_tuple("Ready").field(&store.bucket()).finish(),
            StoreSlot::Misconfigured(err) => f.debug_tuple("Misconfigured").field(err).finish(),
        }
    }
}

/// `ObjectStore` backed by Amazon S3 or any S3-compatible service.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    config: Arc<StorageConfig>,
}

impl S3ObjectStore {
    /// Build a client from a validated configuration.
    ///
    /// No request is sent here; credentials are static and the region is
    /// explicit, so nothing is resolved over the network.
    pub async fn connect(config: StorageConfig) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(Credentials::new(
                config.access_key_id.clone(),
                config.secret_access_key.clone(),
                None,
                None,
                "media-ingest",
            ))
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.put_timeout)
                    .build(),
            )
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            config: Arc::new(config),
        }
    }

    fn put_timeout(&self) -> Duration {
        self.config.put_timeout
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        key: &StorageKey,
        body: Bytes,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let key_str = key.to_string();
        let size_bytes = body.len() as u64;
        let content_md5 = general_purpose::STANDARD.encode(md5::compute(&body).0);

        let request = self
            .client
            .put_object()
            .bucket(&self.config.bucket_name)
            .key(&key_str)
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(content_type)
            .content_md5(content_md5)
            .body(ByteStream::from(body))
            .send();

        let span = info_span!(
            "s3.put_object",
            bucket = %self.config.bucket_name,
            key = %key_str,
            size_bytes
        );
        let output = match tokio::time::timeout(self.put_timeout(), request)
            .instrument(span)
            .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return Err(classify_sdk_error(err)),
            Err(_) => {
                return Err(StorageError::Network(format!(
                    "put timed out after {:?}",
                    self.put_timeout()
                )));
            }
        };

        let etag = output.e_tag().map(|tag| tag.trim_matches('"').to_string());
        debug!(key = %key_str, etag = ?etag, "PutObject confirmed");

        Ok(StoredObject {
            key: key.clone(),
            size_bytes,
            content_type: content_type.to_string(),
            etag,
            access_policy: AccessPolicy::PublicRead,
            stored_at: Utc::now(),
        })
    }

    fn public_url(&self, key: &StorageKey) -> String {
        self.config.public_url(key)
    }

    fn bucket(&self) -> &str {
        &self.config.bucket_name
    }
}

fn classify_sdk_error(err: SdkError<PutObjectError>) -> StorageError {
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            StorageError::Network(message)
        }
        _ => {
            let status = err.raw_response().map(|resp| resp.status().as_u16());
            let code = err.as_service_error().and_then(|e| e.code());
            classify_failure(status, code, message)
        }
    }
}

/// Map an HTTP status and S3 error code onto the storage error taxonomy.
fn classify_failure(status: Option<u16>, code: Option<&str>, message: String) -> StorageError {
    const AUTH_CODES: [&str; 4] = [
        "AccessDenied",
        "InvalidAccessKeyId",
        "SignatureDoesNotMatch",
        "ExpiredToken",
    ];

    if code.is_some_and(|c| AUTH_CODES.contains(&c)) || matches!(status, Some(401 | 403)) {
        return StorageError::Authorization(message);
    }
    match status {
        Some(s) if s >= 500 => StorageError::Network(message),
        Some(408 | 429) => StorageError::Network(message),
        None => StorageError::Network(message),
        Some(_) => StorageError::Rejected(message),
    }
}
