#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use bytes::Bytes;
use chrono::Utc;
use http_body_util::BodyExt;
use media_ingest::{
    AppState, build_app,
    models::{
        object::{AccessPolicy, StorageKey, StoredObject},
        upload::UploadResult,
    },
    services::{
        key_service::KeyGenerator,
        storage_service::{ObjectStore, StorageError, StorageResult, StoreSlot},
    },
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tower::ServiceExt;

pub const BUCKET: &str = "test-bucket";
pub const BOUNDARY: &str = "----media-ingest-test-boundary";
pub const TEST_LIMIT: usize = 64 * 1024;

/// Failure the in-memory store should report instead of storing.
#[derive(Clone, Copy, Debug)]
pub enum Failure {
    Network,
    Authorization,
}

/// In-memory `ObjectStore` recording every write.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    attempts: AtomicUsize,
    failure: Option<Failure>,
    delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(failure: Failure) -> Arc<Self> {
        Arc::new(Self {
            failure: Some(failure),
            ..Self::default()
        })
    }

    /// Store that takes `delay` to confirm each write.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    /// Number of `put_object` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Bytes and content type stored under `key`.
    pub fn get(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// Resolve a public link back to the stored object, the way a reader would.
    pub fn fetch(&self, link: &str) -> Option<(Bytes, String)> {
        let prefix = format!("https://{}.s3.amazonaws.com/", BUCKET);
        self.get(link.strip_prefix(&prefix)?)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        key: &StorageKey,
        body: Bytes,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure {
            Some(Failure::Network) => {
                return Err(StorageError::Network("connection reset".into()));
            }
            Some(Failure::Authorization) => {
                return Err(StorageError::Authorization("AccessDenied".into()));
            }
            None => {}
        }

        let size_bytes = body.len() as u64;
        let previous = self
            .objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body, content_type.to_string()));
        assert!(previous.is_none(), "key {key} was written twice");

        Ok(StoredObject {
            key: key.clone(),
            size_bytes,
            content_type: content_type.to_string(),
            etag: None,
            access_policy: AccessPolicy::PublicRead,
            stored_at: Utc::now(),
        })
    }

    fn public_url(&self, key: &StorageKey) -> String {
        format!("https://{}.s3.amazonaws.com/{}", BUCKET, key)
    }

    fn bucket(&self) -> &str {
        BUCKET
    }
}

pub fn app_with(store: Arc<MemoryStore>) -> Router {
    app_with_slot(StoreSlot::Ready(store), KeyGenerator::default())
}

pub fn app_with_slot(slot: StoreSlot, keys: KeyGenerator) -> Router {
    build_app(AppState::new(slot, keys), TEST_LIMIT)
}

/// One multipart part.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn part<'a>(
    name: &'a str,
    filename: Option<&'a str>,
    content_type: Option<&'a str>,
    data: &'a [u8],
) -> Part<'a> {
    Part {
        name,
        filename,
        content_type,
        data,
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for Part {
        name,
        filename,
        content_type,
        data,
    } in parts
    {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
            ),
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// `link` from a successful upload response.
pub async fn link_of(response: Response<Body>) -> String {
    let body = body_bytes(response).await;
    serde_json::from_slice::<UploadResult>(&body).unwrap().link
}
