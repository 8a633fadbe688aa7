//! Represents an object (blob) written to the bucket and the key it lives under.

use chrono::{DateTime, Utc};
use std::fmt;

/// Unique identifier of an object within the bucket.
///
/// Rendered as `{random}.{extension}` or just `{random}` when the original
/// filename carried no usable extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    random: String,
    extension: Option<String>,
}

impl StorageKey {
    pub fn new(random: impl Into<String>, extension: Option<&str>) -> Self {
        Self {
            random: random.into(),
            extension: extension.map(str::to_string),
        }
    }

    /// Opaque unique token at the start of the key.
    pub fn random_component(&self) -> &str {
        &self.random
    }

    /// Extension copied verbatim from the original filename, if any.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.extension {
            Some(ext) => write!(f, "{}.{}", self.random, ext),
            None => f.write_str(&self.random),
        }
    }
}

/// Access policy applied to an object at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Fetchable by any unauthenticated reader via its public URL.
    PublicRead,
}

/// Durable record of a successful write.
///
/// Created once per upload and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Key the object was written under.
    pub key: StorageKey,

    /// Size in bytes.
    pub size_bytes: u64,

    /// Content type (MIME type) sent with the object.
    pub content_type: String,

    /// ETag reported by the store, when it returns one.
    pub etag: Option<String>,

    pub access_policy: AccessPolicy,

    /// When the store confirmed the write.
    pub stored_at: DateTime<Utc>,
}
