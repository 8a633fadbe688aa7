//! Request and response shapes of the ingestion endpoint.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A fully materialized `file` part of an upload request.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Filename declared by the client; may be empty.
    pub original_filename: String,

    /// Declared content type, `application/octet-stream` when none was sent.
    pub content_type: String,

    pub bytes: Bytes,
}

/// Body of a successful upload response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResult {
    /// Public URL the object can be fetched from.
    pub link: String,
}

/// The `file` part of an upload request, or its absence.
#[derive(Debug, Clone)]
pub enum UploadPart {
    Present(FilePart),
    Absent,
}
