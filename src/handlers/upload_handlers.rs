//! HTTP handler for the media ingestion endpoint.
//!
//! `POST /api/upload` takes a multipart body with one part named `file`,
//! writes it to the object store under a fresh key and answers with
//! `{ "link": "<public url>" }`. The flow is linear and never retried here:
//! parse, check storage configuration, read the payload, derive the key,
//! store, respond. Once started, the store write is not cancelled by a
//! caller disconnect.

use crate::{
    AppState,
    errors::AppError,
    models::upload::{FilePart, UploadPart, UploadResult},
    services::storage_service::StoreSlot,
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::Field},
};
use std::sync::Arc;
use tracing::{info, warn};

/// Name of the multipart part carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// `POST /api/upload`
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResult>, AppError> {
    let part = match read_upload(&mut multipart, &state.store).await? {
        UploadPart::Present(part) => part,
        UploadPart::Absent => {
            warn!("upload rejected: no `{}` part in request", FILE_FIELD);
            return Err(AppError::bad_request("File not found"));
        }
    };

    let store = state.store.ready()?;
    let FilePart {
        original_filename,
        content_type,
        bytes,
    } = part;
    let key = state.keys.generate(&original_filename)?;

    // The write runs on its own task: if the caller goes away, the handler
    // future is dropped but the put still runs to completion.
    let size = bytes.len();
    let write = tokio::spawn({
        let store = Arc::clone(store);
        let key = key.clone();
        async move { store.put_object(&key, bytes, &content_type).await }
    });
    let stored = write
        .await
        .map_err(|err| AppError::internal(format!("store write task failed: {}", err)))?
        .inspect_err(|err| {
            tracing::error!(key = %key, size, "upload failed: {}", err);
        })?;

    let link = store.public_url(&stored.key);
    info!(
        key = %stored.key,
        size = stored.size_bytes,
        content_type = %stored.content_type,
        original_filename = %original_filename,
        "stored upload"
    );

    Ok(Json(UploadResult { link }))
}

/// Advance through the multipart stream to the `file` part and read it.
///
/// Parts with other names are skipped; the parser discards their data when
/// the next part is requested. Storage configuration is checked once the
/// part is found and before its payload is pulled into memory.
async fn read_upload(multipart: &mut Multipart, slot: &StoreSlot) -> Result<UploadPart, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        slot.ready().inspect_err(|err| {
            tracing::error!("upload aborted, storage is not configured: {}", err);
        })?;
        return Ok(UploadPart::Present(read_file_part(field).await?));
    }
    Ok(UploadPart::Absent)
}

/// Read the whole part into memory along with its declared metadata.
async fn read_file_part(field: Field<'_>) -> Result<FilePart, AppError> {
    let original_filename = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let bytes = field.bytes().await?;

    Ok(FilePart {
        original_filename,
        content_type,
        bytes,
    })
}
