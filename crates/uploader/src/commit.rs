//! Thumbnail and commit steps shared by both strategies.

use bytes::Bytes;
use harufilm_protocol::{CompleteUploadRequest, Part, Timestamp};
use tracing::{debug, info};

use crate::error::UploadError;
use crate::transport::{ControlPlane, ObjectStorage};

/// Presigns, uploads and confirms the thumbnail for `logical_date`.
pub(crate) async fn upload_thumbnail(
    control: &dyn ControlPlane,
    storage: &dyn ObjectStorage,
    logical_date: &str,
    thumbnail: Bytes,
) -> Result<(), UploadError> {
    let url = control
        .initiate_thumbnail(logical_date)
        .await
        .map_err(|e| UploadError::Thumbnail(e.to_string()))?;

    let bytes = thumbnail.len();
    let put = storage
        .put(&url, thumbnail)
        .await
        .map_err(|e| UploadError::Thumbnail(e.to_string()))?;
    if !put.is_success() {
        return Err(UploadError::Thumbnail(format!(
            "storage answered HTTP {}",
            put.status
        )));
    }

    control
        .complete_thumbnail(logical_date)
        .await
        .map_err(|e| UploadError::Thumbnail(e.to_string()))?;
    debug!(logical_date, bytes, "thumbnail stored");
    Ok(())
}

/// Completes the transfer with `parts`, which must already be sorted.
pub(crate) async fn commit_upload(
    control: &dyn ControlPlane,
    transfer_id: &str,
    logical_date: &str,
    parts: Vec<Part>,
    timestamps: &[Timestamp],
) -> Result<(), UploadError> {
    let part_count = parts.len();
    let request = CompleteUploadRequest {
        upload_id: transfer_id.to_string(),
        upload_date: logical_date.to_string(),
        parts,
        timestamps: timestamps.to_vec(),
    };
    control
        .complete_upload(&request)
        .await
        .map_err(UploadError::Commit)?;
    info!(transfer_id, logical_date, parts = part_count, "upload committed");
    Ok(())
}
