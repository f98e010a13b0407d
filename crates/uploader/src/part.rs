//! Transfer of a single part with retries.

use std::sync::Arc;

use bytes::Bytes;
use harufilm_protocol::Part;
use harufilm_transfer::{RetryPolicy, retry_with_backoff, unquote_entity_tag};
use tracing::debug;

use crate::error::UploadError;
use crate::transport::{ControlPlane, ObjectStorage, RequestError};

/// Why one attempt at a part failed. Always retried.
#[derive(Debug, thiserror::Error)]
pub enum PartAttemptError {
    #[error("presigned URL request failed: {0}")]
    Presign(RequestError),

    #[error("storage request failed: {0}")]
    Put(RequestError),

    #[error("storage answered HTTP {0}")]
    Status(u16),

    #[error("storage response carried no ETag")]
    MissingEntityTag,
}

/// Where a part goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTarget {
    pub transfer_id: String,
    pub logical_date: String,
    pub part_number: u32,
}

/// Uploads one part: presign, PUT, extract the entity tag.
///
/// Nothing is persisted here; callers record the returned [`Part`].
#[derive(Clone)]
pub struct PartUploader {
    control: Arc<dyn ControlPlane>,
    storage: Arc<dyn ObjectStorage>,
    retry: RetryPolicy,
}

impl PartUploader {
    pub fn new(
        control: Arc<dyn ControlPlane>,
        storage: Arc<dyn ObjectStorage>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            control,
            storage,
            retry,
        }
    }

    /// Uploads `body` as `target.part_number`.
    ///
    /// Each attempt asks for a fresh presigned URL. Exhausting the retry
    /// policy yields [`UploadError::PartFailed`].
    pub async fn upload_part(&self, body: Bytes, target: &PartTarget) -> Result<Part, UploadError> {
        let label = format!("part {}", target.part_number);
        retry_with_backoff(&self.retry, &label, |_attempt| {
            let body = body.clone();
            async move { self.attempt(body, target).await }
        })
        .await
        .map_err(|e| UploadError::PartFailed {
            part_number: target.part_number,
            attempts: e.attempts,
            source: e.last,
        })
    }

    async fn attempt(&self, body: Bytes, target: &PartTarget) -> Result<Part, PartAttemptError> {
        let url = self
            .control
            .part_upload_url(&target.transfer_id, &target.logical_date, target.part_number)
            .await
            .map_err(PartAttemptError::Presign)?;

        let bytes = body.len();
        let put = self
            .storage
            .put(&url, body)
            .await
            .map_err(PartAttemptError::Put)?;

        if !put.is_success() {
            return Err(PartAttemptError::Status(put.status));
        }
        let tag = put
            .entity_tag
            .as_deref()
            .map(unquote_entity_tag)
            .filter(|t| !t.is_empty())
            .ok_or(PartAttemptError::MissingEntityTag)?;

        debug!(part = target.part_number, bytes, etag = %tag, "part stored");
        Ok(Part::new(target.part_number, tag))
    }
}
