//! Single-part upload with no persisted session.

use std::sync::Arc;

use harufilm_session_store::{Clock, logical_date};
use harufilm_transfer::{
    PROGRESS_AFTER_PARTS, PROGRESS_AFTER_THUMBNAIL, PROGRESS_DONE, ProgressReporter, RetryPolicy,
};
use tracing::info;

use crate::commit::{commit_upload, upload_thumbnail};
use crate::error::UploadError;
use crate::part::{PartTarget, PartUploader};
use crate::strategy::{UploadFuture, UploadReceipt, UploadStrategy};
use crate::transport::{ControlPlane, ObjectStorage};
use crate::types::{UploadMode, UploadRequest};

/// Sends the whole video as part 1 in a single attempt.
///
/// Every call initiates a new transfer; nothing survives a failure.
pub struct BatchUploader {
    control: Arc<dyn ControlPlane>,
    storage: Arc<dyn ObjectStorage>,
    clock: Arc<dyn Clock>,
    part: PartUploader,
    progress: ProgressReporter,
}

impl BatchUploader {
    pub fn new(
        control: Arc<dyn ControlPlane>,
        storage: Arc<dyn ObjectStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let part = PartUploader::new(
            Arc::clone(&control),
            Arc::clone(&storage),
            RetryPolicy::single_attempt(),
        );
        Self {
            control,
            storage,
            clock,
            part,
            progress: ProgressReporter::new(),
        }
    }

    async fn run(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
        self.progress.reset();
        if request.video.is_empty() {
            return Err(UploadError::EmptyVideo);
        }

        let date = logical_date(self.clock.now());
        let transfer_id = self
            .control
            .initiate_upload(&date)
            .await
            .map_err(UploadError::ControlPlane)?;
        info!(transfer_id = %transfer_id, bytes = request.video.len(), "batch upload started");

        let target = PartTarget {
            transfer_id: transfer_id.clone(),
            logical_date: date.clone(),
            part_number: 1,
        };
        let part = self.part.upload_part(request.video.clone(), &target).await?;
        self.progress.report(PROGRESS_AFTER_PARTS);

        upload_thumbnail(
            self.control.as_ref(),
            self.storage.as_ref(),
            &date,
            request.thumbnail.clone(),
        )
        .await?;
        self.progress.report(PROGRESS_AFTER_THUMBNAIL);

        commit_upload(
            self.control.as_ref(),
            &transfer_id,
            &date,
            vec![part],
            &request.timestamps,
        )
        .await?;
        self.progress.report(PROGRESS_DONE);

        Ok(UploadReceipt {
            transfer_id,
            logical_date: date,
            part_count: 1,
            reused_parts: 0,
        })
    }
}

impl UploadStrategy for BatchUploader {
    fn upload<'a>(&'a self, request: &'a UploadRequest) -> UploadFuture<'a> {
        Box::pin(self.run(request))
    }

    fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    fn mode(&self) -> UploadMode {
        UploadMode::Batch
    }
}
