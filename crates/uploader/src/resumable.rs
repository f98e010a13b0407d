//! Resumable multipart upload.
//!
//! Completed parts are recorded in the [`SessionStore`] as they land, so a
//! failed or interrupted upload of the same video resumes where it stopped.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::Bytes;
use futures_util::stream::{FuturesUnordered, StreamExt};
use harufilm_session_store::{Clock, SessionStore, UploadSession, logical_date};
use harufilm_transfer::{
    ConcurrencyLimiter, PROGRESS_AFTER_THUMBNAIL, PROGRESS_DONE, PartPlan, ProgressReporter,
    part_progress,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::commit::{commit_upload, upload_thumbnail};
use crate::error::UploadError;
use crate::part::{PartTarget, PartUploader};
use crate::strategy::{UploadFuture, UploadReceipt, UploadStrategy};
use crate::transport::{ControlPlane, ObjectStorage};
use crate::types::{UploadMode, UploadRequest, UploaderConfig};

/// Uploads videos in parts, resuming from the stored session.
pub struct ResumableUploader {
    control: Arc<dyn ControlPlane>,
    storage: Arc<dyn ObjectStorage>,
    store: Arc<SessionStore>,
    parts: PartUploader,
    limiter: ConcurrencyLimiter,
    progress: Arc<ProgressReporter>,
    config: UploaderConfig,
}

/// Session resolved for one attempt.
struct ResolvedSession {
    file_key: String,
    session: UploadSession,
}

impl ResumableUploader {
    pub fn new(
        control: Arc<dyn ControlPlane>,
        storage: Arc<dyn ObjectStorage>,
        store: Arc<SessionStore>,
        config: UploaderConfig,
    ) -> Result<Self, UploadError> {
        config.validate()?;
        let limiter = ConcurrencyLimiter::new(config.concurrency)?;
        let parts = PartUploader::new(
            Arc::clone(&control),
            Arc::clone(&storage),
            config.retry,
        );
        Ok(Self {
            control,
            storage,
            store,
            parts,
            limiter,
            progress: Arc::new(ProgressReporter::new()),
            config,
        })
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    async fn run(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
        let epoch = self.progress.reset();
        if request.video.is_empty() {
            return Err(UploadError::EmptyVideo);
        }

        let plan = PartPlan::new(request.video.len() as u64, self.config.part_size)?;
        let ResolvedSession { file_key, session } =
            self.resolve_session(&request.video, &plan).await?;

        let reused = session.completed_count();
        self.progress
            .report_in(epoch, part_progress(reused, plan.part_count()));
        let pending = plan.pending(session.completed_numbers());
        info!(
            file_key = %file_key,
            transfer_id = %session.transfer_id,
            total = plan.part_count(),
            pending = pending.len(),
            "uploading parts"
        );

        self.transfer_parts(epoch, &file_key, &session, &plan, &request.video, pending)
            .await?;

        upload_thumbnail(
            self.control.as_ref(),
            self.storage.as_ref(),
            &session.logical_date,
            request.thumbnail.clone(),
        )
        .await?;
        self.progress.report_in(epoch, PROGRESS_AFTER_THUMBNAIL);

        // Re-read: the manifest is whatever the store durably holds.
        let stored = self
            .store
            .get_session(&file_key)
            .ok_or_else(|| UploadError::SessionLost {
                file_key: file_key.clone(),
            })?;
        commit_upload(
            self.control.as_ref(),
            &stored.transfer_id,
            &stored.logical_date,
            stored.sorted_parts(),
            &request.timestamps,
        )
        .await?;

        self.store.remove_session(&file_key)?;
        self.progress.report_in(epoch, PROGRESS_DONE);

        Ok(UploadReceipt {
            transfer_id: stored.transfer_id,
            logical_date: stored.logical_date,
            part_count: plan.part_count(),
            reused_parts: reused,
        })
    }

    /// Loads the session for this video or initiates a new transfer.
    async fn resolve_session(
        &self,
        video: &[u8],
        plan: &PartPlan,
    ) -> Result<ResolvedSession, UploadError> {
        self.store.clear_expired_sessions(self.config.session_ttl)?;

        let clock = self.store.clock();
        let date = logical_date(clock.now());
        let file_key = self.config.file_key.file_key(&date, video);

        if let Some(existing) = self.store.get_session(&file_key) {
            if existing.part_count == plan.part_count() {
                info!(
                    file_key = %file_key,
                    transfer_id = %existing.transfer_id,
                    completed = existing.completed_count(),
                    total = existing.part_count,
                    "resuming upload session"
                );
                return Ok(ResolvedSession {
                    file_key,
                    session: existing,
                });
            }
            warn!(
                file_key = %file_key,
                stored = existing.part_count,
                planned = plan.part_count(),
                "part count changed, discarding session"
            );
            self.store.remove_session(&file_key)?;
        }

        let transfer_id = self
            .control
            .initiate_upload(&date)
            .await
            .map_err(UploadError::ControlPlane)?;
        info!(file_key = %file_key, transfer_id = %transfer_id, "initiated upload");

        let session = UploadSession::new(transfer_id, date, plan.part_count(), clock.now_ms());
        let session = self.store.save_session(&file_key, session)?;
        Ok(ResolvedSession { file_key, session })
    }

    /// Uploads `pending` parts through the limiter.
    ///
    /// Returns on the first failure. Parts not yet admitted are never
    /// started; parts already in flight keep running detached and may
    /// still record their success, but their progress reports are tagged
    /// with `epoch` and ignored once a newer attempt has started.
    async fn transfer_parts(
        &self,
        epoch: u64,
        file_key: &str,
        session: &UploadSession,
        plan: &PartPlan,
        video: &Bytes,
        pending: Vec<u32>,
    ) -> Result<(), UploadError> {
        let mut queue: VecDeque<u32> = pending.into();
        let completed = Arc::new(AtomicU32::new(session.completed_count()));
        let mut in_flight: FuturesUnordered<JoinHandle<Result<(), UploadError>>> =
            FuturesUnordered::new();

        loop {
            tokio::select! {
                biased;

                Some(joined) = in_flight.next(), if !in_flight.is_empty() => {
                    match joined {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => return Err(e),
                        Err(e) => return Err(UploadError::Join(e.to_string())),
                    }
                }

                slot = self.limiter.acquire(), if !queue.is_empty() => {
                    let slot = slot?;
                    if let Some(part_number) = queue.pop_front() {
                        let job = PartJob {
                            parts: self.parts.clone(),
                            store: Arc::clone(&self.store),
                            progress: Arc::clone(&self.progress),
                            completed: Arc::clone(&completed),
                            epoch,
                            file_key: file_key.to_string(),
                            total: plan.part_count(),
                            body: plan.slice(video, part_number)?,
                            target: PartTarget {
                                transfer_id: session.transfer_id.clone(),
                                logical_date: session.logical_date.clone(),
                                part_number,
                            },
                        };
                        in_flight.push(slot.spawn(job.run()));
                    }
                }

                else => break,
            }
        }
        Ok(())
    }
}

/// Everything one spawned part task owns.
struct PartJob {
    parts: PartUploader,
    store: Arc<SessionStore>,
    progress: Arc<ProgressReporter>,
    completed: Arc<AtomicU32>,
    epoch: u64,
    file_key: String,
    total: u32,
    body: Bytes,
    target: PartTarget,
}

impl PartJob {
    async fn run(self) -> Result<(), UploadError> {
        let part = self.parts.upload_part(self.body, &self.target).await?;
        self.store
            .add_transfer_part(&self.file_key, &self.target.transfer_id, part)?;

        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.progress
            .report_in(self.epoch, part_progress(done, self.total));
        debug!(
            file_key = %self.file_key,
            part = self.target.part_number,
            done,
            total = self.total,
            "part recorded"
        );
        Ok(())
    }
}

impl UploadStrategy for ResumableUploader {
    fn upload<'a>(&'a self, request: &'a UploadRequest) -> UploadFuture<'a> {
        Box::pin(self.run(request))
    }

    fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    fn mode(&self) -> UploadMode {
        UploadMode::Resumable
    }
}
