use std::future::Future;
use std::pin::Pin;

use harufilm_transfer::ProgressReporter;

use crate::error::UploadError;
use crate::types::{UploadMode, UploadRequest};

/// Boxed future returned by [`UploadStrategy::upload`].
pub type UploadFuture<'a> = Pin<Box<dyn Future<Output = Result<UploadReceipt, UploadError>> + Send + 'a>>;

/// Summary of a committed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub transfer_id: String,
    pub logical_date: String,
    pub part_count: u32,
    /// Parts recorded by an earlier attempt and not sent again.
    pub reused_parts: u32,
}

/// An upload orchestrator.
pub trait UploadStrategy: Send + Sync {
    /// Runs one full attempt: parts, thumbnail, commit.
    fn upload<'a>(&'a self, request: &'a UploadRequest) -> UploadFuture<'a>;

    /// Progress of the current or last attempt.
    fn progress(&self) -> &ProgressReporter;

    fn mode(&self) -> UploadMode;
}
