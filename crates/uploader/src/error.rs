//! Upload error types.

use harufilm_session_store::StoreError;
use harufilm_transfer::TransferError;

use crate::part::PartAttemptError;
use crate::transport::RequestError;

/// Errors that end an upload attempt.
///
/// The stored session is left intact whichever variant is returned, so a
/// later attempt resumes from the parts already recorded.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("part {part_number} failed after {attempts} attempt(s): {source}")]
    PartFailed {
        part_number: u32,
        attempts: u32,
        #[source]
        source: PartAttemptError,
    },

    #[error("upload session {file_key} disappeared before commit")]
    SessionLost { file_key: String },

    #[error("thumbnail upload failed: {0}")]
    Thumbnail(String),

    #[error("commit failed: {0}")]
    Commit(#[source] RequestError),

    #[error("control plane error: {0}")]
    ControlPlane(#[source] RequestError),

    #[error("session store error: {0}")]
    Store(#[from] StoreError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("invalid uploader config: {0}")]
    InvalidConfig(String),

    #[error("video is empty")]
    EmptyVideo,

    #[error("no previous upload to retry")]
    NothingToRetry,

    #[error("part task failed: {0}")]
    Join(String),
}
