use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use harufilm_protocol::Timestamp;
use harufilm_transfer::{DEFAULT_CONCURRENCY, DEFAULT_PART_SIZE, RetryPolicy, checksum_bytes};
use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// Sessions idle for longer than this are discarded.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Hex characters of the video digest appended by [`FileKeyStrategy::ContentDigest`].
const DIGEST_KEY_LEN: usize = 16;

/// One upload: the recorded video, its thumbnail and the labelled offsets.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub video: Bytes,
    pub thumbnail: Bytes,
    pub timestamps: Vec<Timestamp>,
}

/// Which orchestrator runs an upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    #[default]
    Resumable,
    Batch,
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resumable => f.write_str("resumable"),
            Self::Batch => f.write_str("batch"),
        }
    }
}

/// How a video is mapped to its session key.
///
/// `DateAndSize` keys two same-size videos recorded on the same date to the
/// same session. `ContentDigest` tells them apart at the cost of hashing
/// the whole video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKeyStrategy {
    #[default]
    DateAndSize,
    ContentDigest,
}

impl FileKeyStrategy {
    /// Session key for `video` uploaded on `logical_date`.
    pub fn file_key(&self, logical_date: &str, video: &[u8]) -> String {
        match self {
            Self::DateAndSize => format!("{logical_date}_{}", video.len()),
            Self::ContentDigest => {
                let digest = checksum_bytes(video);
                format!(
                    "{logical_date}_{}_{}",
                    video.len(),
                    &digest[..DIGEST_KEY_LEN]
                )
            }
        }
    }
}

/// Tunables shared by both orchestrators.
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Bytes per part (the last part may be shorter).
    pub part_size: u64,
    /// Part transfers allowed in flight at once.
    pub concurrency: usize,
    /// Idle time after which a stored session is discarded.
    pub session_ttl: Duration,
    /// Per-part retry policy.
    pub retry: RetryPolicy,
    pub file_key: FileKeyStrategy,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            session_ttl: DEFAULT_SESSION_TTL,
            retry: RetryPolicy::default(),
            file_key: FileKeyStrategy::default(),
        }
    }
}

impl UploaderConfig {
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.part_size == 0 {
            return Err(UploadError::InvalidConfig(
                "part_size must be positive".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(UploadError::InvalidConfig(
                "concurrency must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(UploadError::InvalidConfig(
                "retry policy needs at least one attempt".into(),
            ));
        }
        Ok(())
    }
}
