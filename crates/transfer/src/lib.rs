//! Building blocks for chunked, resumable uploads.
//!
//! - [`PartPlan`] splits a blob into 1-based byte-range parts.
//! - [`retry_with_backoff`] retries one fallible async step with linear backoff.
//! - [`ConcurrencyLimiter`] bounds the number of in-flight part transfers.
//! - [`ProgressReporter`] folds completion counts into a monotonic percentage.

mod chunked;
mod limiter;
mod progress;
mod retry;

pub use chunked::{PartPlan, checksum_bytes, unquote_entity_tag};
pub use limiter::{ConcurrencyLimiter, Slot};
pub use progress::{
    PROGRESS_AFTER_PARTS, PROGRESS_AFTER_THUMBNAIL, PROGRESS_DONE, ProgressCallback,
    ProgressReporter, part_progress,
};
pub use retry::{RetryError, RetryPolicy, retry_with_backoff};

/// Default part size: 5 MiB, the smallest part most S3-compatible backends accept.
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Default number of part transfers allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("part size must be positive")]
    InvalidPartSize,

    #[error("concurrency capacity must be positive")]
    InvalidCapacity,

    #[error("part {part_number} is outside 1..={part_count}")]
    PartOutOfRange { part_number: u32, part_count: u32 },

    #[error("blob is {actual} bytes, plan expects {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("concurrency limiter closed")]
    LimiterClosed,
}
