//! Durable store of in-progress multipart upload sessions.
//!
//! One [`UploadSession`] is kept per file key. Every mutation is written
//! through a [`KvBackend`] before it returns, so a process restart resumes
//! from the last recorded part.

mod backend;
mod clock;
mod session;
mod store;

pub use backend::{FileBackend, KvBackend, MemoryBackend, default_store_dir};
pub use clock::{Clock, ManualClock, SystemClock, logical_date};
pub use session::UploadSession;
pub use store::{STORAGE_KEY, SessionStore};

/// Errors from session persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
