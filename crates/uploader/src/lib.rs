//! Video upload orchestration for HaruFilm diaries.
//!
//! This crate implements the **business logic** of getting one recorded
//! video and its thumbnail to object storage and committed with the
//! control plane. It has no HTTP dependency: callers provide
//! [`ControlPlane`] and [`ObjectStorage`] implementations.
//!
//! # Pipeline (resumable)
//!
//! 1. **Resolve**: purge expired sessions, resume or initiate a transfer
//! 2. **Parts**: upload pending parts, at most five at a time, each retried
//! 3. **Thumbnail**: presign, put, confirm
//! 4. **Commit**: complete the transfer with the sorted part manifest
//! 5. **Cleanup**: forget the session
//!
//! [`BatchUploader`] skips the session store and sends the whole video as
//! a single part.

pub mod batch;
mod commit;
pub mod controller;
pub mod error;
pub mod part;
pub mod resumable;
pub mod strategy;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience.
pub use batch::BatchUploader;
pub use controller::{UploadController, UploadEvent, UploadStatus};
pub use error::UploadError;
pub use part::{PartAttemptError, PartTarget, PartUploader};
pub use resumable::ResumableUploader;
pub use strategy::{UploadFuture, UploadReceipt, UploadStrategy};
pub use transport::{ControlPlane, ObjectStorage, RequestError, RequestFuture, StoragePut};
pub use types::{FileKeyStrategy, UploadMode, UploadRequest, UploaderConfig};
