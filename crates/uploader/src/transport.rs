//! Seams to the outside world: the REST control plane and object storage.
//!
//! `harufilm-api-client` implements both traits over HTTP. Using traits
//! keeps the orchestrators decoupled from transport and testable with mocks.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use harufilm_protocol::CompleteUploadRequest;

/// Boxed future returned by transport calls.
pub type RequestFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RequestError>> + Send + 'a>>;

/// A failed round trip. Every variant is transient from the uploader's view:
/// the part loop retries it, other steps surface it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Control plane issuing transfer ids and presigned URLs.
pub trait ControlPlane: Send + Sync {
    /// Starts a multipart transfer and returns its id.
    fn initiate_upload<'a>(&'a self, logical_date: &'a str) -> RequestFuture<'a, String>;

    /// Returns a presigned PUT URL for one part.
    ///
    /// URLs are short-lived; callers request a fresh one per attempt.
    fn part_upload_url<'a>(
        &'a self,
        transfer_id: &'a str,
        logical_date: &'a str,
        part_number: u32,
    ) -> RequestFuture<'a, String>;

    /// Commits the transfer. `request.parts` must be sorted by part number.
    fn complete_upload<'a>(&'a self, request: &'a CompleteUploadRequest) -> RequestFuture<'a, ()>;

    /// Returns a presigned PUT URL for the thumbnail.
    fn initiate_thumbnail<'a>(&'a self, logical_date: &'a str) -> RequestFuture<'a, String>;

    /// Confirms the thumbnail was stored.
    fn complete_thumbnail<'a>(&'a self, logical_date: &'a str) -> RequestFuture<'a, ()>;
}

/// Raw PUT against a presigned URL.
pub trait ObjectStorage: Send + Sync {
    fn put<'a>(&'a self, url: &'a str, body: Bytes) -> RequestFuture<'a, StoragePut>;
}

/// What object storage answered to a PUT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePut {
    pub status: u16,
    /// Raw `ETag` header, quotes included.
    pub entity_tag: Option<String>,
}

impl StoragePut {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
