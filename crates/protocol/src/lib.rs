//! Wire types for the HaruFilm upload control plane.
//!
//! Request and response bodies exchanged with the REST control plane
//! during a multipart video upload, plus the endpoint paths they travel on.

pub mod endpoints;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use messages::{
    CompleteThumbnailRequest, CompleteUploadRequest, ErrorResponse, InitiateThumbnailRequest,
    InitiateUploadRequest, InitiateUploadResponse, PartUrlRequest, PresignedUrlResponse,
    SuccessResponse,
};
pub use types::{Part, Timestamp};
