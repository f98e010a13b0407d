//! Control-plane endpoint paths, relative to the API base URL.

/// Starts a multipart video transfer.
pub const INITIATE_UPLOAD: &str = "/videos/upload/initiate";

/// Issues a presigned URL for one part of a transfer.
pub const PART_UPLOAD_URL: &str = "/videos/upload/continue";

/// Commits the assembled transfer with its ordered part manifest.
pub const COMPLETE_UPLOAD: &str = "/videos/upload/complete";

/// Issues a presigned URL for the thumbnail image.
pub const INITIATE_THUMBNAIL: &str = "/videos/thumbnail/initiate";

/// Marks the thumbnail as uploaded.
pub const COMPLETE_THUMBNAIL: &str = "/videos/thumbnail/complete";
