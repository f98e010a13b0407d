//! HTTP implementations of the uploader transport traits.
//!
//! [`HttpControlPlane`] talks JSON to the HaruFilm REST API with Bearer
//! authentication; [`HttpObjectStorage`] performs raw PUTs against the
//! presigned URLs it hands out.

mod control_plane;
mod storage;

#[cfg(test)]
mod mock_server;

pub use control_plane::HttpControlPlane;
pub use storage::HttpObjectStorage;

/// Errors building a client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid access token")]
    InvalidToken,

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Maps a transport failure onto the uploader's error taxonomy.
pub(crate) fn network_error(e: reqwest::Error) -> harufilm_uploader::RequestError {
    harufilm_uploader::RequestError::Network(e.to_string())
}
