use bytes::Bytes;
use harufilm_uploader::{ObjectStorage, RequestFuture, StoragePut};
use reqwest::header::ETAG;
use tracing::debug;

use crate::{Error, network_error};

/// PUTs bodies to presigned object-storage URLs.
///
/// Presigned URLs carry their own authorization, so no default headers are set.
pub struct HttpObjectStorage {
    http: reqwest::Client,
}

impl HttpObjectStorage {
    pub fn new() -> Result<Self, Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http })
    }
}

impl ObjectStorage for HttpObjectStorage {
    fn put<'a>(&'a self, url: &'a str, body: Bytes) -> RequestFuture<'a, StoragePut> {
        Box::pin(async move {
            let bytes = body.len();
            let resp = self
                .http
                .put(url)
                .body(body)
                .send()
                .await
                .map_err(network_error)?;

            let status = resp.status().as_u16();
            let entity_tag = resp
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            debug!(status, bytes, has_etag = entity_tag.is_some(), "storage put");

            Ok(StoragePut { status, entity_tag })
        })
    }
}
