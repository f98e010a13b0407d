use harufilm_protocol::endpoints;
use harufilm_protocol::{
    CompleteThumbnailRequest, CompleteUploadRequest, ErrorResponse, InitiateThumbnailRequest,
    InitiateUploadRequest, InitiateUploadResponse, PartUrlRequest, PresignedUrlResponse,
    SuccessResponse,
};
use harufilm_uploader::{ControlPlane, RequestError, RequestFuture};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{Error, network_error};

/// REST control plane client.
pub struct HttpControlPlane {
    http: reqwest::Client,
    base_url: String,
}

impl HttpControlPlane {
    /// Creates a client for `base_url`, authenticating with `access_token` when given.
    pub fn new(base_url: &str, access_token: Option<&str>) -> Result<Self, Error> {
        let base_url = base_url.trim_end_matches('/');
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::InvalidBaseUrl(base_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| Error::InvalidToken)?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POSTs `body` as JSON to `path` and decodes the response.
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, RequestError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(network_error)?;
        debug!(%path, status = status.as_u16(), bytes = bytes.len(), "control plane response");

        if !status.is_success() {
            return Err(RequestError::Status {
                status: status.as_u16(),
                message: error_message(status, &bytes),
            });
        }
        decode(&bytes)
    }
}

/// Decodes a success body. An empty body reads as `{}`.
fn decode<R: DeserializeOwned>(bytes: &[u8]) -> Result<R, RequestError> {
    let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        bytes
    };
    serde_json::from_slice(body).map_err(|e| RequestError::InvalidResponse(e.to_string()))
}

/// Best message for an error response: the server's `message` or `error`,
/// then the raw text, then the status reason.
fn error_message(status: reqwest::StatusCode, bytes: &[u8]) -> String {
    if let Ok(body) = serde_json::from_slice::<ErrorResponse>(bytes)
        && let Some(description) = body.description()
    {
        return description.to_string();
    }
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if !text.is_empty() && !text.starts_with('{') {
        return text.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

impl ControlPlane for HttpControlPlane {
    fn initiate_upload<'a>(&'a self, logical_date: &'a str) -> RequestFuture<'a, String> {
        Box::pin(async move {
            let req = InitiateUploadRequest {
                upload_date: logical_date.to_string(),
            };
            let resp: InitiateUploadResponse = self.post(endpoints::INITIATE_UPLOAD, &req).await?;
            Ok(resp.upload_id)
        })
    }

    fn part_upload_url<'a>(
        &'a self,
        transfer_id: &'a str,
        logical_date: &'a str,
        part_number: u32,
    ) -> RequestFuture<'a, String> {
        Box::pin(async move {
            let req = PartUrlRequest {
                upload_id: transfer_id.to_string(),
                part_number,
                upload_date: logical_date.to_string(),
            };
            let resp: PresignedUrlResponse = self.post(endpoints::PART_UPLOAD_URL, &req).await?;
            Ok(resp.presigned_url)
        })
    }

    fn complete_upload<'a>(&'a self, request: &'a CompleteUploadRequest) -> RequestFuture<'a, ()> {
        Box::pin(async move {
            let _: SuccessResponse = self.post(endpoints::COMPLETE_UPLOAD, request).await?;
            Ok(())
        })
    }

    fn initiate_thumbnail<'a>(&'a self, logical_date: &'a str) -> RequestFuture<'a, String> {
        Box::pin(async move {
            let req = InitiateThumbnailRequest {
                upload_date: logical_date.to_string(),
            };
            let resp: PresignedUrlResponse =
                self.post(endpoints::INITIATE_THUMBNAIL, &req).await?;
            Ok(resp.presigned_url)
        })
    }

    fn complete_thumbnail<'a>(&'a self, logical_date: &'a str) -> RequestFuture<'a, ()> {
        Box::pin(async move {
            let req = CompleteThumbnailRequest {
                upload_date: logical_date.to_string(),
            };
            let _: SuccessResponse = self.post(endpoints::COMPLETE_THUMBNAIL, &req).await?;
            Ok(())
        })
    }
}
