// Buffered API responses.

use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::request::RequestMetadata;

/// A successful (2xx) response with its body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    elapsed: Duration,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes, elapsed: Duration) -> Self {
        Self {
            status,
            headers,
            body,
            elapsed,
        }
    }

    /// Read a `reqwest::Response` to completion.
    ///
    /// Non-2xx statuses become [`Error::Http`] with the body preserved.
    pub(crate) async fn read(
        resp: reqwest::Response,
        metadata: &RequestMetadata,
    ) -> Result<Self, Error> {
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;

        if !status.is_success() {
            return Err(Error::from_status(
                status,
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        Ok(Self::new(status, headers, body, metadata.elapsed()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Time from dispatch until the body was read.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| {
            let body = self.text();
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}
