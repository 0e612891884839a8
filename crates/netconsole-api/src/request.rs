// Outbound request description and per-attempt metadata.

use std::time::{Duration, Instant};

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::Error;

/// Everything needed to issue one API call, independent of the base URL.
///
/// `path` is relative to the configured base endpoint. `retried` starts
/// `false` and flips to `true` at most once, when the request is replayed
/// after a token refresh.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
    retried: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append one query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Set a raw JSON body.
    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, Error> {
        Ok(self.body(serde_json::to_value(body)?))
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Set `Authorization: Bearer <token>`, marked sensitive so it never
    /// shows up in debug output.
    pub fn set_bearer(&mut self, token: &SecretString) -> Result<(), Error> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("access token is not a valid header value: {e}"),
            })?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Whether the request was sent with exactly this bearer token.
    pub(crate) fn carries_bearer(&self, token: &SecretString) -> bool {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|sent| sent == token.expose_secret())
    }
}

/// Latency bookkeeping attached to one attempt.
#[derive(Debug, Clone, Copy)]
pub struct RequestMetadata {
    pub start_time: Instant,
}

impl RequestMetadata {
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn builder_collects_parts() {
        let req = RequestDescriptor::get("/devices")
            .query("site", "hq")
            .query("limit", "25");
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/devices");
        assert_eq!(
            req.params,
            vec![
                ("site".to_owned(), "hq".to_owned()),
                ("limit".to_owned(), "25".to_owned())
            ]
        );
        assert!(req.body.is_none());
        assert!(!req.is_retried());
    }

    #[test]
    fn bearer_header_is_sensitive() {
        let mut req = RequestDescriptor::get("/devices");
        let token = SecretString::from("abc".to_owned());
        req.set_bearer(&token).unwrap();

        let value = req.headers.get(AUTHORIZATION).unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer abc");
        assert!(value.is_sensitive());
        assert!(req.carries_bearer(&token));
        assert!(!req.carries_bearer(&SecretString::from("other".to_owned())));
    }

    #[test]
    fn json_body_is_serialized() {
        #[derive(Serialize)]
        struct Rename<'a> {
            name: &'a str,
        }

        let req = RequestDescriptor::put("/devices/7")
            .json(&Rename { name: "core-sw-01" })
            .unwrap();
        assert_eq!(req.body, Some(serde_json::json!({ "name": "core-sw-01" })));
    }
}
