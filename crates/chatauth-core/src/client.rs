//! Shared HTTP client for the chat API
//!
//! reqwest bakes default headers into the `Client` at build time, so the
//! process-wide defaults live in a separate map that every request copies
//! from. Clones of [`ApiClient`] share that map.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::ErrorDetail;

/// HTTP client with mutable default headers
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
    defaults: Arc<RwLock<HeaderMap>>,
}

impl ApiClient {
    /// Create a client for `base_url`. `None` timeout waits indefinitely.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let mut defaults = HeaderMap::new();
        defaults.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
            defaults: Arc::new(RwLock::new(defaults)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // ========================================================================
    // Default headers
    // ========================================================================

    pub fn set_default_header(&self, name: HeaderName, value: &str) -> Result<()> {
        let value = HeaderValue::from_str(value)?;
        self.write_defaults().insert(name, value);
        Ok(())
    }

    /// Drop the header entirely (it is not left behind as an empty value)
    pub fn remove_default_header(&self, name: &HeaderName) {
        self.write_defaults().remove(name);
    }

    pub fn default_header(&self, name: &HeaderName) -> Option<String> {
        self.read_defaults()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Install `Authorization: Bearer <token>` for all later requests
    pub fn set_bearer(&self, token: &str) -> Result<()> {
        self.set_default_header(header::AUTHORIZATION, &format!("Bearer {}", token))
    }

    pub fn clear_bearer(&self) {
        self.remove_default_header(&header::AUTHORIZATION);
    }

    /// Currently installed authorization header, if any
    pub fn authorization(&self) -> Option<String> {
        self.default_header(&header::AUTHORIZATION)
    }

    fn read_defaults(&self) -> std::sync::RwLockReadGuard<'_, HeaderMap> {
        // Header maps stay consistent even if a writer panicked mid-insert
        self.defaults.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_defaults(&self) -> std::sync::RwLockWriteGuard<'_, HeaderMap> {
        self.defaults.write().unwrap_or_else(|e| e.into_inner())
    }

    // ========================================================================
    // Requests
    // ========================================================================

    fn with_defaults(&self, request: RequestBuilder) -> RequestBuilder {
        let headers = self.read_defaults().clone();
        request.headers(headers)
    }

    /// `GET` and decode a JSON body
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.with_defaults(self.client.get(self.url(path)));
        decode(request.send().await?).await
    }

    /// `POST` form-encoded fields and decode a JSON body
    pub async fn post_form<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &B,
    ) -> Result<T> {
        let request = self.with_defaults(self.client.post(self.url(path))).form(fields);
        decode(request.send().await?).await
    }

    /// `POST` a JSON body and decode a JSON body
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.with_defaults(self.client.post(self.url(path))).json(body);
        decode(request.send().await?).await
    }
}

/// Turn a response into `T`, or into `Rejected`/`UnexpectedStatus`
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorDetail>(&body) {
        Ok(err) => Err(Error::Rejected {
            status: status.as_u16(),
            detail: err.detail,
        }),
        Err(_) => {
            log::debug!(
                "HTTP {} without detail: {}",
                status,
                body.chars().take(200).collect::<String>()
            );
            Err(Error::UnexpectedStatus(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:8000/", None).unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let c = client();
        assert_eq!(c.base_url(), "http://localhost:8000");
        assert_eq!(c.url("/api/token"), "http://localhost:8000/api/token");
        assert_eq!(c.url("api/token"), "http://localhost:8000/api/token");
    }

    #[test]
    fn test_bearer_install_and_remove() {
        let c = client();
        assert_eq!(c.authorization(), None);

        c.set_bearer("abc123").unwrap();
        assert_eq!(c.authorization().as_deref(), Some("Bearer abc123"));

        c.clear_bearer();
        assert_eq!(c.authorization(), None);
        // Accept header survives
        assert_eq!(
            c.default_header(&header::ACCEPT).as_deref(),
            Some("application/json")
        );
    }

    #[test]
    fn test_clones_share_defaults() {
        let a = client();
        let b = a.clone();
        a.set_bearer("shared").unwrap();
        assert_eq!(b.authorization().as_deref(), Some("Bearer shared"));
        b.clear_bearer();
        assert_eq!(a.authorization(), None);
    }

    #[test]
    fn test_invalid_header_value_rejected() {
        let c = client();
        let err = c.set_bearer("line\nbreak").unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
        assert_eq!(c.authorization(), None);
    }
}
