//! [`MergeBackend`] over HTTP, using `reqwest`.
//!
//! ## Error mapping
//!
//! | Situation | Error |
//! |-----------|-------|
//! | request exceeded its timeout | [`MergeError::Timeout`] |
//! | connection refused, DNS, TLS… | [`MergeError::RemoteFailure`] with `status: None` |
//! | non-2xx response | [`MergeError::RemoteFailure`] with the server's message |
//! | 2xx with an undecodable body | [`MergeError::InvalidResponse`] |
//!
//! The server's message is taken verbatim from the JSON body's `message`,
//! `detail` or `error` field, falling back to the raw body text, then to the
//! HTTP status line.

use super::{MergeBackend, MergeRequest, MergeResult, RangeRequest, ReorderRequest};
use crate::config::ClientConfig;
use crate::error::MergeError;
use crate::page::PageRef;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP client for the merge endpoints of the document service.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    root: Url,
    request_timeout: Duration,
    execute_timeout: Duration,
}

impl HttpBackend {
    /// Build a backend from a validated [`ClientConfig`].
    pub fn new(config: &ClientConfig) -> Result<Self, MergeError> {
        let client = Client::builder()
            .user_agent(concat!("docmerge-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MergeError::Internal(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(client, config)
    }

    /// Reuse an existing `reqwest::Client` (connection pool, proxies, TLS).
    pub fn with_client(client: Client, config: &ClientConfig) -> Result<Self, MergeError> {
        Ok(Self {
            client,
            root: config.api_root()?,
            request_timeout: config.request_timeout(),
            execute_timeout: config.execute_timeout(),
        })
    }

    /// Absolute URL for the given path segments, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, MergeError> {
        let mut url = self.root.clone();
        url.path_segments_mut()
            .map_err(|_| MergeError::InvalidConfig(format!("'{}' cannot be a base URL", self.root)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, MergeError> {
        let url = self.url(segments)?;
        debug!("{} {}", method, url);
        Ok(self.client.request(method, url).timeout(self.request_timeout))
    }

    /// Send, map transport errors and non-2xx statuses.
    async fn send(
        &self,
        operation: &str,
        builder: RequestBuilder,
        timeout: Duration,
    ) -> Result<Response, MergeError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                MergeError::Timeout {
                    operation: operation.to_string(),
                    secs: timeout.as_secs(),
                }
            } else {
                MergeError::RemoteFailure {
                    operation: operation.to_string(),
                    status: None,
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(MergeError::RemoteFailure {
            operation: operation.to_string(),
            status: Some(status.as_u16()),
            message: server_message(&body).unwrap_or_else(|| format!("HTTP {status}")),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        builder: RequestBuilder,
        timeout: Duration,
    ) -> Result<T, MergeError> {
        let response = self.send(operation, builder, timeout).await?;
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                MergeError::Timeout {
                    operation: operation.to_string(),
                    secs: timeout.as_secs(),
                }
            } else {
                MergeError::InvalidResponse {
                    operation: operation.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| MergeError::InvalidResponse {
            operation: operation.to_string(),
            detail: e.to_string(),
        })
    }
}

impl MergeBackend for HttpBackend {
    async fn list_queue(&self) -> Result<Vec<PageRef>, MergeError> {
        let req = self.request(Method::GET, &["merge", "queue"])?;
        self.send_json("list queue", req, self.request_timeout).await
    }

    async fn select_page(&self, page: &PageRef) -> Result<PageRef, MergeError> {
        let req = self.request(Method::POST, &["merge", "select-page"])?.json(page);
        self.send_json("select page", req, self.request_timeout).await
    }

    async fn deselect_page(&self, page_id: &str) -> Result<(), MergeError> {
        let req = self.request(Method::DELETE, &["merge", "select-page", page_id])?;
        self.send("deselect page", req, self.request_timeout).await?;
        Ok(())
    }

    async fn select_range(&self, request: &RangeRequest) -> Result<Vec<PageRef>, MergeError> {
        let req = self.request(Method::POST, &["merge", "select-range"])?.query(request);
        self.send_json("select range", req, self.request_timeout).await
    }

    async fn toggle_all(&self, document_id: &str) -> Result<Vec<PageRef>, MergeError> {
        let req = self.request(Method::POST, &["merge", "toggle-all", document_id])?;
        self.send_json("toggle all", req, self.request_timeout).await
    }

    async fn reorder(&self, request: &ReorderRequest) -> Result<Vec<PageRef>, MergeError> {
        let req = self.request(Method::POST, &["merge", "reorder"])?.query(request);
        self.send_json("reorder", req, self.request_timeout).await
    }

    async fn clear_queue(&self) -> Result<(), MergeError> {
        let req = self.request(Method::DELETE, &["merge", "queue"])?;
        self.send("clear queue", req, self.request_timeout).await?;
        Ok(())
    }

    async fn execute_merge(&self, request: &MergeRequest) -> Result<MergeResult, MergeError> {
        info!(
            "Submitting merge of {} pages as '{}'",
            request.page_ids.len(),
            request.config.output_file_name
        );
        let req = self
            .request(Method::POST, &["merge", "execute"])?
            .timeout(self.execute_timeout)
            .json(request);
        self.send_json("execute merge", req, self.execute_timeout).await
    }

    async fn preview(&self) -> Result<Vec<String>, MergeError> {
        let req = self.request(Method::GET, &["merge", "preview"])?;
        self.send_json("preview", req, self.request_timeout).await
    }

    async fn document_pages(&self, document_id: &str) -> Result<Vec<PageRef>, MergeError> {
        let req = self.request(Method::GET, &["merge", "documents", document_id, "pages"])?;
        self.send_json("list document pages", req, self.request_timeout).await
    }
}

/// Pull a human-readable message out of an error body.
fn server_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "detail", "error"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(serde_json::Value::Null) | None => {}
                Some(other) => return Some(other.to_string()),
            }
        }
    }
    Some(body.to_string())
}
