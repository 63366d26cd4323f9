//! The server boundary: everything the merge queue needs from the service.
//!
//! [`MergeBackend`] is the seam between local state and the authoritative
//! server-side queue. [`http::HttpBackend`] is the production
//! implementation; tests substitute an in-memory one.
//!
//! | Method | HTTP |
//! |--------|------|
//! | [`list_queue`](MergeBackend::list_queue) | `GET /merge/queue` |
//! | [`select_page`](MergeBackend::select_page) | `POST /merge/select-page` |
//! | [`deselect_page`](MergeBackend::deselect_page) | `DELETE /merge/select-page/{pageId}` |
//! | [`select_range`](MergeBackend::select_range) | `POST /merge/select-range?document_id&start&end` |
//! | [`toggle_all`](MergeBackend::toggle_all) | `POST /merge/toggle-all/{documentId}` |
//! | [`reorder`](MergeBackend::reorder) | `POST /merge/reorder?page_id&new_index` |
//! | [`clear_queue`](MergeBackend::clear_queue) | `DELETE /merge/queue` |
//! | [`execute_merge`](MergeBackend::execute_merge) | `POST /merge/execute` |
//! | [`preview`](MergeBackend::preview) | `GET /merge/preview` |
//! | [`document_pages`](MergeBackend::document_pages) | `GET /merge/documents/{documentId}/pages` |

pub mod http;

use crate::error::MergeError;
use crate::merge_config::MergeConfig;
use crate::page::PageRef;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Remote operations on the server-held merge queue.
///
/// Every method resolves to the server's answer or a remote-class
/// [`MergeError`] (`RemoteFailure`, `Timeout`, `InvalidResponse`).
/// Implementations must not retry on their own; rollback decisions belong
/// to the caller.
pub trait MergeBackend: Send + Sync {
    /// Current server queue, in order.
    fn list_queue(&self) -> impl Future<Output = Result<Vec<PageRef>, MergeError>> + Send;

    /// Add one page; returns the server's copy (its id is authoritative).
    fn select_page(
        &self,
        page: &PageRef,
    ) -> impl Future<Output = Result<PageRef, MergeError>> + Send;

    fn deselect_page(&self, page_id: &str) -> impl Future<Output = Result<(), MergeError>> + Send;

    /// Select a page range; returns only the newly created entries.
    fn select_range(
        &self,
        request: &RangeRequest,
    ) -> impl Future<Output = Result<Vec<PageRef>, MergeError>> + Send;

    /// Toggle every page of a document; returns the whole updated queue.
    fn toggle_all(
        &self,
        document_id: &str,
    ) -> impl Future<Output = Result<Vec<PageRef>, MergeError>> + Send;

    /// Move a page; returns the whole updated queue.
    fn reorder(
        &self,
        request: &ReorderRequest,
    ) -> impl Future<Output = Result<Vec<PageRef>, MergeError>> + Send;

    fn clear_queue(&self) -> impl Future<Output = Result<(), MergeError>> + Send;

    fn execute_merge(
        &self,
        request: &MergeRequest,
    ) -> impl Future<Output = Result<MergeResult, MergeError>> + Send;

    /// Ordered preview image references for the pending merge.
    fn preview(&self) -> impl Future<Output = Result<Vec<String>, MergeError>> + Send;

    /// Selectable pages of one source document, in page order.
    fn document_pages(
        &self,
        document_id: &str,
    ) -> impl Future<Output = Result<Vec<PageRef>, MergeError>> + Send;
}

// ── Wire types ───────────────────────────────────────────────────────────

/// Query parameters of `POST /merge/select-range`. Both bounds are zero-based
/// and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRequest {
    pub document_id: String,
    pub start: usize,
    pub end: usize,
}

/// Query parameters of `POST /merge/reorder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub page_id: String,
    pub new_index: usize,
}

/// Body of `POST /merge/execute`: the output config plus the page order the
/// client committed to, so the server can detect a queue that moved on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    #[serde(flatten)]
    pub config: MergeConfig,
    pub page_ids: Vec<String>,
}

/// Response of `POST /merge/execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub success: bool,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub total_pages: usize,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}
