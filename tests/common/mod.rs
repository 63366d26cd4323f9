//! In-memory stand-in for the document service's merge endpoints.

#![allow(dead_code)]

use docmerge_client::{
    MergeBackend, MergeError, MergeRequest, MergeResult, PageRef, RangeRequest, ReorderRequest,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct State {
    queue: Vec<PageRef>,
    documents: HashMap<String, Vec<PageRef>>,
    fail_next: Option<MergeError>,
    assign_ids: bool,
    next_id: usize,
    merge_result: Option<MergeResult>,
    merge_delay: Option<Duration>,
    last_merge: Option<MergeRequest>,
}

/// Server-side queue kept in memory, with failure injection.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
    calls: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

/// Route library logs to the test harness; `RUST_LOG=debug` shows them all.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

pub fn page(id: &str, doc: &str, index: usize) -> PageRef {
    PageRef::new(id, doc, index)
        .with_document_name(format!("{doc}.pdf"))
        .with_thumbnail(format!("/thumbs/{doc}/{index}.jpg"))
        .with_size(595.28, 841.89)
}

pub fn ids(pages: &[PageRef]) -> Vec<String> {
    pages.iter().map(|p| p.id.clone()).collect()
}

pub fn remote_failure(message: &str) -> MergeError {
    MergeError::RemoteFailure {
        operation: "test".into(),
        status: Some(500),
        message: message.into(),
    }
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        init_tracing();
        Arc::new(Self::default())
    }

    /// Register a source document with `n` pages, ids `{doc}-{i}`.
    pub fn with_document(self: Arc<Self>, doc: &str, n: usize) -> Arc<Self> {
        let pages = (0..n).map(|i| page(&format!("{doc}-{i}"), doc, i)).collect();
        self.state.lock().unwrap().documents.insert(doc.to_string(), pages);
        self
    }

    pub fn document(&self, doc: &str) -> Vec<PageRef> {
        self.state.lock().unwrap().documents.get(doc).cloned().unwrap_or_default()
    }

    pub fn seed_queue(&self, pages: Vec<PageRef>) {
        self.state.lock().unwrap().queue = pages;
    }

    pub fn server_queue(&self) -> Vec<String> {
        ids(&self.state.lock().unwrap().queue)
    }

    pub fn fail_next(&self, error: MergeError) {
        self.state.lock().unwrap().fail_next = Some(error);
    }

    /// Make `select_page` answer with freshly issued ids.
    pub fn assign_ids(&self) {
        self.state.lock().unwrap().assign_ids = true;
    }

    pub fn set_merge_result(&self, result: MergeResult) {
        self.state.lock().unwrap().merge_result = Some(result);
    }

    pub fn set_merge_delay(&self, delay: Duration) {
        self.state.lock().unwrap().merge_delay = Some(delay);
    }

    pub fn last_merge(&self) -> Option<MergeRequest> {
        self.state.lock().unwrap().last_merge.clone()
    }

    /// Hold the next request until the returned `Notify` is signalled.
    pub fn hold_next(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), MergeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.state.lock().unwrap().fail_next.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl MergeBackend for FakeBackend {
    async fn list_queue(&self) -> Result<Vec<PageRef>, MergeError> {
        self.enter().await?;
        Ok(self.state.lock().unwrap().queue.clone())
    }

    async fn select_page(&self, page: &PageRef) -> Result<PageRef, MergeError> {
        self.enter().await?;
        let mut state = self.state.lock().unwrap();
        let mut page = page.clone();
        if state.assign_ids {
            state.next_id += 1;
            page.id = format!("srv-{}", state.next_id);
        }
        if state.queue.iter().any(|p| p.id == page.id) {
            return Err(MergeError::RemoteFailure {
                operation: "select page".into(),
                status: Some(409),
                message: format!("page {} already selected", page.id),
            });
        }
        state.queue.push(page.clone());
        Ok(page)
    }

    async fn deselect_page(&self, page_id: &str) -> Result<(), MergeError> {
        self.enter().await?;
        self.state.lock().unwrap().queue.retain(|p| p.id != page_id);
        Ok(())
    }

    async fn select_range(&self, request: &RangeRequest) -> Result<Vec<PageRef>, MergeError> {
        self.enter().await?;
        let mut state = self.state.lock().unwrap();
        let doc = state.documents.get(&request.document_id).cloned().unwrap_or_default();
        let created: Vec<PageRef> = doc
            .into_iter()
            .filter(|p| p.page_index >= request.start && p.page_index <= request.end)
            .filter(|p| !state.queue.iter().any(|q| q.id == p.id))
            .collect();
        state.queue.extend(created.iter().cloned());
        // Deliberately unsorted to check the client orders them.
        Ok(created.into_iter().rev().collect())
    }

    async fn toggle_all(&self, document_id: &str) -> Result<Vec<PageRef>, MergeError> {
        self.enter().await?;
        let mut state = self.state.lock().unwrap();
        let doc = state.documents.get(document_id).cloned().unwrap_or_default();
        let all = !doc.is_empty() && doc.iter().all(|p| state.queue.iter().any(|q| q.id == p.id));
        if all {
            state.queue.retain(|p| p.document_id != document_id);
        } else {
            for p in doc {
                if !state.queue.iter().any(|q| q.id == p.id) {
                    state.queue.push(p);
                }
            }
        }
        Ok(state.queue.clone())
    }

    async fn reorder(&self, request: &ReorderRequest) -> Result<Vec<PageRef>, MergeError> {
        self.enter().await?;
        let mut state = self.state.lock().unwrap();
        let Some(from) = state.queue.iter().position(|p| p.id == request.page_id) else {
            return Err(MergeError::RemoteFailure {
                operation: "reorder".into(),
                status: Some(404),
                message: "no such page".into(),
            });
        };
        let page = state.queue.remove(from);
        let to = request.new_index.min(state.queue.len());
        state.queue.insert(to, page);
        Ok(state.queue.clone())
    }

    async fn clear_queue(&self) -> Result<(), MergeError> {
        self.enter().await?;
        self.state.lock().unwrap().queue.clear();
        Ok(())
    }

    async fn execute_merge(&self, request: &MergeRequest) -> Result<MergeResult, MergeError> {
        self.enter().await?;
        let delay = self.state.lock().unwrap().merge_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.last_merge = Some(request.clone());
        Ok(state.merge_result.clone().unwrap_or_else(|| MergeResult {
            success: true,
            output_path: Some(request.config.output_file_name.clone()),
            total_pages: request.page_ids.len(),
            warnings: vec![],
            error: None,
        }))
    }

    async fn preview(&self) -> Result<Vec<String>, MergeError> {
        self.enter().await?;
        let state = self.state.lock().unwrap();
        Ok(state.queue.iter().map(|p| format!("/preview/{}.png", p.id)).collect())
    }

    async fn document_pages(&self, document_id: &str) -> Result<Vec<PageRef>, MergeError> {
        self.enter().await?;
        Ok(self.document(document_id))
    }
}
