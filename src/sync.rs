//! Keeping the local queue in step with the server's queue.
//!
//! ## One unit at a time
//!
//! Every mutating method is one logical unit: apply the change locally, send
//! it to the server, then either keep it (adopting whatever the server says
//! the queue now looks like) or revert it. While a unit is outstanding the
//! gateway is locked for mutation, and a second mutating call fails at once
//! with [`MergeError::Busy`]. Nothing is queued, so the server always sees
//! one session's operations in the order the user made them.
//!
//! Reads ([`QueueSyncGateway::snapshot`] and friends) never wait for the lock.
//!
//! ## The server wins
//!
//! [`QueueSyncGateway::pull`] replaces the local queue with the server's copy,
//! without merging. Call it on regaining focus, after any failure, and
//! whenever [`QueueSyncGateway::is_stale`] reports `true` (a unit whose
//! future was dropped before the server answered).

use crate::backend::{MergeBackend, RangeRequest, ReorderRequest};
use crate::error::MergeError;
use crate::observer::{NoopObserver, ObserverHandle};
use crate::page::PageRef;
use crate::queue::{MergeQueue, QueueChange, QueueSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Bridge between the local [`MergeQueue`] and the server-held queue.
pub struct QueueSyncGateway<B> {
    backend: Arc<B>,
    queue: Mutex<MergeQueue>,
    busy: AtomicBool,
    stale: AtomicBool,
    observer: ObserverHandle,
}

impl<B: MergeBackend> QueueSyncGateway<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            queue: Mutex::new(MergeQueue::new()),
            busy: AtomicBool::new(false),
            stale: AtomicBool::new(false),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: ObserverHandle) -> Self {
        self.observer = observer;
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> QueueSnapshot {
        self.queue().snapshot()
    }

    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    /// A mutation or merge is waiting for the server.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// A unit was abandoned mid-flight; local and server state may differ
    /// until the next successful [`pull`](Self::pull).
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Selectable pages of a source document. Does not take the lock.
    pub async fn document_pages(&self, document_id: &str) -> Result<Vec<PageRef>, MergeError> {
        self.backend.document_pages(document_id).await
    }

    // ── Units ────────────────────────────────────────────────────────────

    /// Replace the local queue with the server's.
    pub async fn pull(&self) -> Result<QueueSnapshot, MergeError> {
        let mut guard = self.lock()?;
        guard.arm();
        let pages = match self.backend.list_queue().await {
            Ok(pages) => pages,
            Err(e) => {
                guard.settle();
                warn!("Pull failed: {}", e);
                return Err(e);
            }
        };
        let (change, snapshot) = {
            let mut queue = self.queue();
            let change = queue.replace(pages);
            (change, queue.snapshot())
        };
        guard.settle();
        self.stale.store(false, Ordering::Release);
        info!("Pulled server queue: {} pages", snapshot.len());
        self.observer.on_queue_changed(&change, &snapshot);
        Ok(snapshot)
    }

    /// Append `page` locally, then on the server.
    ///
    /// A local [`MergeError::Conflict`] returns before any network call. If
    /// the server answers with its own copy of the page (for example under a
    /// fresh id) that copy replaces the local entry in place.
    pub async fn push_add(&self, page: PageRef) -> Result<QueueSnapshot, MergeError> {
        let mut guard = self.lock()?;
        let change = self.queue().add_page(page.clone())?;
        guard.arm();

        match self.backend.select_page(&page).await {
            Ok(server_page) => {
                if server_page != page {
                    let adopted = self.queue().replace_entry(&page.id, server_page.clone());
                    if !adopted {
                        warn!(
                            "Server returned page {} for {}, which collides locally; pull required",
                            server_page.id, page.id
                        );
                        self.stale.store(true, Ordering::Release);
                    }
                }
                guard.settle();
                Ok(self.committed(&change))
            }
            Err(e) => {
                self.rollback(change, &e);
                guard.settle();
                Err(e)
            }
        }
    }

    /// Remove `page_id` locally, then on the server.
    pub async fn push_remove(&self, page_id: &str) -> Result<QueueSnapshot, MergeError> {
        let mut guard = self.lock()?;
        let change = self.queue().remove_page(page_id)?;
        guard.arm();

        match self.backend.deselect_page(page_id).await {
            Ok(()) => {
                guard.settle();
                Ok(self.committed(&change))
            }
            Err(e) => {
                self.rollback(change, &e);
                guard.settle();
                Err(e)
            }
        }
    }

    /// Move `page_id` to `new_index` (clamped), locally then on the server.
    ///
    /// Moving an entry onto its current position settles without a request.
    pub async fn push_reorder(
        &self,
        page_id: &str,
        new_index: usize,
    ) -> Result<QueueSnapshot, MergeError> {
        let mut guard = self.lock()?;
        let change = self.queue().reorder(page_id, new_index)?;
        if change.is_noop() {
            debug!("Page {} already at {}", page_id, new_index);
            return Ok(self.snapshot());
        }
        let QueueChange::Moved { to, .. } = change else {
            return Err(MergeError::Internal("reorder produced a non-move change".into()));
        };
        guard.arm();

        let request = ReorderRequest {
            page_id: page_id.to_string(),
            new_index: to,
        };
        match self.backend.reorder(&request).await {
            Ok(server_queue) => {
                self.adopt(server_queue);
                guard.settle();
                Ok(self.committed(&change))
            }
            Err(e) => {
                self.rollback(change, &e);
                guard.settle();
                Err(e)
            }
        }
    }

    /// Empty the queue locally, then on the server.
    pub async fn push_clear(&self) -> Result<QueueSnapshot, MergeError> {
        let mut guard = self.lock()?;
        let change = self.queue().clear();
        guard.arm();

        match self.backend.clear_queue().await {
            Ok(()) => {
                guard.settle();
                Ok(self.committed(&change))
            }
            Err(e) => {
                self.rollback(change, &e);
                guard.settle();
                Err(e)
            }
        }
    }

    /// Ask the server to select pages `start..=end` of a document, then
    /// append the pages it created in ascending page order.
    ///
    /// Pages are created server-side, so nothing is applied locally until the
    /// server answers and there is nothing to roll back on failure.
    pub async fn select_range(
        &self,
        document_id: &str,
        start: usize,
        end: usize,
    ) -> Result<QueueSnapshot, MergeError> {
        if start > end {
            return Err(MergeError::InvalidRange {
                document_id: document_id.to_string(),
                start,
                end,
            });
        }
        let mut guard = self.lock()?;
        guard.arm();

        let request = RangeRequest {
            document_id: document_id.to_string(),
            start,
            end,
        };
        match self.backend.select_range(&request).await {
            Ok(created) => {
                let change = self.queue().extend(created);
                guard.settle();
                Ok(self.committed(&change))
            }
            Err(e) => {
                guard.settle();
                warn!("Range selection on {} failed: {}", document_id, e);
                Err(e)
            }
        }
    }

    /// Toggle every page of `document_id`, locally then on the server.
    ///
    /// `document_pages` is the document's page list as the caller knows it
    /// (see [`document_pages`](Self::document_pages)). The server's answer
    /// replaces the local queue.
    pub async fn toggle_all(
        &self,
        document_id: &str,
        document_pages: &[PageRef],
    ) -> Result<QueueSnapshot, MergeError> {
        let mut guard = self.lock()?;
        let change = self.queue().toggle_all(document_id, document_pages);
        guard.arm();

        match self.backend.toggle_all(document_id).await {
            Ok(server_queue) => {
                self.adopt(server_queue);
                guard.settle();
                Ok(self.committed(&change))
            }
            Err(e) => {
                self.rollback(change, &e);
                guard.settle();
                Err(e)
            }
        }
    }

    /// Drop local state without touching the server (session teardown).
    pub fn reset_local(&self) -> Result<(), MergeError> {
        let _guard = self.lock()?;
        self.queue().clear();
        self.stale.store(false, Ordering::Release);
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Take the mutation lock or fail with `Busy`.
    pub(crate) fn lock(&self) -> Result<MutationGuard<'_>, MergeError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MergeError::Busy)?;
        Ok(MutationGuard {
            busy: &self.busy,
            stale: &self.stale,
            armed: false,
        })
    }

    fn queue(&self) -> MutexGuard<'_, MergeQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the local queue with the server's answer if they differ.
    fn adopt(&self, server_queue: Vec<PageRef>) {
        let mut queue = self.queue();
        if queue.entries() != server_queue.as_slice() {
            debug!("Server queue differs from local; adopting server copy");
            queue.replace(server_queue);
        }
    }

    fn committed(&self, change: &QueueChange) -> QueueSnapshot {
        let snapshot = self.snapshot();
        self.observer.on_queue_changed(change, &snapshot);
        snapshot
    }

    fn rollback(&self, change: QueueChange, error: &MergeError) {
        warn!("Server refused queue change, rolling back: {}", error);
        self.queue().revert(change.clone());
        self.observer.on_rolled_back(&change, error);
    }
}

/// Holds the mutation lock for one unit.
///
/// Armed while a request is outstanding. Dropping an armed guard (the unit's
/// future was cancelled) marks the gateway stale.
pub(crate) struct MutationGuard<'a> {
    busy: &'a AtomicBool,
    stale: &'a AtomicBool,
    armed: bool,
}

impl MutationGuard<'_> {
    fn arm(&mut self) {
        self.armed = true;
    }

    fn settle(&mut self) {
        self.armed = false;
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Queue operation abandoned before the server answered; pull required");
            self.stale.store(true, Ordering::Release);
        }
        self.busy.store(false, Ordering::Release);
    }
}
