//! The merge queue: an ordered, id-deduplicated list of selected pages.
//!
//! Order is significant: it is the page order of the merged output. Every
//! mutation returns a [`QueueChange`] describing exactly what happened, and
//! [`MergeQueue::revert`] undoes a change. That pairing is what lets the
//! sync gateway apply a mutation locally, send it to the server, and roll it
//! back cleanly when the server refuses.
//!
//! The queue itself is plain owned state with no I/O; it never talks to the
//! server and never logs above `debug`.

use crate::error::MergeError;
use crate::page::PageRef;
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered, id-deduplicated collection of [`PageRef`]s.
#[derive(Debug, Clone, Default)]
pub struct MergeQueue {
    entries: Vec<PageRef>,
    version: u64,
}

/// A description of one effective mutation, sufficient to undo it.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueChange {
    /// `id` was appended at `index`.
    Added { id: String, index: usize },
    /// `page` was removed from `index`.
    Removed { page: PageRef, index: usize },
    /// `id` moved from `from` to `to`. `from == to` is a no-op.
    Moved { id: String, from: usize, to: usize },
    /// `ids` were appended, in this order.
    Extended { ids: Vec<String> },
    /// A toggle-all either appended `added` or removed `removed`
    /// (each paired with its index before removal, ascending).
    Toggled {
        document_id: String,
        added: Vec<String>,
        removed: Vec<(usize, PageRef)>,
    },
    /// The queue was emptied; `previous` is what it held.
    Cleared { previous: Vec<PageRef> },
    /// The queue was replaced wholesale; `previous` is what it held.
    Replaced { previous: Vec<PageRef> },
}

impl QueueChange {
    /// `true` when applying the change left the sequence untouched.
    pub fn is_noop(&self) -> bool {
        match self {
            QueueChange::Moved { from, to, .. } => from == to,
            QueueChange::Extended { ids } => ids.is_empty(),
            QueueChange::Toggled { added, removed, .. } => added.is_empty() && removed.is_empty(),
            QueueChange::Cleared { previous } => previous.is_empty(),
            QueueChange::Added { .. } | QueueChange::Removed { .. } | QueueChange::Replaced { .. } => {
                false
            }
        }
    }
}

/// Immutable view of the queue at one version.
///
/// Cheap to clone; holding one never blocks the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub version: u64,
    pages: Arc<[PageRef]>,
}

impl QueueSnapshot {
    pub fn pages(&self) -> &[PageRef] {
        &self.pages
    }

    /// Page ids in queue order.
    pub fn ids(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.id.as_str()).collect()
    }
}

impl Deref for QueueSnapshot {
    type Target = [PageRef];

    fn deref(&self) -> &Self::Target {
        &self.pages
    }
}

impl MergeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Incremented by every mutation that changes the sequence.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entries(&self) -> &[PageRef] {
        &self.entries
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&PageRef> {
        self.entries.iter().find(|p| p.id == id)
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            version: self.version,
            pages: Arc::from(self.entries.as_slice()),
        }
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Append `page` at the end.
    ///
    /// # Errors
    /// [`MergeError::Conflict`] if `page.id` is already queued; the queue is
    /// left untouched.
    pub fn add_page(&mut self, page: PageRef) -> Result<QueueChange, MergeError> {
        if self.contains(&page.id) {
            return Err(MergeError::Conflict { id: page.id });
        }
        let id = page.id.clone();
        let index = self.entries.len();
        self.entries.push(page);
        self.bump();
        debug!("Queued page {} at {}", id, index);
        Ok(QueueChange::Added { id, index })
    }

    /// Remove the entry with `id`, keeping the relative order of the rest.
    ///
    /// # Errors
    /// [`MergeError::NotFound`] if no entry has that id.
    pub fn remove_page(&mut self, id: &str) -> Result<QueueChange, MergeError> {
        let index = self.position(id).ok_or_else(|| MergeError::NotFound { id: id.to_string() })?;
        let page = self.entries.remove(index);
        self.bump();
        debug!("Removed page {} from {}", id, index);
        Ok(QueueChange::Removed { page, index })
    }

    /// Append a batch in ascending `page_index` order, skipping ids that are
    /// already queued or repeated within the batch.
    pub fn extend(&mut self, mut pages: Vec<PageRef>) -> QueueChange {
        pages.sort_by_key(|p| p.page_index);
        let mut seen: HashSet<String> = self.entries.iter().map(|p| p.id.clone()).collect();
        let mut ids = Vec::new();
        for page in pages {
            if seen.insert(page.id.clone()) {
                ids.push(page.id.clone());
                self.entries.push(page);
            }
        }
        if !ids.is_empty() {
            self.bump();
            debug!("Appended {} pages", ids.len());
        }
        QueueChange::Extended { ids }
    }

    /// Select or deselect every page of `document_id`.
    ///
    /// `document_pages` lists the document's pages; entries for other
    /// documents are ignored. If all of them are queued, every entry of the
    /// document is removed. Otherwise the missing ones are appended in
    /// ascending page order.
    pub fn toggle_all(&mut self, document_id: &str, document_pages: &[PageRef]) -> QueueChange {
        let doc_pages: Vec<&PageRef> = document_pages
            .iter()
            .filter(|p| p.document_id == document_id)
            .collect();

        let all_selected = !doc_pages.is_empty() && doc_pages.iter().all(|p| self.contains(&p.id));

        if all_selected {
            let mut removed = Vec::new();
            let mut kept = Vec::with_capacity(self.entries.len());
            for (index, page) in std::mem::take(&mut self.entries).into_iter().enumerate() {
                if page.document_id == document_id {
                    removed.push((index, page));
                } else {
                    kept.push(page);
                }
            }
            self.entries = kept;
            self.bump();
            debug!("Deselected {} pages of {}", removed.len(), document_id);
            QueueChange::Toggled {
                document_id: document_id.to_string(),
                added: Vec::new(),
                removed,
            }
        } else {
            let missing: Vec<PageRef> = doc_pages.into_iter().cloned().collect();
            let added = match self.extend(missing) {
                QueueChange::Extended { ids } => ids,
                _ => Vec::new(),
            };
            debug!("Selected {} pages of {}", added.len(), document_id);
            QueueChange::Toggled {
                document_id: document_id.to_string(),
                added,
                removed: Vec::new(),
            }
        }
    }

    /// Move the entry `id` to `new_index`, clamped to `[0, len - 1]`.
    ///
    /// # Errors
    /// [`MergeError::NotFound`] if no entry has that id.
    pub fn reorder(&mut self, id: &str, new_index: usize) -> Result<QueueChange, MergeError> {
        let from = self.position(id).ok_or_else(|| MergeError::NotFound { id: id.to_string() })?;
        let to = new_index.min(self.entries.len() - 1);
        if from != to {
            let page = self.entries.remove(from);
            self.entries.insert(to, page);
            self.bump();
            debug!("Moved page {} from {} to {}", id, from, to);
        }
        Ok(QueueChange::Moved {
            id: id.to_string(),
            from,
            to,
        })
    }

    pub fn clear(&mut self) -> QueueChange {
        let previous = std::mem::take(&mut self.entries);
        if !previous.is_empty() {
            self.bump();
        }
        QueueChange::Cleared { previous }
    }

    /// Replace the whole sequence with `pages`.
    ///
    /// Used when the server's copy wins. Duplicate ids keep their first
    /// occurrence so the id invariant holds whatever the server sends.
    pub fn replace(&mut self, pages: Vec<PageRef>) -> QueueChange {
        let mut seen = HashSet::with_capacity(pages.len());
        let mut deduped = Vec::with_capacity(pages.len());
        for page in pages {
            if seen.insert(page.id.clone()) {
                deduped.push(page);
            } else {
                warn!("Dropping duplicate page id {} from server queue", page.id);
            }
        }
        let previous = std::mem::replace(&mut self.entries, deduped);
        self.bump();
        QueueChange::Replaced { previous }
    }

    /// Swap the entry `id` for `page` in place, keeping its position.
    ///
    /// Used when the server answers an add with its own copy of the page
    /// (which may carry a different id). Returns `false` if `id` is absent
    /// or `page.id` would collide with another entry.
    pub fn replace_entry(&mut self, id: &str, page: PageRef) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        if page.id != id && self.contains(&page.id) {
            return false;
        }
        if self.entries[index] != page {
            self.entries[index] = page;
            self.bump();
        }
        true
    }

    /// Undo `change`, which must be the most recent change applied.
    pub fn revert(&mut self, change: QueueChange) {
        match change {
            QueueChange::Added { id, .. } => {
                self.entries.retain(|p| p.id != id);
            }
            QueueChange::Removed { page, index } => {
                let index = index.min(self.entries.len());
                self.entries.insert(index, page);
            }
            QueueChange::Moved { id, from, to } => {
                if from == to {
                    return;
                }
                if let Some(current) = self.position(&id) {
                    let page = self.entries.remove(current);
                    let from = from.min(self.entries.len());
                    self.entries.insert(from, page);
                }
            }
            QueueChange::Extended { ids } => {
                if ids.is_empty() {
                    return;
                }
                let ids: HashSet<String> = ids.into_iter().collect();
                self.entries.retain(|p| !ids.contains(&p.id));
            }
            QueueChange::Toggled { added, removed, .. } => {
                let added: HashSet<String> = added.into_iter().collect();
                self.entries.retain(|p| !added.contains(&p.id));
                for (index, page) in removed {
                    let index = index.min(self.entries.len());
                    self.entries.insert(index, page);
                }
            }
            QueueChange::Cleared { previous } | QueueChange::Replaced { previous } => {
                self.entries = previous;
            }
        }
        self.bump();
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}
