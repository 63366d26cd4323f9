//! Change-notification trait for queue and merge events.
//!
//! Inject an [`Arc<dyn QueueObserver>`] via
//! [`crate::session::MergeSession::with_observer`] (or
//! [`crate::sync::QueueSyncGateway::with_observer`]) to hear about every
//! change that reaches the local queue, every rollback, and the start and end
//! of merge jobs.
//!
//! Observers are called after the queue lock is released, so an
//! implementation may read the session (for example take a fresh snapshot)
//! from inside a callback. It must not start another mutation from there;
//! that attempt fails with [`MergeError::Busy`].
//!
//! # Example
//!
//! ```rust
//! use docmerge_client::{QueueObserver, QueueChange, QueueSnapshot};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! struct Redraw {
//!     rendered_version: AtomicU64,
//! }
//!
//! impl QueueObserver for Redraw {
//!     fn on_queue_changed(&self, _change: &QueueChange, snapshot: &QueueSnapshot) {
//!         self.rendered_version.store(snapshot.version, Ordering::SeqCst);
//!     }
//! }
//! ```

use crate::error::MergeError;
use crate::executor::MergeArtifact;
use crate::queue::{QueueChange, QueueSnapshot};
use std::sync::Arc;

/// Receives queue and merge events. All methods default to no-ops.
///
/// Implementations must be `Send + Sync`: the session can be shared across
/// tasks and callbacks run on whichever task settled the operation.
pub trait QueueObserver: Send + Sync {
    /// A change was applied and is now in the local queue.
    ///
    /// Fired once per settled unit, after the server accepted it (or, for
    /// `pull`, after the server copy replaced the local one).
    fn on_queue_changed(&self, change: &QueueChange, snapshot: &QueueSnapshot) {
        let _ = (change, snapshot);
    }

    /// A tentatively applied change was undone because the server refused it.
    fn on_rolled_back(&self, change: &QueueChange, error: &MergeError) {
        let _ = (change, error);
    }

    /// A merge was requested for `page_count` pages (before validation).
    fn on_merge_started(&self, page_count: usize) {
        let _ = page_count;
    }

    /// A merge job reached a terminal state.
    fn on_merge_finished(&self, outcome: Result<&MergeArtifact, &MergeError>) {
        let _ = outcome;
    }
}

/// Observer that ignores every event. Used when none is configured.
pub struct NoopObserver;

impl QueueObserver for NoopObserver {}

/// Shared observer handle as stored by the gateway and session.
pub type ObserverHandle = Arc<dyn QueueObserver>;
