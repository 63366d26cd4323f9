//! Error types for the docmerge-client library.
//!
//! A single error type, [`MergeError`], covers every failure the merge queue
//! can report. None of them is fatal to a session: each one resolves to a
//! reported state plus a queue that is either unchanged or rolled back.
//!
//! The variants fall into three groups:
//!
//! * **Local rejections**: [`MergeError::Conflict`], [`MergeError::NotFound`],
//!   [`MergeError::Busy`], [`MergeError::InvalidRange`],
//!   [`MergeError::EmptyQueue`], [`MergeError::InvalidConfig`]. Detected
//!   before any network call; the queue is never touched.
//! * **Remote failures**: [`MergeError::RemoteFailure`],
//!   [`MergeError::Timeout`], [`MergeError::InvalidResponse`]. A tentatively
//!   applied local mutation is reverted before the error is returned.
//!   [`MergeError::is_remote`] identifies this group.
//! * **Everything else**: [`MergeError::Cancelled`], [`MergeError::Internal`].

use thiserror::Error;

/// All errors returned by the docmerge-client library.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MergeError {
    // ── Local rejections ──────────────────────────────────────────────────
    /// A page with this id is already in the queue.
    #[error("Page '{id}' is already in the merge queue")]
    Conflict { id: String },

    /// No queue entry has this id.
    #[error("Page '{id}' is not in the merge queue")]
    NotFound { id: String },

    /// Another mutation or merge job is still waiting for the server.
    #[error("The merge queue is busy with another operation.\nWait for it to finish and try again.")]
    Busy,

    /// Range selection with `start > end`.
    #[error("Invalid page range {start}..={end} for document '{document_id}'")]
    InvalidRange {
        document_id: String,
        start: usize,
        end: usize,
    },

    /// Execute was attempted with nothing to merge.
    #[error("The merge queue is empty; select at least one page before merging")]
    EmptyQueue,

    /// Client or merge configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Remote failures ───────────────────────────────────────────────────
    /// The server rejected the request or reported an application error.
    ///
    /// `message` is the server's own text, unmodified.
    #[error("{operation} failed: {message}")]
    RemoteFailure {
        operation: String,
        status: Option<u16>,
        message: String,
    },

    /// No response within the configured deadline.
    #[error("{operation} timed out after {secs}s\nThe server may still apply the request; pull the queue before retrying.")]
    Timeout { operation: String, secs: u64 },

    /// The server answered 2xx but the body could not be decoded.
    #[error("{operation} returned an unexpected response: {detail}")]
    InvalidResponse { operation: String, detail: String },

    // ── Other ─────────────────────────────────────────────────────────────
    /// The caller stopped waiting for a merge job.
    ///
    /// The server may still complete the job; cancellation is best-effort.
    #[error("Merge cancelled before the server responded; the job may still complete server-side")]
    Cancelled,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MergeError {
    /// `true` for failures that came from (or on the way to) the server.
    ///
    /// These are the errors that trigger a rollback of a tentatively applied
    /// local mutation.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            MergeError::RemoteFailure { .. }
                | MergeError::Timeout { .. }
                | MergeError::InvalidResponse { .. }
        )
    }

    /// `true` when retrying the same request is reasonable.
    pub fn is_retryable(&self) -> bool {
        match self {
            MergeError::Timeout { .. } | MergeError::Busy => true,
            MergeError::RemoteFailure { status, .. } => {
                matches!(status, None | Some(500..=599) | Some(429))
            }
            _ => false,
        }
    }
}
