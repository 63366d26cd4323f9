//! Turning a finished queue and config into a merge job.
//!
//! Validation happens here and only here: an empty queue or an unusable
//! config is rejected before any request is sent. After that the job is
//! all-or-nothing. Either the server reports a complete artifact, or the
//! caller gets an error and nothing else. The client never resubmits part of
//! a job.
//!
//! ## Cancellation
//!
//! [`MergeExecutor::execute_cancellable`] stops *waiting*; it cannot stop a
//! merge the server has already started. A [`MergeError::Cancelled`] result
//! therefore means "outcome unknown", and callers that care should look for
//! the artifact later rather than assume nothing was produced.

use crate::backend::{MergeBackend, MergeRequest, MergeResult};
use crate::error::MergeError;
use crate::merge_config::MergeConfig;
use crate::page::PageRef;
use futures::future::{AbortRegistration, Abortable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Reference to a completed merge result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeArtifact {
    /// Opaque download identifier issued by the server.
    pub download_name: String,
    pub total_pages: usize,
    /// Non-fatal issues the server reported (e.g. a bookmark it had to drop).
    pub warnings: Vec<String>,
}

/// What the merged document will look like, as rendered by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergePreview {
    /// Preview image references, in output page order.
    pub pages: Vec<String>,
}

impl MergePreview {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }
}

/// Submits merge jobs and fetches previews.
pub struct MergeExecutor<B> {
    backend: Arc<B>,
    deadline: Duration,
}

impl<B: MergeBackend> MergeExecutor<B> {
    /// `deadline` bounds the whole submit-and-wait, whatever the backend's
    /// own timeouts are.
    pub fn new(backend: Arc<B>, deadline: Duration) -> Self {
        Self { backend, deadline }
    }

    /// Validate inputs and build the request, without any I/O.
    pub fn prepare(pages: &[PageRef], config: &MergeConfig) -> Result<MergeRequest, MergeError> {
        if pages.is_empty() {
            return Err(MergeError::EmptyQueue);
        }
        config.validate()?;
        Ok(MergeRequest {
            config: config.clone(),
            page_ids: pages.iter().map(|p| p.id.clone()).collect(),
        })
    }

    /// Merge `pages`, in order, into one document described by `config`.
    ///
    /// # Errors
    /// - [`MergeError::EmptyQueue`] / [`MergeError::InvalidConfig`]: nothing was sent
    /// - [`MergeError::RemoteFailure`]: the server refused or failed the job;
    ///   the message is the server's own
    /// - [`MergeError::Timeout`]: no answer within the deadline
    pub async fn execute(
        &self,
        pages: &[PageRef],
        config: &MergeConfig,
    ) -> Result<MergeArtifact, MergeError> {
        let request = Self::prepare(pages, config)?;
        self.submit(request).await
    }

    /// [`execute`](Self::execute), abortable through the `AbortHandle`
    /// paired with `registration`.
    pub async fn execute_cancellable(
        &self,
        pages: &[PageRef],
        config: &MergeConfig,
        registration: AbortRegistration,
    ) -> Result<MergeArtifact, MergeError> {
        let request = Self::prepare(pages, config)?;
        match Abortable::new(self.submit(request), registration).await {
            Ok(result) => result,
            Err(_aborted) => {
                warn!("Merge cancelled by caller; the server may still finish the job");
                Err(MergeError::Cancelled)
            }
        }
    }

    pub async fn preview(&self) -> Result<MergePreview, MergeError> {
        let pages = self.backend.preview().await?;
        Ok(MergePreview { pages })
    }

    async fn submit(&self, request: MergeRequest) -> Result<MergeArtifact, MergeError> {
        let page_count = request.page_ids.len();
        info!("Executing merge: {} pages", page_count);

        let result = tokio::time::timeout(self.deadline, self.backend.execute_merge(&request))
            .await
            .map_err(|_| MergeError::Timeout {
                operation: "execute merge".to_string(),
                secs: self.deadline.as_secs(),
            })??;

        let artifact = interpret(result)?;
        if artifact.total_pages != 0 && artifact.total_pages != page_count {
            warn!(
                "Server merged {} pages, {} were submitted",
                artifact.total_pages, page_count
            );
        }
        info!(
            "Merge complete: '{}' ({} pages)",
            artifact.download_name, artifact.total_pages
        );
        Ok(artifact)
    }
}

/// Map the server's result payload to an artifact or a verbatim failure.
fn interpret(result: MergeResult) -> Result<MergeArtifact, MergeError> {
    if !result.success {
        return Err(MergeError::RemoteFailure {
            operation: "execute merge".to_string(),
            status: None,
            message: result
                .error
                .unwrap_or_else(|| "merge failed without an error message".to_string()),
        });
    }
    let download_name = result
        .output_path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| MergeError::InvalidResponse {
            operation: "execute merge".to_string(),
            detail: "success reported without an output path".to_string(),
        })?;
    Ok(MergeArtifact {
        download_name,
        total_pages: result.total_pages,
        warnings: result.warnings,
    })
}
