//! One user's merge session: queue, config and merge jobs in one object.
//!
//! Construct a [`MergeSession`] when the user starts working and drop it when
//! they are done; there is no process-wide state. Everything that needs the
//! queue or the config is handed the session (or an `Arc` of it).

use crate::backend::http::HttpBackend;
use crate::backend::MergeBackend;
use crate::config::ClientConfig;
use crate::error::MergeError;
use crate::executor::{MergeArtifact, MergeExecutor, MergePreview};
use crate::merge_config::{MergeConfig, MergeConfigUpdate};
use crate::observer::{NoopObserver, ObserverHandle};
use crate::sync::QueueSyncGateway;
use futures::future::AbortRegistration;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Queue, config and executor for a single editing session.
///
/// # Example
/// ```rust,no_run
/// use docmerge_client::{ClientConfig, MergeConfigUpdate, MergeSession};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let session = MergeSession::connect(&ClientConfig::default())?;
/// session.gateway().pull().await?;
/// session.gateway().select_range("doc-1", 0, 4).await?;
/// session.gateway().push_reorder("page-3", 0).await?;
/// session.update_config(MergeConfigUpdate::new().output_file_name("report.pdf"));
/// let artifact = session.execute().await?;
/// println!("download: {}", artifact.download_name);
/// # Ok(())
/// # }
/// ```
pub struct MergeSession<B> {
    gateway: QueueSyncGateway<B>,
    executor: MergeExecutor<B>,
    config: Mutex<MergeConfig>,
    observer: ObserverHandle,
}

impl MergeSession<HttpBackend> {
    /// Session against the HTTP service described by `config`.
    pub fn connect(config: &ClientConfig) -> Result<Self, MergeError> {
        let backend = HttpBackend::new(config)?;
        Ok(Self::new(Arc::new(backend), config))
    }
}

impl<B: MergeBackend> MergeSession<B> {
    pub fn new(backend: Arc<B>, config: &ClientConfig) -> Self {
        Self {
            gateway: QueueSyncGateway::new(Arc::clone(&backend)),
            executor: MergeExecutor::new(backend, config.execute_timeout()),
            config: Mutex::new(MergeConfig::default()),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Route queue and merge events to `observer`.
    pub fn with_observer(mut self, observer: ObserverHandle) -> Self {
        self.gateway = self.gateway.with_observer(Arc::clone(&observer));
        self.observer = observer;
        self
    }

    /// Queue operations (pull, add, remove, range, toggle, reorder, clear).
    pub fn gateway(&self) -> &QueueSyncGateway<B> {
        &self.gateway
    }

    // ── Config ───────────────────────────────────────────────────────────

    /// Current output config (a copy).
    pub fn config(&self) -> MergeConfig {
        self.config.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Merge `partial` over the current config; returns the result.
    pub fn update_config(&self, partial: MergeConfigUpdate) -> MergeConfig {
        let mut config = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        config.update(partial);
        debug!("Merge config now {:?}", *config);
        config.clone()
    }

    // ── Merge ────────────────────────────────────────────────────────────

    /// Merge the current queue with the current config.
    ///
    /// Holds the queue's mutation lock for the whole job: queue mutations
    /// attempted meanwhile fail with [`MergeError::Busy`], and `execute` itself
    /// fails with `Busy` while a queue mutation is outstanding.
    pub async fn execute(&self) -> Result<MergeArtifact, MergeError> {
        let _guard = self.gateway.lock()?;
        let snapshot = self.gateway.snapshot();
        let config = self.config();
        self.observer.on_merge_started(snapshot.len());
        let outcome = self.executor.execute(&snapshot, &config).await;
        self.observer.on_merge_finished(outcome.as_ref());
        outcome
    }

    /// [`execute`](Self::execute), abortable via the paired `AbortHandle`.
    pub async fn execute_cancellable(
        &self,
        registration: AbortRegistration,
    ) -> Result<MergeArtifact, MergeError> {
        let _guard = self.gateway.lock()?;
        let snapshot = self.gateway.snapshot();
        let config = self.config();
        self.observer.on_merge_started(snapshot.len());
        let outcome = self
            .executor
            .execute_cancellable(&snapshot, &config, registration)
            .await;
        self.observer.on_merge_finished(outcome.as_ref());
        outcome
    }

    pub async fn preview(&self) -> Result<MergePreview, MergeError> {
        self.executor.preview().await
    }

    /// Forget local queue state and restore the default config.
    ///
    /// The server's queue is left alone; a later `pull` brings it back.
    pub fn reset(&self) -> Result<(), MergeError> {
        self.gateway.reset_local()?;
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = MergeConfig::default();
        Ok(())
    }
}
