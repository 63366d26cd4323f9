//! # docmerge-client
//!
//! Client-side merge queue for a document-processing service.
//!
//! ## Why this crate?
//!
//! The service merges pages picked from many source documents into one PDF.
//! The pick list (the *merge queue*) lives on the server, but the user edits
//! it interactively: add a page, select a range, toggle a whole document,
//! drag a page to a new position. This crate keeps a local copy of that
//! queue that always agrees with the server, rolls back any edit the server
//! refuses, and turns the final queue into a merge job.
//!
//! ## Overview
//!
//! ```text
//! UI action
//!  │
//!  ├─ 1. MergeQueue        apply the edit locally (ordered, id-deduplicated)
//!  ├─ 2. QueueSyncGateway  send it to the server; revert on failure
//!  │                       (one edit at a time; others get `Busy`)
//!  ├─ 3. pull()            server copy replaces local state when in doubt
//!  └─ 4. MergeExecutor     queue snapshot + MergeConfig → merge artifact
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docmerge_client::{ClientConfig, MergeSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://localhost:8000")
//!         .build()?;
//!     let session = MergeSession::connect(&config)?;
//!
//!     let queue = session.gateway().pull().await?;
//!     eprintln!("{} pages queued", queue.len());
//!
//!     let artifact = session.execute().await?;
//!     println!("{}", artifact.download_name);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docmerge` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod merge_config;
pub mod observer;
pub mod page;
pub mod queue;
pub mod session;
pub mod sync;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::http::HttpBackend;
pub use backend::{MergeBackend, MergeRequest, MergeResult, RangeRequest, ReorderRequest};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::MergeError;
pub use executor::{MergeArtifact, MergeExecutor, MergePreview};
pub use merge_config::{DocumentInfo, MergeConfig, MergeConfigUpdate, Orientation, PageSize};
pub use observer::{NoopObserver, ObserverHandle, QueueObserver};
pub use page::{PageRef, Rotation};
pub use queue::{MergeQueue, QueueChange, QueueSnapshot};
pub use session::MergeSession;
pub use sync::QueueSyncGateway;
