//! Merge jobs end to end against an in-memory server.

mod common;

use common::{page, FakeBackend};
use docmerge_client::{
    ClientConfig, DocumentInfo, MergeArtifact, MergeConfig, MergeConfigUpdate, MergeError,
    MergeExecutor, MergeResult, MergeSession, Orientation, PageSize, QueueObserver,
};
use futures::future::AbortHandle;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn session(backend: &Arc<FakeBackend>) -> MergeSession<FakeBackend> {
    MergeSession::new(Arc::clone(backend), &ClientConfig::default())
}

async fn queued(backend: &Arc<FakeBackend>, ids: &[&str]) -> MergeSession<FakeBackend> {
    let s = session(backend);
    for (i, id) in ids.iter().enumerate() {
        s.gateway().push_add(page(id, "d1", i)).await.unwrap();
    }
    s
}

#[tokio::test]
async fn empty_queue_is_rejected_without_a_request() {
    let backend = FakeBackend::new();
    let s = session(&backend);

    let err = s.execute().await.unwrap_err();

    assert_eq!(err, MergeError::EmptyQueue);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn invalid_file_name_is_rejected_without_a_request() {
    let backend = FakeBackend::new();
    let s = queued(&backend, &["p1"]).await;
    let calls = backend.calls();

    s.update_config(MergeConfigUpdate::new().output_file_name("../etc/passwd"));
    let err = s.execute().await.unwrap_err();

    assert!(matches!(err, MergeError::InvalidConfig(_)));
    assert_eq!(backend.calls(), calls);
}

#[tokio::test]
async fn execute_submits_queue_order_and_config() {
    let backend = FakeBackend::new();
    let s = queued(&backend, &["p1", "p2", "p3"]).await;
    s.gateway().push_reorder("p3", 0).await.unwrap();
    s.update_config(
        MergeConfigUpdate::new()
            .page_size(PageSize::A4)
            .orientation(Orientation::Landscape)
            .output_file_name("report.pdf"),
    );

    let artifact = s.execute().await.unwrap();

    assert_eq!(
        artifact,
        MergeArtifact {
            download_name: "report.pdf".into(),
            total_pages: 3,
            warnings: vec![],
        }
    );
    let sent = backend.last_merge().unwrap();
    assert_eq!(sent.page_ids, vec!["p3", "p1", "p2"]);
    assert_eq!(sent.config.page_size, PageSize::A4);
    assert_eq!(sent.config.orientation, Orientation::Landscape);
    assert!(!s.gateway().is_busy());
}

#[tokio::test]
async fn server_failure_message_is_passed_through_verbatim() {
    let backend = FakeBackend::new();
    let s = queued(&backend, &["p1"]).await;
    backend.set_merge_result(MergeResult {
        success: false,
        output_path: None,
        total_pages: 0,
        warnings: vec![],
        error: Some("Not implemented yet".into()),
    });

    let err = s.execute().await.unwrap_err();

    match err {
        MergeError::RemoteFailure { message, .. } => assert_eq!(message, "Not implemented yet"),
        other => panic!("expected RemoteFailure, got {other:?}"),
    }
    // The queue is untouched by a failed merge.
    assert_eq!(s.gateway().snapshot().ids(), vec!["p1"]);
}

#[tokio::test]
async fn slow_merge_times_out() {
    let backend = FakeBackend::new();
    backend.set_merge_delay(Duration::from_millis(500));
    let executor = MergeExecutor::new(Arc::clone(&backend), Duration::from_millis(20));

    let err = executor
        .execute(&[page("p1", "d1", 0)], &MergeConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, MergeError::Timeout { .. }));
    assert!(err.is_retryable());
    assert!(backend.last_merge().is_none());
}

#[tokio::test]
async fn aborted_merge_is_cancelled_and_releases_the_lock() {
    let backend = FakeBackend::new();
    let s = queued(&backend, &["p1"]).await;
    let (handle, registration) = AbortHandle::new_pair();
    handle.abort();

    let err = s.execute_cancellable(registration).await.unwrap_err();

    assert_eq!(err, MergeError::Cancelled);
    assert!(!s.gateway().is_busy());
    s.gateway().push_add(page("p2", "d1", 1)).await.unwrap();
}

#[tokio::test]
async fn merge_and_mutation_exclude_each_other() {
    let backend = FakeBackend::new();
    let s = queued(&backend, &["p1"]).await;

    let gate = backend.hold_next();
    let (add, merge) = tokio::join!(s.gateway().push_add(page("p2", "d1", 1)), async {
        let merge = s.execute().await;
        gate.notify_one();
        merge
    });
    add.unwrap();
    assert_eq!(merge.unwrap_err(), MergeError::Busy);

    let gate = backend.hold_next();
    let (merge, add) = tokio::join!(s.execute(), async {
        let add = s.gateway().push_add(page("p3", "d1", 2)).await;
        gate.notify_one();
        add
    });
    assert_eq!(merge.unwrap().total_pages, 2);
    assert_eq!(add.unwrap_err(), MergeError::Busy);
}

#[tokio::test]
async fn update_config_merges_partials_and_reset_restores_defaults() {
    let backend = FakeBackend::new();
    let s = queued(&backend, &["p1"]).await;

    s.update_config(MergeConfigUpdate::new().include_bookmarks(true));
    let config = s.update_config(MergeConfigUpdate::new().metadata(Some(DocumentInfo {
        title: Some("Q3".into()),
        ..DocumentInfo::default()
    })));
    assert!(config.include_bookmarks);
    assert_eq!(config.output_file_name, "merged.pdf");
    assert_eq!(config.metadata.and_then(|m| m.title).as_deref(), Some("Q3"));

    s.reset().unwrap();

    assert_eq!(s.config(), MergeConfig::default());
    assert!(s.gateway().is_empty());
    assert_eq!(backend.server_queue(), vec!["p1"], "reset leaves the server alone");
}

#[tokio::test]
async fn preview_lists_pages_in_queue_order() {
    let backend = FakeBackend::new();
    let s = queued(&backend, &["a", "b"]).await;

    let preview = s.preview().await.unwrap();

    assert_eq!(preview.total_pages(), 2);
    assert_eq!(preview.pages, vec!["/preview/a.png", "/preview/b.png"]);
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl QueueObserver for Recorder {
    fn on_merge_started(&self, page_count: usize) {
        self.events.lock().unwrap().push(format!("start {page_count}"));
    }

    fn on_merge_finished(&self, outcome: Result<&MergeArtifact, &MergeError>) {
        let line = match outcome {
            Ok(a) => format!("done {}", a.download_name),
            Err(e) => format!("failed {e}"),
        };
        self.events.lock().unwrap().push(line);
    }
}

#[tokio::test]
async fn observer_brackets_merge_jobs() {
    let backend = FakeBackend::new();
    let recorder = Arc::new(Recorder::default());
    let s = session(&backend).with_observer(recorder.clone());

    s.execute().await.unwrap_err();
    s.gateway().push_add(page("p1", "d1", 0)).await.unwrap();
    s.execute().await.unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "start 0".to_string(),
            format!("failed {}", MergeError::EmptyQueue),
            "start 1".to_string(),
            "done merged.pdf".to_string(),
        ]
    );
}
