use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::api::paths;
use crate::fake_api::FakeApi;
use crate::history::{Confirm, RevertOutcome, VersionHistory};

struct Answer {
    yes: bool,
    asked: AtomicUsize,
}

impl Answer {
    fn new(yes: bool) -> Self {
        Self {
            yes,
            asked: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Confirm for Answer {
    async fn confirm(&self, title: &str, message: &str) -> bool {
        assert_eq!(title, "Revert Config");
        assert!(message.ends_with("h2"));
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.yes
    }
}

fn seeded_api() -> Arc<FakeApi> {
    let api = Arc::new(FakeApi::new());
    api.route(
        paths::VERSIONS,
        json!([
            {"hash": "h2", "time_stamp": "2026-01-02T00:00:00Z"},
            {"hash": "h3", "time_stamp": "2026-01-03T00:00:00Z"},
            {"hash": "h1", "time_stamp": "2026-01-01T00:00:00Z"}
        ]),
    );
    api
}

#[tokio::test]
async fn snapshots_are_newest_first_and_indexed() {
    // Arrange
    let api = seeded_api();
    let mut history = VersionHistory::new(Arc::clone(&api));

    // Act
    let count = history.fetch_snapshots().await.expect("fetch");

    // Assert
    assert_eq!(count, 3);
    let hashes: Vec<&str> = history.snapshots().iter().map(|s| s.hash.as_str()).collect();
    assert_eq!(hashes, ["h3", "h2", "h1"]);
    assert_eq!(history.snapshots_by_hash().len(), 3);
    for hash in ["h1", "h2", "h3"] {
        assert!(history.snapshot(hash).is_some());
    }
}

#[tokio::test]
async fn cancelled_revert_sends_nothing() {
    // Arrange
    let api = seeded_api();
    let mut history = VersionHistory::new(Arc::clone(&api));
    let answer = Answer::new(false);

    // Act
    let outcome = history.request_revert("h2", &answer).await.expect("revert");

    // Assert
    assert_eq!(outcome, RevertOutcome::Cancelled);
    assert_eq!(answer.asked.load(Ordering::SeqCst), 1);
    assert_eq!(api.count("POST", &paths::version("h2")), 0);
}

#[tokio::test]
async fn confirmed_revert_posts_then_refreshes() {
    // Arrange
    let api = seeded_api();
    let mut history = VersionHistory::new(Arc::clone(&api));
    let answer = Answer::new(true);

    // Act
    let outcome = history.request_revert("h2", &answer).await.expect("revert");

    // Assert
    assert_eq!(outcome, RevertOutcome::Reverted);
    let calls = api.calls();
    assert_eq!(calls[0].method, "POST");
    assert_eq!(calls[0].path, paths::version("h2"));
    assert_eq!(calls[0].body, None);
    assert_eq!(calls[1].path, paths::VERSIONS);
    assert_eq!(history.snapshots().len(), 3);
}

#[tokio::test]
async fn rejected_revert_keeps_list() {
    // Arrange
    let api = seeded_api();
    let mut history = VersionHistory::new(Arc::clone(&api));
    history.fetch_snapshots().await.expect("fetch");
    api.fail(&paths::version("h1"));

    // Act
    let result = history.set_current("h1").await;

    // Assert
    assert!(result.is_err());
    assert_eq!(api.count("GET", paths::VERSIONS), 1);
    assert_eq!(history.snapshots()[0].hash, "h3");
}

#[tokio::test]
async fn failed_fetch_keeps_previous_snapshots() {
    let api = seeded_api();
    let mut history = VersionHistory::new(Arc::clone(&api));
    history.fetch_snapshots().await.expect("fetch");
    api.fail(paths::VERSIONS);

    assert!(history.fetch_snapshots().await.is_err());
    assert_eq!(history.snapshots().len(), 3);

    api.heal(paths::VERSIONS);
    assert_eq!(history.fetch_snapshots().await.expect("fetch"), 3);
}

#[tokio::test]
async fn snapshot_dates_use_the_short_mask() {
    let api = seeded_api();
    let mut history = VersionHistory::new(api);
    history.fetch_snapshots().await.expect("fetch");

    let newest = &history.snapshots()[0];

    assert_eq!(newest.display_date_in(&Utc), "12:0:0 January-03- 2026");
}
