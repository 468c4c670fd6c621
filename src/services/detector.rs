//! Per-pair change detection.
//!
//! One check walks a (user, URL) pair from its stored snapshot to the page's
//! current text: fetch, extract, compare, notify, persist. A pair with no
//! stored snapshot is only recorded; notifications start from the second
//! successful check.

use std::sync::Arc;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::diff::{DiffResult, LineDiff, MyersDiff, truncate};
use crate::error::{AppError, Result};
use crate::extract::extract_text;
use crate::models::{Config, Messages, Snapshot, SnapshotKey};
use crate::notify::MessageSender;
use crate::storage::SnapshotStore;
use crate::utils::http::create_async_client;

/// What a single check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No previous snapshot; the page text was stored without notifying
    FirstSnapshot,
    /// Text identical to the stored snapshot
    Unchanged,
    /// Text differed and the user was notified
    Changed { changed_lines: usize },
    /// The server answered with a non-success status; nothing was touched
    Skipped { status: u16 },
}

/// Checks watched pages against their stored snapshots.
pub struct ChangeDetector {
    client: Client,
    store: Arc<dyn SnapshotStore>,
    sender: Arc<dyn MessageSender>,
    differ: Arc<dyn LineDiff>,
    messages: Messages,
    max_chars: usize,
}

impl ChangeDetector {
    /// Create a detector using an existing HTTP client.
    pub fn new(
        client: Client,
        store: Arc<dyn SnapshotStore>,
        sender: Arc<dyn MessageSender>,
        config: &Config,
    ) -> Self {
        Self {
            client,
            store,
            sender,
            differ: Arc::new(MyersDiff::new()),
            messages: config.messages.clone(),
            max_chars: config.diff.max_chars,
        }
    }

    /// Create a detector with a client built from `[detector]` settings.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn SnapshotStore>,
        sender: Arc<dyn MessageSender>,
    ) -> Result<Self> {
        let client = create_async_client(&config.detector)?;
        Ok(Self::new(client, store, sender, config))
    }

    /// Replace the line differ.
    pub fn with_differ(mut self, differ: Arc<dyn LineDiff>) -> Self {
        self.differ = differ;
        self
    }

    /// Run one check for a (user, URL) pair.
    ///
    /// A non-success HTTP status is not an error: the stored snapshot is left
    /// as it was and [`CheckOutcome::Skipped`] is returned. Transport and
    /// store failures are returned as errors. Once the page was fetched the
    /// snapshot is always rewritten, even when delivering the notification
    /// failed; that failure is reported afterwards.
    pub async fn check_one(&self, user_id: &str, url: &str) -> Result<CheckOutcome> {
        let key = SnapshotKey::new(user_id, url);
        let previous = self.store.get(&key).await?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("{} returned {} for {}, keeping last snapshot", url, status, user_id);
            return Ok(CheckOutcome::Skipped {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?;
        let text = extract_text(&body, &content_type);

        let (outcome, notice) = match previous {
            None => {
                log::info!("First snapshot for {} ({} bytes)", key, text.len());
                (CheckOutcome::FirstSnapshot, None)
            }
            Some(previous) if previous.text == text => {
                log::debug!("No change for {}", key);
                (CheckOutcome::Unchanged, None)
            }
            Some(previous) => {
                let diff = DiffResult::compute(self.differ.as_ref(), &previous.text, &text);
                let changed_lines = diff.change_count();
                log::info!("{} changed ({} lines)", key, changed_lines);
                let notice = vec![self.messages.page_changed(url), self.render(&diff)];
                (CheckOutcome::Changed { changed_lines }, Some(notice))
            }
        };

        let sent = match &notice {
            Some(parts) => self.sender.send(user_id, parts).await,
            None => Ok(()),
        };

        self.store.put(&key, &Snapshot::new(url, text)).await?;

        sent.map_err(|e| AppError::check(key.as_str(), format!("notification failed: {e}")))?;
        Ok(outcome)
    }

    /// Render a diff for delivery, cut to the configured length.
    fn render(&self, diff: &DiffResult<'_>) -> String {
        truncate(
            &diff.render(),
            self.max_chars,
            &self.messages.truncated_suffix,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::storage::MemoryStorage;

    /// Records every notification it is asked to deliver.
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl RecordingSender {
        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send(&self, user_id: &str, messages: &[String]) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((user_id.to_string(), messages.to_vec()));
            Ok(())
        }
    }

    struct FailingSender;

    #[async_trait]
    impl MessageSender for FailingSender {
        async fn send(&self, _user_id: &str, _messages: &[String]) -> Result<()> {
            Err(AppError::notify("channel down"))
        }
    }

    async fn serve(server: &MockServer, route: &str, status: u16, html: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(status).set_body_raw(html, "text/html; charset=utf-8"),
            )
            .mount(server)
            .await;
    }

    fn detector(
        store: Arc<MemoryStorage>,
        sender: Arc<dyn MessageSender>,
        config: &Config,
    ) -> ChangeDetector {
        ChangeDetector::new(Client::new(), store, sender, config)
    }

    #[tokio::test]
    async fn test_first_check_stores_without_notifying() {
        let server = MockServer::start().await;
        serve(&server, "/page", 200, "<p>Hello</p><p>World</p>").await;
        let url = format!("{}/page", server.uri());

        let store = Arc::new(MemoryStorage::new());
        let sender = Arc::new(RecordingSender::default());
        let detector = detector(store.clone(), sender.clone(), &Config::default());

        let outcome = detector.check_one("alice", &url).await.unwrap();
        assert_eq!(outcome, CheckOutcome::FirstSnapshot);
        assert_eq!(sender.count(), 0);

        let stored = store.get(&SnapshotKey::new("alice", &url)).await.unwrap();
        assert_eq!(stored, Some(Snapshot::new(&url, "Hello\nWorld\n")));
    }

    #[tokio::test]
    async fn test_changed_page_notifies_with_diff() {
        let server = MockServer::start().await;
        serve(&server, "/page", 200, "<p>a</p><p>c</p>").await;
        let url = format!("{}/page", server.uri());

        let store = Arc::new(MemoryStorage::new());
        let key = SnapshotKey::new("alice", &url);
        store.put(&key, &Snapshot::new(&url, "a\nb\n")).await.unwrap();

        let sender = Arc::new(RecordingSender::default());
        let detector = detector(store.clone(), sender.clone(), &Config::default());

        let outcome = detector.check_one("alice", &url).await.unwrap();
        assert_eq!(outcome, CheckOutcome::Changed { changed_lines: 2 });

        let sent = sender.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice");
        assert_eq!(
            sent[0].1,
            vec![format!("{url} has been updated"), "-b\n+c\n".to_string()]
        );
        assert_eq!(store.get(&key).await.unwrap().unwrap().text, "a\nc\n");
    }

    #[tokio::test]
    async fn test_unchanged_page_is_rewritten_silently() {
        let server = MockServer::start().await;
        serve(&server, "/page", 200, "<p>same</p>").await;
        let url = format!("{}/page", server.uri());

        let store = Arc::new(MemoryStorage::new());
        let key = SnapshotKey::new("alice", &url);
        store.put(&key, &Snapshot::new("stale", "same\n")).await.unwrap();

        let sender = Arc::new(RecordingSender::default());
        let detector = detector(store.clone(), sender.clone(), &Config::default());

        let outcome = detector.check_one("alice", &url).await.unwrap();
        assert_eq!(outcome, CheckOutcome::Unchanged);
        assert_eq!(sender.count(), 0);
        // The write happened: the record now carries the fetched URL.
        assert_eq!(
            store.get(&key).await.unwrap(),
            Some(Snapshot::new(&url, "same\n"))
        );
    }

    #[tokio::test]
    async fn test_error_status_keeps_old_snapshot() {
        let server = MockServer::start().await;
        serve(&server, "/page", 503, "<p>maintenance</p>").await;
        let url = format!("{}/page", server.uri());

        let store = Arc::new(MemoryStorage::new());
        let key = SnapshotKey::new("alice", &url);
        let old = Snapshot::new(&url, "old\n");
        store.put(&key, &old).await.unwrap();

        let sender = Arc::new(RecordingSender::default());
        let detector = detector(store.clone(), sender.clone(), &Config::default());

        let outcome = detector.check_one("alice", &url).await.unwrap();
        assert_eq!(outcome, CheckOutcome::Skipped { status: 503 });
        assert_eq!(sender.count(), 0);
        assert_eq!(store.get(&key).await.unwrap(), Some(old));
    }

    #[tokio::test]
    async fn test_transport_failure_is_error() {
        let store = Arc::new(MemoryStorage::new());
        let sender = Arc::new(RecordingSender::default());
        let detector = detector(store.clone(), sender.clone(), &Config::default());

        let result = detector.check_one("alice", "http://127.0.0.1:1/").await;
        assert!(matches!(result, Err(AppError::Http(_))));
        assert_eq!(store.snapshot_count(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_still_persists() {
        let server = MockServer::start().await;
        serve(&server, "/page", 200, "<p>new</p>").await;
        let url = format!("{}/page", server.uri());

        let store = Arc::new(MemoryStorage::new());
        let key = SnapshotKey::new("alice", &url);
        store.put(&key, &Snapshot::new(&url, "old\n")).await.unwrap();

        let detector = detector(store.clone(), Arc::new(FailingSender), &Config::default());

        let result = detector.check_one("alice", &url).await;
        assert!(matches!(result, Err(AppError::Check { .. })));
        assert_eq!(store.get(&key).await.unwrap().unwrap().text, "new\n");
    }

    #[tokio::test]
    async fn test_long_diff_is_truncated() {
        let server = MockServer::start().await;
        let body: String = (0..10).map(|i| format!("<p>行{i}はここにあります</p>")).collect();
        serve(&server, "/page", 200, &body).await;
        let url = format!("{}/page", server.uri());

        let store = Arc::new(MemoryStorage::new());
        store
            .put(&SnapshotKey::new("alice", &url), &Snapshot::new(&url, "old\n"))
            .await
            .unwrap();

        let mut config = Config::default();
        config.diff.max_chars = 20;
        let sender = Arc::new(RecordingSender::default());
        let detector = detector(store, sender.clone(), &config);

        detector.check_one("alice", &url).await.unwrap();

        let sent = sender.sent.lock().unwrap().clone();
        let diff = &sent[0].1[1];
        assert!(diff.ends_with("\n...(truncated)"));
        assert_eq!(
            diff.chars().count(),
            20 + "\n...(truncated)".chars().count()
        );
    }
}
