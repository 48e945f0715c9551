use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ChangeFeed, Subscription};
use crate::models::{ChangeRecord, NotificationEvent};
use crate::ws::Broadcaster;

/// Keeps a subscription open on the change feed and broadcasts one
/// notification per observed record.
///
/// Subscription failures are retried after a fixed backoff for as long as
/// the shutdown token stays uncancelled.
pub struct ChangeSourceListener<F> {
    feed: F,
    broadcaster: Broadcaster,
    retry_backoff: Duration,
}

enum Exit {
    Shutdown,
    Failed,
}

impl<F: ChangeFeed> ChangeSourceListener<F> {
    pub fn new(feed: F, broadcaster: Broadcaster, retry_backoff: Duration) -> Self {
        Self {
            feed,
            broadcaster,
            retry_backoff,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!("Change feed listener started");
        loop {
            let opened = tokio::select! {
                _ = shutdown.cancelled() => break,
                opened = self.feed.open() => opened,
            };

            match opened {
                Ok(mut subscription) => {
                    debug!("Change feed subscription opened");
                    let exit = self.pump(subscription.as_mut(), &shutdown).await;
                    subscription.close().await;
                    if let Exit::Shutdown = exit {
                        break;
                    }
                }
                Err(e) => warn!("Failed to open change feed subscription: {}", e),
            }

            debug!("Retrying change feed in {:?}", self.retry_backoff);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.retry_backoff) => {}
            }
        }
        info!("Change feed listener stopped");
    }

    async fn pump(
        &self,
        subscription: &mut dyn Subscription,
        shutdown: &CancellationToken,
    ) -> Exit {
        loop {
            let batch = tokio::select! {
                _ = shutdown.cancelled() => return Exit::Shutdown,
                batch = subscription.next_batch() => batch,
            };
            match batch {
                Ok(records) => self.dispatch(records),
                Err(e) => {
                    warn!("Change feed subscription failed: {}", e);
                    return Exit::Failed;
                }
            }
        }
    }

    fn dispatch(&self, records: Vec<ChangeRecord>) {
        for record in records {
            let document_id = record.document_id.clone();
            match NotificationEvent::try_from(record) {
                Ok(event) => {
                    self.broadcaster.broadcast(&event);
                }
                Err(e) => warn!("Skipping change for list {}: {}", document_id, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedError;
    use crate::ws::testing::{channel_connection, next_text};
    use crate::ws::ConnectionRegistry;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type Script = Arc<Mutex<VecDeque<Result<Vec<ChangeRecord>, FeedError>>>>;

    /// Feed replaying a fixed script of batches and errors, then idling
    struct ScriptedFeed {
        script: Script,
        opens: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    struct ScriptedSubscription {
        script: Script,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChangeFeed for ScriptedFeed {
        async fn open(&self) -> Result<Box<dyn Subscription>, FeedError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedSubscription {
                script: self.script.clone(),
                closes: self.closes.clone(),
            }))
        }
    }

    #[async_trait]
    impl Subscription for ScriptedSubscription {
        async fn next_batch(&mut self) -> Result<Vec<ChangeRecord>, FeedError> {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(step) => step,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn scripted(
        steps: Vec<Result<Vec<ChangeRecord>, FeedError>>,
    ) -> (ScriptedFeed, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let opens = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let feed = ScriptedFeed {
            script: Arc::new(Mutex::new(steps.into_iter().collect())),
            opens: opens.clone(),
            closes: closes.clone(),
        };
        (feed, opens, closes)
    }

    fn list_body(name: &str) -> Value {
        json!({"name": name, "created": "2026-10-18T08:00:00Z", "items": []})
    }

    type Queue = tokio::sync::mpsc::Receiver<axum::extract::ws::Message>;

    fn setup() -> (Broadcaster, Queue) {
        let registry = ConnectionRegistry::new();
        let (conn, rx) = channel_connection();
        registry.add(conn);
        (Broadcaster::new(registry), rx)
    }

    async fn next_event(rx: &mut Queue) -> Value {
        serde_json::from_str(&next_text(rx).await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn undecodable_records_are_skipped_not_fatal() {
        let (broadcaster, mut rx) = setup();
        let (feed, opens, _) = scripted(vec![Ok(vec![
            ChangeRecord::added("a", list_body("A")),
            ChangeRecord::modified("b", json!({"name": ["not", "a", "string"]})),
            ChangeRecord::removed("c"),
        ])]);

        let shutdown = CancellationToken::new();
        let listener = ChangeSourceListener::new(feed, broadcaster, Duration::from_secs(5));
        let task = tokio::spawn(listener.run(shutdown.clone()));

        let first = next_event(&mut rx).await;
        assert_eq!(first["type"], "LIST");
        assert_eq!(first["listId"], "a");
        assert_eq!(first["list"]["id"], "a");
        let second = next_event(&mut rx).await;
        assert_eq!(second, json!({"type": "LIST_DELETE", "listId": "c"}));

        shutdown.cancel();
        task.await.unwrap();
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribes_after_backoff_when_the_feed_fails() {
        let (broadcaster, mut rx) = setup();
        let (feed, opens, closes) = scripted(vec![
            Err(FeedError::Closed),
            Ok(vec![ChangeRecord::modified("x", list_body("Recovered"))]),
        ]);

        let shutdown = CancellationToken::new();
        let started = tokio::time::Instant::now();
        let listener = ChangeSourceListener::new(feed, broadcaster, Duration::from_secs(5));
        let task = tokio::spawn(listener.run(shutdown.clone()));

        let event = next_event(&mut rx).await;
        assert_eq!(event["list"]["name"], "Recovered");
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        task.await.unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_the_backoff() {
        let (broadcaster, _rx) = setup();
        let (feed, opens, _) = scripted(vec![Err(FeedError::Closed)]);

        let shutdown = CancellationToken::new();
        let listener = ChangeSourceListener::new(feed, broadcaster, Duration::from_secs(3600));
        let task = tokio::spawn(listener.run(shutdown.clone()));
        while opens.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        shutdown.cancel();
        task.await.unwrap();
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }
}
