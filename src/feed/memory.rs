use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::{ChangeFeed, FeedError, Subscription};
use crate::db::{ListStore, MemoryListStore};
use crate::models::ChangeRecord;

/// Change feed over a [`MemoryListStore`]
pub struct MemoryChangeFeed {
    store: Arc<MemoryListStore>,
    initial_snapshot: bool,
}

impl MemoryChangeFeed {
    pub fn new(store: Arc<MemoryListStore>, initial_snapshot: bool) -> Self {
        Self {
            store,
            initial_snapshot,
        }
    }
}

#[async_trait]
impl ChangeFeed for MemoryChangeFeed {
    async fn open(&self) -> Result<Box<dyn Subscription>, FeedError> {
        let receiver = self.store.subscribe_changes();
        let pending = if self.initial_snapshot {
            let mut records = Vec::new();
            for list in self.store.list_all().await? {
                if let Ok(body) = serde_json::to_value(&list) {
                    records.push(ChangeRecord::added(list.id, body));
                }
            }
            Some(records)
        } else {
            None
        };
        Ok(Box::new(MemorySubscription {
            receiver,
            pending,
            lagged: None,
        }))
    }
}

struct MemorySubscription {
    receiver: broadcast::Receiver<ChangeRecord>,
    pending: Option<Vec<ChangeRecord>>,
    /// Gap found while draining, reported after the batch before it
    lagged: Option<u64>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next_batch(&mut self) -> Result<Vec<ChangeRecord>, FeedError> {
        if let Some(snapshot) = self.pending.take() {
            return Ok(snapshot);
        }
        if let Some(missed) = self.lagged.take() {
            return Err(FeedError::Lagged(missed));
        }
        let first = self.receiver.recv().await.map_err(|e| match e {
            RecvError::Closed => FeedError::Closed,
            RecvError::Lagged(missed) => FeedError::Lagged(missed),
        })?;

        let receiver = &mut self.receiver;
        let (batch, lagged) = drain_batch(first, || receiver.try_recv());
        self.lagged = lagged;
        Ok(batch)
    }

    async fn close(&mut self) {
        self.pending = None;
    }
}

/// Collect `first` and whatever else is already queued into one batch.
/// Stops at a gap and returns its size next to the records before it.
fn drain_batch(
    first: ChangeRecord,
    mut try_next: impl FnMut() -> Result<ChangeRecord, TryRecvError>,
) -> (Vec<ChangeRecord>, Option<u64>) {
    let mut batch = vec![first];
    loop {
        match try_next() {
            Ok(record) => batch.push(record),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return (batch, None),
            Err(TryRecvError::Lagged(missed)) => return (batch, Some(missed)),
        }
    }
}
