use async_trait::async_trait;
use serde::Deserialize;
use sqlx::postgres::PgListener;
use tracing::{debug, warn};

use super::{ChangeFeed, FeedError, Subscription};
use crate::db::{ListStore, PgListStore, StoreError};
use crate::models::{ChangeKind, ChangeRecord, ShoppingList};

/// Channel the `shopping_lists_notify` trigger publishes on
pub const LIST_CHANGES_CHANNEL: &str = "shopping_lists_changes";

/// Change feed backed by PostgreSQL `LISTEN/NOTIFY`.
///
/// Notifications only name the changed list; the current row is read back
/// from the store before it is handed to the listener.
pub struct PgChangeFeed {
    store: PgListStore,
    initial_snapshot: bool,
}

impl PgChangeFeed {
    pub fn new(store: PgListStore, initial_snapshot: bool) -> Self {
        Self {
            store,
            initial_snapshot,
        }
    }
}

#[async_trait]
impl ChangeFeed for PgChangeFeed {
    async fn open(&self) -> Result<Box<dyn Subscription>, FeedError> {
        let mut listener = PgListener::connect_with(self.store.pool()).await?;
        listener.listen(LIST_CHANGES_CHANNEL).await?;

        // read the snapshot only after LISTEN so no change falls in between
        let pending = if self.initial_snapshot {
            let lists = self.store.list_all().await?;
            Some(
                lists
                    .into_iter()
                    .filter_map(|list| list_record(ChangeKind::Added, list))
                    .collect(),
            )
        } else {
            None
        };

        Ok(Box::new(PgSubscription {
            listener,
            store: self.store.clone(),
            pending,
        }))
    }
}

struct PgSubscription {
    listener: PgListener,
    store: PgListStore,
    pending: Option<Vec<ChangeRecord>>,
}

#[async_trait]
impl Subscription for PgSubscription {
    async fn next_batch(&mut self) -> Result<Vec<ChangeRecord>, FeedError> {
        if let Some(snapshot) = self.pending.take() {
            return Ok(snapshot);
        }
        let notification = self.listener.recv().await?;
        let Some(change) = parse_payload(notification.payload()) else {
            return Ok(Vec::new());
        };
        if change.kind == ChangeKind::Removed {
            return Ok(vec![ChangeRecord::removed(change.id)]);
        }
        let loaded = self.store.get_list(&change.id).await;
        Ok(resolve_change(change, loaded)?.into_iter().collect())
    }

    async fn close(&mut self) {
        if let Err(e) = self.listener.unlisten_all().await {
            debug!("UNLISTEN failed while closing change feed: {}", e);
        }
    }
}

/// Payload written by the notify trigger
#[derive(Debug, Deserialize)]
struct TriggerPayload {
    op: String,
    id: String,
}

/// What a notification announced, before the row is loaded
#[derive(Debug, PartialEq, Eq)]
struct ListChange {
    kind: ChangeKind,
    id: String,
}

fn parse_payload(payload: &str) -> Option<ListChange> {
    let payload: TriggerPayload = match serde_json::from_str(payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Ignoring malformed change notification: {}", e);
            return None;
        }
    };
    let kind = match payload.op.as_str() {
        "INSERT" => ChangeKind::Added,
        "UPDATE" => ChangeKind::Modified,
        "DELETE" => ChangeKind::Removed,
        other => {
            warn!("Ignoring change notification with unknown op '{}'", other);
            return None;
        }
    };
    Some(ListChange { kind, id: payload.id })
}

/// Turn an announced insert or update plus the row read afterwards into a
/// record. A row that is gone by then was deleted in the meantime.
fn resolve_change(
    change: ListChange,
    loaded: Result<ShoppingList, StoreError>,
) -> Result<Option<ChangeRecord>, FeedError> {
    match loaded {
        Ok(list) => Ok(list_record(change.kind, list)),
        Err(StoreError::NotFound(_)) => {
            debug!("List {} vanished before it could be read", change.id);
            Ok(Some(ChangeRecord::removed(change.id)))
        }
        Err(e) => Err(e.into()),
    }
}

fn list_record(kind: ChangeKind, list: ShoppingList) -> Option<ChangeRecord> {
    let body = match serde_json::to_value(&list) {
        Ok(body) => body,
        Err(e) => {
            warn!("Could not encode list {}: {}", list.id, e);
            return None;
        }
    };
    Some(ChangeRecord {
        kind,
        document_id: list.id,
        body: Some(body),
    })
}
