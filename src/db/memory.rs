use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::warn;
use uuid::Uuid;

use super::{apply_item_update, take_item, ListStore, StoreError};
use crate::models::{ChangeRecord, Item, ItemRequest, ShoppingList};

const CHANGE_CAPACITY: usize = 256;

/// In-process list store.
///
/// Every committed write is published as a [`ChangeRecord`], so the change
/// feed built on top of it behaves like the PostgreSQL trigger does.
pub struct MemoryListStore {
    lists: RwLock<HashMap<String, ShoppingList>>,
    changes: broadcast::Sender<ChangeRecord>,
}

impl Default for MemoryListStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryListStore {
    pub fn new() -> Self {
        let (changes, _rx) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            lists: RwLock::new(HashMap::new()),
            changes,
        }
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeRecord> {
        self.changes.subscribe()
    }

    fn publish(&self, record: ChangeRecord) {
        // no receivers just means nobody listens to the feed
        let _ = self.changes.send(record);
    }

    fn publish_snapshot(&self, list: &ShoppingList, added: bool) {
        match serde_json::to_value(list) {
            Ok(body) if added => self.publish(ChangeRecord::added(list.id.clone(), body)),
            Ok(body) => self.publish(ChangeRecord::modified(list.id.clone(), body)),
            Err(e) => warn!("Could not publish change for list {}: {}", list.id, e),
        }
    }

    /// Edit one list under the write lock and publish the result
    async fn edit<T>(
        &self,
        list_id: &str,
        edit: impl FnOnce(&mut ShoppingList) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut lists = self.lists.write().await;
        let list = lists
            .get_mut(list_id)
            .ok_or_else(|| StoreError::NotFound(list_id.to_string()))?;
        let result = edit(list)?;
        self.publish_snapshot(list, false);
        Ok(result)
    }
}

#[async_trait]
impl ListStore for MemoryListStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ShoppingList>, StoreError> {
        let mut lists: Vec<ShoppingList> = self.lists.read().await.values().cloned().collect();
        lists.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        Ok(lists)
    }

    async fn get_list(&self, id: &str) -> Result<ShoppingList, StoreError> {
        self.lists
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create_list(&self, name: &str) -> Result<ShoppingList, StoreError> {
        let list = ShoppingList {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created: Utc::now(),
            items: Vec::new(),
        };
        let mut lists = self.lists.write().await;
        lists.insert(list.id.clone(), list.clone());
        self.publish_snapshot(&list, true);
        Ok(list)
    }

    async fn delete_list(&self, id: &str) -> Result<(), StoreError> {
        let mut lists = self.lists.write().await;
        if lists.remove(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.publish(ChangeRecord::removed(id));
        Ok(())
    }

    async fn add_item(&self, list_id: &str, item: &Item) -> Result<(), StoreError> {
        self.edit(list_id, |list| {
            list.items.push(item.clone());
            Ok(())
        })
        .await
    }

    async fn update_item(
        &self,
        list_id: &str,
        index: usize,
        changes: &ItemRequest,
    ) -> Result<Item, StoreError> {
        self.edit(list_id, |list| apply_item_update(&mut list.items, index, changes))
            .await
    }

    async fn remove_item(&self, list_id: &str, index: usize) -> Result<Item, StoreError> {
        self.edit(list_id, |list| take_item(&mut list.items, index)).await
    }
}
