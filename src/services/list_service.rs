use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::{ListStore, StoreError};
use crate::models::{Item, ItemRequest, NotificationEvent, ShoppingList};
use crate::ws::Broadcaster;

/// List and item mutations with local echo.
///
/// Each successful write is broadcast right away, without waiting for the
/// change feed to report it. A failed write broadcasts nothing.
#[derive(Clone)]
pub struct ListService {
    store: Arc<dyn ListStore>,
    broadcaster: Broadcaster,
}

impl ListService {
    pub fn new(store: Arc<dyn ListStore>, broadcaster: Broadcaster) -> Self {
        Self { store, broadcaster }
    }

    pub fn store(&self) -> &dyn ListStore {
        self.store.as_ref()
    }

    pub async fn list_all(&self) -> Result<Vec<ShoppingList>, StoreError> {
        self.store.list_all().await
    }

    pub async fn get_list(&self, id: &str) -> Result<ShoppingList, StoreError> {
        self.store.get_list(id).await
    }

    pub async fn create_list(&self, name: &str) -> Result<ShoppingList, StoreError> {
        let list = self.store.create_list(name).await?;
        info!("Created list {} ({})", list.id, list.name);
        self.broadcaster.broadcast(&NotificationEvent::ListCreated {
            list_id: list.id.clone(),
            list: list.clone(),
        });
        Ok(list)
    }

    pub async fn delete_list(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete_list(id).await?;
        info!("Deleted list {}", id);
        self.broadcaster.broadcast(&NotificationEvent::ListDeleted {
            list_id: id.to_string(),
        });
        Ok(())
    }

    pub async fn add_item(&self, list_id: &str, request: ItemRequest) -> Result<Item, StoreError> {
        let item = Item {
            id: Uuid::new_v4().to_string(),
            item: request.item,
            checked: request.checked,
            user: request.user,
            created: Utc::now(),
        };
        self.store.add_item(list_id, &item).await?;
        self.broadcaster.broadcast(&NotificationEvent::ItemCreated {
            list_id: list_id.to_string(),
            item_id: item.id.clone(),
            item: item.clone(),
        });
        Ok(item)
    }

    pub async fn update_item(
        &self,
        list_id: &str,
        index: usize,
        request: &ItemRequest,
    ) -> Result<Item, StoreError> {
        let item = self.store.update_item(list_id, index, request).await?;
        self.broadcaster.broadcast(&NotificationEvent::ItemUpdated {
            list_id: list_id.to_string(),
            item_id: item.id.clone(),
            item: item.clone(),
        });
        Ok(item)
    }

    pub async fn remove_item(&self, list_id: &str, index: usize) -> Result<Item, StoreError> {
        let removed = self.store.remove_item(list_id, index).await?;
        self.broadcaster.broadcast(&NotificationEvent::ItemDeleted {
            list_id: list_id.to_string(),
            item_id: removed.id.clone(),
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryListStore;
    use crate::ws::testing::{channel_connection, next_text};
    use crate::ws::ConnectionRegistry;
    use serde_json::Value;

    fn service() -> (ListService, ConnectionRegistry) {
        let registry = ConnectionRegistry::new();
        let broadcaster = Broadcaster::new(registry.clone());
        (ListService::new(Arc::new(MemoryListStore::new()), broadcaster), registry)
    }

    fn item(text: &str) -> ItemRequest {
        ItemRequest {
            item: text.to_string(),
            checked: false,
            user: "ana".to_string(),
        }
    }

    #[tokio::test]
    async fn both_clients_see_creation_and_only_the_remaining_one_sees_later_items() {
        let (service, registry) = service();
        let (a, mut rx_a) = channel_connection();
        let (b, mut rx_b) = channel_connection();
        registry.add(a.clone());
        registry.add(b.clone());

        let list = service.create_list("Groceries").await.unwrap();
        for rx in [&mut rx_a, &mut rx_b] {
            let event: Value = serde_json::from_str(&next_text(rx).await.unwrap()).unwrap();
            assert_eq!(event["type"], "LIST_CREATE");
            assert_eq!(event["listId"], list.id.as_str());
            assert_eq!(event["list"]["name"], "Groceries");
        }

        // client A goes away
        registry.close(&a);
        drop(rx_a);

        let added = service.add_item(&list.id, item("Bread")).await.unwrap();
        let event: Value = serde_json::from_str(&next_text(&mut rx_b).await.unwrap()).unwrap();
        assert_eq!(event["type"], "CREATE");
        assert_eq!(event["itemId"], added.id.as_str());
        assert_eq!(event["item"]["item"], "Bread");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn update_and_remove_echo_the_stable_item_id() {
        let (service, registry) = service();
        let list = service.create_list("Hardware").await.unwrap();
        let added = service.add_item(&list.id, item("Screws")).await.unwrap();

        let (conn, mut rx) = channel_connection();
        registry.add(conn);

        let mut changes = item("Wood screws");
        changes.checked = true;
        service.update_item(&list.id, 0, &changes).await.unwrap();
        let event: Value = serde_json::from_str(&next_text(&mut rx).await.unwrap()).unwrap();
        assert_eq!(event["type"], "UPDATE");
        assert_eq!(event["itemId"], added.id.as_str());
        assert_eq!(event["item"]["checked"], true);

        service.remove_item(&list.id, 0).await.unwrap();
        let event: Value = serde_json::from_str(&next_text(&mut rx).await.unwrap()).unwrap();
        assert_eq!(event["type"], "DELETE");
        assert_eq!(event["itemId"], added.id.as_str());
        assert!(event.get("item").is_none());
    }

    #[tokio::test]
    async fn failed_writes_are_not_broadcast() {
        let (service, registry) = service();
        let (conn, mut rx) = channel_connection();
        registry.add(conn);

        assert!(service.add_item("missing", item("Eggs")).await.is_err());
        assert!(service.remove_item("missing", 0).await.is_err());
        assert!(service.delete_list("missing").await.is_err());

        service.delete_list(&service.create_list("x").await.unwrap().id).await.unwrap();
        let first: Value = serde_json::from_str(&next_text(&mut rx).await.unwrap()).unwrap();
        assert_eq!(first["type"], "LIST_CREATE");
        let second: Value = serde_json::from_str(&next_text(&mut rx).await.unwrap()).unwrap();
        assert_eq!(second["type"], "LIST_DELETE");
    }
}
