use serde::{Deserialize, Serialize};

use crate::models::{Item, ShoppingList};

/// Notification pushed to every connected client.
///
/// Serialized as a flat JSON object tagged by `type`:
/// `{"type": "CREATE", "listId": "...", "itemId": "...", "item": {...}}`.
/// Clients should treat these as idempotent hints: the same logical change
/// can arrive twice, once as a local echo and once from the change feed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    #[serde(rename = "LIST_CREATE", rename_all = "camelCase")]
    ListCreated { list_id: String, list: ShoppingList },
    #[serde(rename = "LIST", rename_all = "camelCase")]
    ListUpdated { list_id: String, list: ShoppingList },
    #[serde(rename = "LIST_DELETE", rename_all = "camelCase")]
    ListDeleted { list_id: String },
    #[serde(rename = "CREATE", rename_all = "camelCase")]
    ItemCreated { list_id: String, item_id: String, item: Item },
    #[serde(rename = "UPDATE", rename_all = "camelCase")]
    ItemUpdated { list_id: String, item_id: String, item: Item },
    #[serde(rename = "DELETE", rename_all = "camelCase")]
    ItemDeleted { list_id: String, item_id: String },
}

impl NotificationEvent {
    pub fn list_id(&self) -> &str {
        match self {
            NotificationEvent::ListCreated { list_id, .. }
            | NotificationEvent::ListUpdated { list_id, .. }
            | NotificationEvent::ListDeleted { list_id }
            | NotificationEvent::ItemCreated { list_id, .. }
            | NotificationEvent::ItemUpdated { list_id, .. }
            | NotificationEvent::ItemDeleted { list_id, .. } => list_id,
        }
    }

    /// Wire name of the event, as found in the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::ListCreated { .. } => "LIST_CREATE",
            NotificationEvent::ListUpdated { .. } => "LIST",
            NotificationEvent::ListDeleted { .. } => "LIST_DELETE",
            NotificationEvent::ItemCreated { .. } => "CREATE",
            NotificationEvent::ItemUpdated { .. } => "UPDATE",
            NotificationEvent::ItemDeleted { .. } => "DELETE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn sample_item() -> Item {
        Item {
            id: "item-1".to_string(),
            item: "Milk".to_string(),
            checked: false,
            user: "ana".to_string(),
            created: Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn item_events_carry_item_id_and_payload() {
        let event = NotificationEvent::ItemCreated {
            list_id: "list-1".to_string(),
            item_id: "item-1".to_string(),
            item: sample_item(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "CREATE");
        assert_eq!(value["listId"], "list-1");
        assert_eq!(value["itemId"], "item-1");
        assert_eq!(value["item"]["item"], "Milk");
        assert!(value.get("list").is_none());
        assert_eq!(event.kind(), "CREATE");
    }

    #[test]
    fn deletions_omit_payload_fields() {
        let event = NotificationEvent::ListDeleted {
            list_id: "list-9".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "LIST_DELETE", "listId": "list-9"})
        );

        let event = NotificationEvent::ItemDeleted {
            list_id: "list-9".to_string(),
            item_id: "item-3".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "DELETE", "listId": "list-9", "itemId": "item-3"})
        );
    }

    #[test]
    fn list_events_embed_the_full_snapshot() {
        let list = ShoppingList {
            id: "list-1".to_string(),
            name: "Groceries".to_string(),
            created: Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap(),
            items: vec![sample_item()],
        };
        let event = NotificationEvent::ListUpdated {
            list_id: list.id.clone(),
            list,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "LIST");
        assert_eq!(value["list"]["name"], "Groceries");
        assert_eq!(value["list"]["items"][0]["id"], "item-1");
        assert!(value.get("itemId").is_none());
        assert_eq!(event.list_id(), "list-1");
    }
}
