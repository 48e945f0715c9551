use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single entry of a shopping list
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct Item {
    #[serde(default)]
    pub id: String,
    pub item: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub user: String,
    pub created: DateTime<Utc>,
}

/// A shopping list as stored in the backing store
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ShoppingList {
    /// Document id. Change feed bodies may omit it, the listener fills it in.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Request body for creating a list
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CreateListRequest {
    pub name: String,
}

/// Response for creating a list
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CreateListResponse {
    pub id: String,
}

/// Request body for adding or replacing an item
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct ItemRequest {
    pub item: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub user: String,
}

/// Plain acknowledgement for item mutations
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct MessageResponse {
    pub message: String,
}
