//! List/item storage. `pg` is the PostgreSQL backend, `memory` keeps
//! everything in process for local runs and tests.

pub mod memory;
pub mod pg;

use async_trait::async_trait;

use crate::models::{Item, ItemRequest, ShoppingList};

pub use memory::MemoryListStore;
pub use pg::PgListStore;

#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    IndexOutOfBounds { index: usize, len: usize },
    Database(sqlx::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "list '{}' not found", id),
            StoreError::IndexOutOfBounds { index, len } => {
                write!(f, "item index {} out of bounds for list of {} item(s)", index, len)
            }
            StoreError::Database(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

/// Storage operations behind the HTTP API
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Short backend name for logs and readiness output
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn list_all(&self) -> Result<Vec<ShoppingList>, StoreError>;

    async fn get_list(&self, id: &str) -> Result<ShoppingList, StoreError>;

    async fn create_list(&self, name: &str) -> Result<ShoppingList, StoreError>;

    async fn delete_list(&self, id: &str) -> Result<(), StoreError>;

    /// Append `item` to the end of the list
    async fn add_item(&self, list_id: &str, item: &Item) -> Result<(), StoreError>;

    /// Replace the item at `index`, keeping its id and creation time
    async fn update_item(
        &self,
        list_id: &str,
        index: usize,
        changes: &ItemRequest,
    ) -> Result<Item, StoreError>;

    /// Remove and return the item at `index`
    async fn remove_item(&self, list_id: &str, index: usize) -> Result<Item, StoreError>;
}

/// Shared by both backends so they agree on update semantics
pub(crate) fn apply_item_update(
    items: &mut [Item],
    index: usize,
    changes: &ItemRequest,
) -> Result<Item, StoreError> {
    let len = items.len();
    let slot = items
        .get_mut(index)
        .ok_or(StoreError::IndexOutOfBounds { index, len })?;
    slot.item = changes.item.clone();
    slot.checked = changes.checked;
    slot.user = changes.user.clone();
    Ok(slot.clone())
}

pub(crate) fn take_item(items: &mut Vec<Item>, index: usize) -> Result<Item, StoreError> {
    if index >= items.len() {
        return Err(StoreError::IndexOutOfBounds { index, len: items.len() });
    }
    Ok(items.remove(index))
}
