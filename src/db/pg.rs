use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use super::{apply_item_update, take_item, ListStore, StoreError};
use crate::models::{Item, ItemRequest, ShoppingList};

/// Row of the `shopping_lists` table
#[derive(Debug, sqlx::FromRow)]
struct ListRow {
    id: String,
    name: String,
    created: DateTime<Utc>,
    items: Json<Vec<Item>>,
}

impl From<ListRow> for ShoppingList {
    fn from(row: ListRow) -> Self {
        ShoppingList {
            id: row.id,
            name: row.name,
            created: row.created,
            items: row.items.0,
        }
    }
}

/// PostgreSQL-backed list store
#[derive(Clone)]
pub struct PgListStore {
    pool: PgPool,
}

impl PgListStore {
    /// Create the connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    /// * `max_connections` - Upper bound for the pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // Close idle connections after 10 minutes
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema, including the change notification trigger
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Load the items of a list under a row lock, let `edit` change them and
    /// write them back in the same transaction.
    async fn edit_items<T: Send>(
        &self,
        list_id: &str,
        edit: impl FnOnce(&mut Vec<Item>) -> Result<T, StoreError> + Send,
    ) -> Result<T, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(Json<Vec<Item>>,)> =
            sqlx::query_as("SELECT items FROM shopping_lists WHERE id = $1 FOR UPDATE")
                .bind(list_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((Json(mut items),)) = current else {
            return Err(StoreError::NotFound(list_id.to_string()));
        };

        let result = edit(&mut items)?;

        sqlx::query("UPDATE shopping_lists SET items = $2 WHERE id = $1")
            .bind(list_id)
            .bind(Json(&items))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result)
    }
}

#[async_trait]
impl ListStore for PgListStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ShoppingList>, StoreError> {
        let rows = sqlx::query_as::<_, ListRow>(
            "SELECT id, name, created, items FROM shopping_lists ORDER BY created, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load lists: {}", e);
            e
        })?;
        Ok(rows.into_iter().map(ShoppingList::from).collect())
    }

    async fn get_list(&self, id: &str) -> Result<ShoppingList, StoreError> {
        sqlx::query_as::<_, ListRow>(
            "SELECT id, name, created, items FROM shopping_lists WHERE id = $1",
        )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(ShoppingList::from)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create_list(&self, name: &str) -> Result<ShoppingList, StoreError> {
        let row = sqlx::query_as::<_, ListRow>(
            r#"
            INSERT INTO shopping_lists (id, name)
            VALUES ($1, $2)
            RETURNING id, name, created, items
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete_list(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM shopping_lists WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn add_item(&self, list_id: &str, item: &Item) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE shopping_lists SET items = items || jsonb_build_array($2::jsonb) WHERE id = $1",
        )
        .bind(list_id)
        .bind(Json(item))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(list_id.to_string()));
        }
        Ok(())
    }

    async fn update_item(
        &self,
        list_id: &str,
        index: usize,
        changes: &ItemRequest,
    ) -> Result<Item, StoreError> {
        let changes = changes.clone();
        self.edit_items(list_id, move |items| apply_item_update(items, index, &changes))
            .await
    }

    async fn remove_item(&self, list_id: &str, index: usize) -> Result<Item, StoreError> {
        self.edit_items(list_id, move |items| take_item(items, index)).await
    }
}
