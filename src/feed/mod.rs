//! Change feeds over the list collection and the listener that turns them
//! into client notifications.

pub mod listener;
pub mod memory;
pub mod pg;

use async_trait::async_trait;

use crate::models::ChangeRecord;

pub use listener::ChangeSourceListener;
pub use memory::MemoryChangeFeed;
pub use pg::PgChangeFeed;

#[derive(Debug)]
pub enum FeedError {
    /// The feed went away, for example the store shut its channel
    Closed,
    /// The subscriber fell behind and missed this many records
    Lagged(u64),
    Database(sqlx::Error),
    Store(crate::db::StoreError),
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Closed => write!(f, "change feed closed"),
            FeedError::Lagged(missed) => {
                write!(f, "change feed lagged, {} record(s) missed", missed)
            }
            FeedError::Database(e) => write!(f, "change feed database error: {}", e),
            FeedError::Store(e) => write!(f, "change feed snapshot failed: {}", e),
        }
    }
}

impl std::error::Error for FeedError {}

impl From<sqlx::Error> for FeedError {
    fn from(e: sqlx::Error) -> Self {
        FeedError::Database(e)
    }
}

impl From<crate::db::StoreError> for FeedError {
    fn from(e: crate::db::StoreError) -> Self {
        FeedError::Store(e)
    }
}

/// Source of subscriptions on the list collection
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Subscription>, FeedError>;
}

/// One standing subscription
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next batch of changes, in feed order
    async fn next_batch(&mut self) -> Result<Vec<ChangeRecord>, FeedError>;

    async fn close(&mut self);
}
