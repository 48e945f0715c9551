//! Runs against a real PostgreSQL when `TEST_DB_URL` is set, otherwise the
//! tests return early.

use std::time::Duration;

use chrono::Utc;
use listcast::db::{ListStore, PgListStore};
use listcast::feed::{ChangeFeed, PgChangeFeed};
use listcast::models::{ChangeKind, Item};

async fn store() -> Option<PgListStore> {
    let url = std::env::var("TEST_DB_URL").ok()?;
    let store = PgListStore::connect(&url, 2).await.unwrap();
    store.migrate().await.unwrap();
    Some(store)
}

fn item(n: usize) -> Item {
    Item {
        id: format!("item-{n}"),
        item: format!("{n} bottles of sparkling water, the large ones"),
        checked: false,
        user: "sam".to_string(),
        created: Utc::now(),
    }
}

#[tokio::test]
async fn large_lists_keep_accepting_items_and_notify() {
    let Some(store) = store().await else {
        return;
    };
    let list = store.create_list("Party").await.unwrap();
    for n in 0..120 {
        store.add_item(&list.id, &item(n)).await.unwrap();
    }
    let stored = store.get_list(&list.id).await.unwrap();
    assert!(serde_json::to_string(&stored).unwrap().len() > 8000);

    let feed = PgChangeFeed::new(store.clone(), false);
    let mut subscription = feed.open().await.unwrap();
    store.add_item(&list.id, &item(120)).await.unwrap();

    let batch = tokio::time::timeout(Duration::from_secs(5), subscription.next_batch())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].kind, ChangeKind::Modified);
    assert_eq!(batch[0].body.as_ref().unwrap()["items"].as_array().unwrap().len(), 121);

    store.delete_list(&list.id).await.unwrap();
    let batch = tokio::time::timeout(Duration::from_secs(5), subscription.next_batch())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch[0].kind, ChangeKind::Removed);
    subscription.close().await;
}
