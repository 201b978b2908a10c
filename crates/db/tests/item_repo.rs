use chrono::{NaiveDate, Utc};

use larder_core::domain::item::{Category, Item, ItemId, ItemStatus};
use larder_core::domain::notification::{
    NotificationChannel, NotificationKind, NotificationLogEntry,
};
use larder_db::{
    connect_with_settings, migrations, DbPool, ItemPatch, ItemRepository, NewItemRecord,
    NotificationLogRepository, SqlItemRepository, SqlNotificationLogRepository,
};

async fn test_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    pool
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[tokio::test]
async fn insert_list_round_trip() {
    let repo = SqlItemRepository::new(test_pool().await);

    let inserted = repo
        .insert(NewItemRecord {
            name: "Dog food".to_string(),
            category: Category::Pet,
            last_purchased: Some(date(2025, 6, 15)),
            duration_days: 90,
        })
        .await
        .expect("insert");

    assert_eq!(inserted.id, ItemId(1));

    let active = repo.list_active().await.expect("list");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "Dog food");
    assert_eq!(active[0].category, Category::Pet);
    assert_eq!(active[0].last_purchased, Some(date(2025, 6, 15)));
    assert_eq!(active[0].duration_days, 90);
    assert_eq!(active[0].status, ItemStatus::Active);
}

#[tokio::test]
async fn insert_rejects_invalid_items_at_write_boundary() {
    let repo = SqlItemRepository::new(test_pool().await);

    let empty_name = repo
        .insert(NewItemRecord {
            name: "   ".to_string(),
            category: Category::House,
            last_purchased: None,
            duration_days: 30,
        })
        .await;
    let zero_duration = repo
        .insert(NewItemRecord {
            name: "Dish soap".to_string(),
            category: Category::House,
            last_purchased: None,
            duration_days: 0,
        })
        .await;

    assert!(empty_name.is_err());
    assert!(zero_duration.is_err());
    assert!(repo.list_active().await.expect("list").is_empty());
}

#[tokio::test]
async fn update_fields_is_partial_and_skips_deleted_rows() {
    let repo = SqlItemRepository::new(test_pool().await);
    let item = repo
        .insert(NewItemRecord {
            name: "Dish soap".to_string(),
            category: Category::House,
            last_purchased: Some(date(2025, 8, 1)),
            duration_days: 30,
        })
        .await
        .expect("insert");

    let updated = repo
        .update_fields(item.id, ItemPatch { last_purchased: Some(date(2025, 8, 20)), ..ItemPatch::default() })
        .await
        .expect("update")
        .expect("row exists");

    assert_eq!(updated.last_purchased, Some(date(2025, 8, 20)));
    assert_eq!(updated.duration_days, 30);
    assert_eq!(updated.name, "Dish soap");

    repo.soft_delete(item.id).await.expect("delete");
    let after_delete = repo
        .update_fields(item.id, ItemPatch { duration_days: Some(10), ..ItemPatch::default() })
        .await
        .expect("update");
    assert_eq!(after_delete, None);
}

#[tokio::test]
async fn soft_delete_keeps_row_and_id_is_not_reused() {
    let repo = SqlItemRepository::new(test_pool().await);
    let first = repo
        .insert(NewItemRecord {
            name: "Dish soap".to_string(),
            category: Category::House,
            last_purchased: None,
            duration_days: 30,
        })
        .await
        .expect("insert");

    assert!(repo.soft_delete(first.id).await.expect("delete"));
    assert!(repo.list_active().await.expect("list").is_empty());
    let stored = repo.find_by_id(first.id).await.expect("find").expect("row kept");
    assert_eq!(stored.status, ItemStatus::Deleted);

    // AUTOINCREMENT: the deleted id is never handed out again.
    let second = repo
        .insert(NewItemRecord {
            name: "Sponges".to_string(),
            category: Category::House,
            last_purchased: None,
            duration_days: 60,
        })
        .await
        .expect("insert");
    assert_eq!(second.id, ItemId(2));
    assert_eq!(repo.max_id().await.expect("max id"), 2);
}

#[tokio::test]
async fn insert_with_id_round_trips_reconciliation_output() {
    let repo = SqlItemRepository::new(test_pool().await);
    let item = Item {
        id: ItemId(5),
        name: "Bread".to_string(),
        category: Category::Food,
        last_purchased: Some(date(2025, 7, 21)),
        duration_days: 7,
        status: ItemStatus::Active,
        created_at: Utc::now(),
    };

    repo.insert_with_id(&item).await.expect("insert");

    let stored = repo.find_by_id(ItemId(5)).await.expect("find").expect("stored");
    assert_eq!(stored.name, "Bread");
    assert_eq!(stored.duration_days, 7);
    assert_eq!(repo.max_id().await.expect("max id"), 5);
}

#[tokio::test]
async fn unknown_categories_survive_storage() {
    let repo = SqlItemRepository::new(test_pool().await);
    let inserted = repo
        .insert(NewItemRecord {
            name: "Potting soil".to_string(),
            category: Category::Other("Garden".to_string()),
            last_purchased: None,
            duration_days: 180,
        })
        .await
        .expect("insert");

    let stored = repo.find_by_id(inserted.id).await.expect("find").expect("stored");
    assert_eq!(stored.category, Category::Other("Garden".to_string()));
}

#[tokio::test]
async fn notification_log_appends_and_dedups_by_day() {
    let pool = test_pool().await;
    let log = SqlNotificationLogRepository::new(pool);

    let entry = NotificationLogEntry {
        sent_at: Utc::now(),
        kind: NotificationKind::Automatic,
        channel: NotificationChannel::Email,
        recipients: vec!["home@example.com".to_string(), "partner@example.com".to_string()],
        body: "Running low: Bread".to_string(),
    };
    let today = entry.sent_at.date_naive();

    assert!(!log.automatic_sent_on(today).await.expect("query"));
    log.append(&entry).await.expect("append");
    assert!(log.automatic_sent_on(today).await.expect("query"));

    let manual = NotificationLogEntry { kind: NotificationKind::Manual, ..entry };
    log.append(&manual).await.expect("append");
    let tomorrow = today.succ_opt().expect("date");
    assert!(!log.automatic_sent_on(tomorrow).await.expect("query"));
}
