use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use larder_core::domain::item::{validate_fields, Item, ItemId, ItemStatus};
use larder_core::domain::notification::{NotificationKind, NotificationLogEntry};

use super::{
    ItemPatch, ItemRepository, NewItemRecord, NotificationLogRepository, RepositoryError,
};

/// Test and dev-mode twin of [`super::SqlItemRepository`]. Ids count up and
/// are never reused, matching the AUTOINCREMENT semantics of the real table.
#[derive(Default)]
pub struct InMemoryItemRepository {
    items: RwLock<HashMap<i64, Item>>,
    next_id: AtomicI64,
}

impl InMemoryItemRepository {
    pub async fn seeded(items: Vec<Item>) -> Self {
        let repo = Self::default();
        {
            let mut guard = repo.items.write().await;
            for item in items {
                repo.next_id.fetch_max(item.id.0, Ordering::SeqCst);
                guard.insert(item.id.0, item);
            }
        }
        repo
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn list_active(&self) -> Result<Vec<Item>, RepositoryError> {
        let items = self.items.read().await;
        let mut active: Vec<Item> =
            items.values().filter(|item| item.is_active()).cloned().collect();
        active.sort_by_key(|item| item.id);
        Ok(active)
    }

    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.get(&id.0).cloned())
    }

    async fn insert(&self, record: NewItemRecord) -> Result<Item, RepositoryError> {
        validate_fields(&record.name, record.duration_days)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let item = Item {
            id: ItemId(id),
            name: record.name.trim().to_string(),
            category: record.category,
            last_purchased: record.last_purchased,
            duration_days: record.duration_days,
            status: ItemStatus::Active,
            created_at: Utc::now(),
        };
        self.items.write().await.insert(id, item.clone());
        Ok(item)
    }

    async fn insert_with_id(&self, item: &Item) -> Result<(), RepositoryError> {
        item.validate()?;
        self.next_id.fetch_max(item.id.0, Ordering::SeqCst);
        self.items.write().await.insert(item.id.0, item.clone());
        Ok(())
    }

    async fn update_fields(
        &self,
        id: ItemId,
        patch: ItemPatch,
    ) -> Result<Option<Item>, RepositoryError> {
        let mut items = self.items.write().await;
        let Some(item) = items.get_mut(&id.0).filter(|item| item.is_active()) else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            validate_fields(name, item.duration_days)?;
        }
        if let Some(duration) = patch.duration_days {
            validate_fields(&item.name, duration)?;
        }

        if let Some(name) = patch.name {
            item.name = name.trim().to_string();
        }
        if let Some(category) = patch.category {
            item.category = category;
        }
        if let Some(last_purchased) = patch.last_purchased {
            item.last_purchased = Some(last_purchased);
        }
        if let Some(duration) = patch.duration_days {
            item.duration_days = duration;
        }
        Ok(Some(item.clone()))
    }

    async fn soft_delete(&self, id: ItemId) -> Result<bool, RepositoryError> {
        let mut items = self.items.write().await;
        match items.get_mut(&id.0).filter(|item| item.is_active()) {
            Some(item) => {
                item.status = ItemStatus::Deleted;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn max_id(&self) -> Result<i64, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.keys().copied().max().unwrap_or(0))
    }
}

#[derive(Default)]
pub struct InMemoryNotificationLogRepository {
    entries: RwLock<Vec<NotificationLogEntry>>,
}

impl InMemoryNotificationLogRepository {
    pub async fn entries(&self) -> Vec<NotificationLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl NotificationLogRepository for InMemoryNotificationLogRepository {
    async fn append(&self, entry: &NotificationLogEntry) -> Result<(), RepositoryError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn automatic_sent_on(&self, day: NaiveDate) -> Result<bool, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .any(|entry| entry.kind == NotificationKind::Automatic && entry.sent_at.date_naive() == day))
    }
}
