use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use larder_core::domain::item::{Category, Item, ItemId};
use larder_core::domain::notification::NotificationLogEntry;
use larder_core::errors::DomainError;

pub mod item;
pub mod memory;
pub mod notification_log;

pub use item::SqlItemRepository;
pub use memory::{InMemoryItemRepository, InMemoryNotificationLogRepository};
pub use notification_log::SqlNotificationLogRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Input for a direct item creation. Validated at the write boundary before
/// any row is touched.
#[derive(Clone, Debug, PartialEq)]
pub struct NewItemRecord {
    pub name: String,
    pub category: Category,
    pub last_purchased: Option<NaiveDate>,
    pub duration_days: i64,
}

/// Partial update; absent fields keep their stored values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub last_purchased: Option<NaiveDate>,
    pub duration_days: Option<i64>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.last_purchased.is_none()
            && self.duration_days.is_none()
    }
}

#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Active items only; soft-deleted rows never surface here.
    async fn list_active(&self) -> Result<Vec<Item>, RepositoryError>;

    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, RepositoryError>;

    /// Inserts a new item, returning it with the storage-assigned id.
    async fn insert(&self, record: NewItemRecord) -> Result<Item, RepositoryError>;

    /// Inserts an item whose id was pre-issued during reconciliation.
    async fn insert_with_id(&self, item: &Item) -> Result<(), RepositoryError>;

    /// Applies a partial update; returns the stored item, or `None` when no
    /// active item has this id.
    async fn update_fields(
        &self,
        id: ItemId,
        patch: ItemPatch,
    ) -> Result<Option<Item>, RepositoryError>;

    /// Transitions the item to deleted. Returns whether a row changed.
    async fn soft_delete(&self, id: ItemId) -> Result<bool, RepositoryError>;

    /// Highest id ever assigned, deleted rows included; 0 for an empty table.
    async fn max_id(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait NotificationLogRepository: Send + Sync {
    async fn append(&self, entry: &NotificationLogEntry) -> Result<(), RepositoryError>;

    /// Whether an automatic reminder was already recorded on the given
    /// calendar day. Used to deduplicate concurrent or repeated daily sends.
    async fn automatic_sent_on(&self, day: NaiveDate) -> Result<bool, RepositoryError>;
}
