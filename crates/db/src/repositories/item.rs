use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use larder_core::domain::item::{validate_fields, Category, Item, ItemId, ItemStatus};

use super::{ItemPatch, ItemRepository, NewItemRecord, RepositoryError};
use crate::DbPool;

pub struct SqlItemRepository {
    pool: DbPool,
}

impl SqlItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_item(row: &SqliteRow) -> Result<Item, RepositoryError> {
    let last_purchased: Option<String> = row.try_get("last_purchased")?;
    let last_purchased = last_purchased
        .map(|raw| {
            raw.parse::<NaiveDate>().map_err(|error| {
                RepositoryError::Decode(format!("invalid last_purchased `{raw}`: {error}"))
            })
        })
        .transpose()?;

    let created_at: String = row.try_get("created_at")?;
    let created_at = created_at
        .parse::<DateTime<Utc>>()
        .map_err(|error| RepositoryError::Decode(format!("invalid created_at: {error}")))?;

    let status: String = row.try_get("status")?;
    let category: String = row.try_get("category")?;

    Ok(Item {
        id: ItemId(row.try_get("id")?),
        name: row.try_get("name")?,
        category: Category::parse(&category),
        last_purchased,
        duration_days: row.try_get("duration_days")?,
        status: ItemStatus::parse(&status)?,
        created_at,
    })
}

#[async_trait]
impl ItemRepository for SqlItemRepository {
    async fn list_active(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, category, last_purchased, duration_days, status, created_at
             FROM item WHERE status = 'active' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, category, last_purchased, duration_days, status, created_at
             FROM item WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_item).transpose()
    }

    async fn insert(&self, record: NewItemRecord) -> Result<Item, RepositoryError> {
        validate_fields(&record.name, record.duration_days)?;

        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO item (name, category, last_purchased, duration_days, status, created_at)
             VALUES (?, ?, ?, ?, 'active', ?)",
        )
        .bind(record.name.trim())
        .bind(record.category.as_str())
        .bind(record.last_purchased.map(|date| date.to_string()))
        .bind(record.duration_days)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Item {
            id: ItemId(result.last_insert_rowid()),
            name: record.name.trim().to_string(),
            category: record.category,
            last_purchased: record.last_purchased,
            duration_days: record.duration_days,
            status: ItemStatus::Active,
            created_at,
        })
    }

    async fn insert_with_id(&self, item: &Item) -> Result<(), RepositoryError> {
        item.validate()?;

        sqlx::query(
            "INSERT INTO item (id, name, category, last_purchased, duration_days, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(item.id.0)
        .bind(&item.name)
        .bind(item.category.as_str())
        .bind(item.last_purchased.map(|date| date.to_string()))
        .bind(item.duration_days)
        .bind(item.status.as_str())
        .bind(item.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_fields(
        &self,
        id: ItemId,
        patch: ItemPatch,
    ) -> Result<Option<Item>, RepositoryError> {
        if let Some(name) = &patch.name {
            validate_fields(name, patch.duration_days.unwrap_or(1))?;
        } else if let Some(duration) = patch.duration_days {
            validate_fields("placeholder", duration)?;
        }

        let result = sqlx::query(
            "UPDATE item SET
                name = COALESCE(?, name),
                category = COALESCE(?, category),
                last_purchased = COALESCE(?, last_purchased),
                duration_days = COALESCE(?, duration_days)
             WHERE id = ? AND status = 'active'",
        )
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.category.as_ref().map(Category::as_str))
        .bind(patch.last_purchased.map(|date| date.to_string()))
        .bind(patch.duration_days)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn soft_delete(&self, id: ItemId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE item SET status = 'deleted' WHERE id = ? AND status = 'active'")
                .bind(id.0)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn max_id(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COALESCE(MAX(id), 0) AS max_id FROM item")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("max_id")?)
    }
}
