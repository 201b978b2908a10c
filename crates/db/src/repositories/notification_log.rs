use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;

use larder_core::domain::notification::NotificationLogEntry;

use super::{NotificationLogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNotificationLogRepository {
    pool: DbPool,
}

impl SqlNotificationLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLogRepository for SqlNotificationLogRepository {
    async fn append(&self, entry: &NotificationLogEntry) -> Result<(), RepositoryError> {
        let recipients = serde_json::to_string(&entry.recipients)
            .map_err(|error| RepositoryError::Decode(format!("encode recipients: {error}")))?;

        sqlx::query(
            "INSERT INTO notification_log (sent_at, kind, channel, recipients, body)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.sent_at.to_rfc3339())
        .bind(entry.kind.as_str())
        .bind(entry.channel.as_str())
        .bind(recipients)
        .bind(&entry.body)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn automatic_sent_on(&self, day: NaiveDate) -> Result<bool, RepositoryError> {
        // sent_at is RFC 3339, so the calendar day is a string prefix.
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notification_log
             WHERE kind = 'automatic' AND sent_at LIKE ? || '%'",
        )
        .bind(day.to_string())
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }
}
