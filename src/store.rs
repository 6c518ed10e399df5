//! Durable notification store.
//!
//! One row per recipient per event. Broadcast durability is achieved by
//! inserting N copies, never by a one-to-many relation.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{EventType, NewNotification, Notification, UserRole};

/// The two store operations the router depends on: persisting one copy of an
/// event and resolving current role membership. Split out so delivery
/// semantics can be exercised against an in-memory double.
pub trait EventStore: Clone + Send + Sync + 'static {
    fn insert(
        &self,
        recipient_id: Uuid,
        event: &NewNotification,
        delivered: bool,
    ) -> impl Future<Output = AppResult<Notification>> + Send;

    fn user_ids_with_roles(
        &self,
        roles: &[UserRole],
    ) -> impl Future<Output = AppResult<Vec<Uuid>>> + Send;
}

/// Filters for the caller-scoped listing endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub unread_only: Option<bool>,
    pub event_type: Option<String>,
}

impl ListFilter {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// Aggregate statistics over a timeframe window
#[derive(Debug, Clone, Serialize)]
pub struct NotificationStats {
    pub window_days: i64,
    pub total: i64,
    pub read: i64,
    pub delivered: i64,
    pub by_type: Vec<TypeCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeCount {
    pub event_type: String,
    pub count: i64,
}

#[derive(Clone)]
pub struct NotificationStore {
    db: PgPool,
}

impl NotificationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    /// Persist one copy of an event for one recipient.
    pub async fn insert(
        &self,
        recipient_id: Uuid,
        event: &NewNotification,
        delivered: bool,
    ) -> AppResult<Notification> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO notifications (
                id, recipient_id, event_type, title, message, data,
                delivered, is_read, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, false, $8)
            RETURNING id, recipient_id, event_type, title, message, data,
                      delivered, is_read, read_at, created_at
            "#,
        )
        .bind(id)
        .bind(recipient_id)
        .bind(event.event_type.as_str())
        .bind(&event.title)
        .bind(&event.message)
        .bind(&event.data)
        .bind(delivered)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        Ok(Self::row_to_notification(&row))
    }

    /// Paginated listing of a recipient's own records.
    pub async fn list(&self, recipient_id: Uuid, filter: &ListFilter) -> AppResult<Vec<Notification>> {
        let unread_only = filter.unread_only.unwrap_or(false);
        let event_type = filter.event_type.as_deref();

        let rows = sqlx::query(
            r#"
            SELECT id, recipient_id, event_type, title, message, data,
                   delivered, is_read, read_at, created_at
            FROM notifications
            WHERE recipient_id = $1
              AND ($2 = false OR is_read = false)
              AND ($3::text IS NULL OR event_type = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(recipient_id)
        .bind(unread_only)
        .bind(event_type)
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(Self::row_to_notification).collect())
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notifications WHERE recipient_id = $1 AND is_read = false",
        )
        .bind(recipient_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row.get("count"))
    }

    /// Mark one record read. Re-marking is a no-op: the update only matches
    /// unread rows, so `read_at` keeps its first value. Returns NotFound when
    /// the record does not exist or belongs to another recipient.
    pub async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> AppResult<Notification> {
        let updated = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = true, read_at = $1
            WHERE id = $2 AND recipient_id = $3 AND is_read = false
            RETURNING id, recipient_id, event_type, title, message, data,
                      delivered, is_read, read_at, created_at
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = updated {
            return Ok(Self::row_to_notification(&row));
        }

        // Already read, or not ours: re-fetch to tell the two apart
        let existing = sqlx::query(
            r#"
            SELECT id, recipient_id, event_type, title, message, data,
                   delivered, is_read, read_at, created_at
            FROM notifications
            WHERE id = $1 AND recipient_id = $2
            "#,
        )
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(&self.db)
        .await?;

        existing
            .map(|row| Self::row_to_notification(&row))
            .ok_or(AppError::NotFound)
    }

    /// Mark all of a recipient's unread records read. Returns the count.
    pub async fn mark_all_read(&self, recipient_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true, read_at = $1 WHERE recipient_id = $2 AND is_read = false",
        )
        .bind(Utc::now())
        .bind(recipient_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete one of the recipient's own records.
    pub async fn delete(&self, id: Uuid, recipient_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
            .bind(id)
            .bind(recipient_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Aggregate statistics over the trailing window.
    pub async fn stats(&self, window_days: i64) -> AppResult<NotificationStats> {
        let since: DateTime<Utc> = Utc::now() - Duration::days(window_days);

        let totals = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE is_read) AS read,
                   COUNT(*) FILTER (WHERE delivered) AS delivered
            FROM notifications
            WHERE created_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.db)
        .await?;

        let by_type_rows = sqlx::query(
            r#"
            SELECT event_type, COUNT(*) AS count
            FROM notifications
            WHERE created_at >= $1
            GROUP BY event_type
            ORDER BY count DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(NotificationStats {
            window_days,
            total: totals.get("total"),
            read: totals.get("read"),
            delivered: totals.get("delivered"),
            by_type: by_type_rows
                .iter()
                .map(|row| TypeCount {
                    event_type: row.get("event_type"),
                    count: row.get("count"),
                })
                .collect(),
        })
    }

    /// Current members of the given roles in the user store. Role broadcasts
    /// persist per membership, not per liveness.
    pub async fn user_ids_with_roles(&self, roles: &[UserRole]) -> AppResult<Vec<Uuid>> {
        let role_strs: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();

        let rows = sqlx::query(
            "SELECT id FROM users WHERE role = ANY($1) AND is_active = true",
        )
        .bind(&role_strs)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    fn row_to_notification(row: &sqlx::postgres::PgRow) -> Notification {
        let event_type_str: String = row.get("event_type");
        Notification {
            id: row.get("id"),
            recipient_id: row.get("recipient_id"),
            event_type: EventType::parse(&event_type_str),
            title: row.get("title"),
            message: row.get("message"),
            data: row.get("data"),
            delivered: row.get("delivered"),
            is_read: row.get("is_read"),
            read_at: row.get("read_at"),
            created_at: row.get("created_at"),
        }
    }
}

impl EventStore for NotificationStore {
    fn insert(
        &self,
        recipient_id: Uuid,
        event: &NewNotification,
        delivered: bool,
    ) -> impl Future<Output = AppResult<Notification>> + Send {
        NotificationStore::insert(self, recipient_id, event, delivered)
    }

    fn user_ids_with_roles(
        &self,
        roles: &[UserRole],
    ) -> impl Future<Output = AppResult<Vec<Uuid>>> + Send {
        NotificationStore::user_ids_with_roles(self, roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filter_defaults() {
        let filter = ListFilter::default();
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.limit(), 20);
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn test_list_filter_clamps_limit_and_page() {
        let filter = ListFilter {
            page: Some(0),
            limit: Some(1000),
            ..Default::default()
        };
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.limit(), 100);

        let filter = ListFilter {
            page: Some(3),
            limit: Some(25),
            ..Default::default()
        };
        assert_eq!(filter.offset(), 50);
    }
}
