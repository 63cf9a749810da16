use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, Set, SqlErr,
};
use uuid::Uuid;

use crate::db::queries;
use crate::entities::subscriptions;

/// Result of a subscription toggle.
#[derive(Debug, Clone)]
pub enum ToggleOutcome {
    Subscribed(subscriptions::Model),
    Unsubscribed,
}

/// Public identity of the user on the far side of a subscription edge.
#[derive(Debug, Clone, FromQueryResult)]
pub struct SubscriptionUserRow {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar_url: String,
    pub created_at: String,
}

pub struct SubscriptionRepository {
    conn: DatabaseConnection,
}

impl SubscriptionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Check-then-act with the unique (subscriber, channel) index as the
    /// backstop: losing the insert race means another toggle just
    /// subscribed this pair, so the violation converts into a delete
    /// instead of surfacing a conflict.
    pub async fn toggle(&self, subscriber_id: &str, channel_id: &str) -> Result<ToggleOutcome> {
        if self.exists(subscriber_id, channel_id).await? {
            self.delete_pair(subscriber_id, channel_id).await?;
            return Ok(ToggleOutcome::Unsubscribed);
        }

        self.insert_pair(subscriber_id, channel_id).await
    }

    async fn insert_pair(&self, subscriber_id: &str, channel_id: &str) -> Result<ToggleOutcome> {
        let model = subscriptions::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            subscriber_id: Set(subscriber_id.to_string()),
            channel_id: Set(channel_id.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        match model.insert(&self.conn).await {
            Ok(created) => Ok(ToggleOutcome::Subscribed(created)),
            Err(err)
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
            {
                self.delete_pair(subscriber_id, channel_id).await?;
                Ok(ToggleOutcome::Unsubscribed)
            }
            Err(err) => Err(err).context("Failed to insert subscription"),
        }
    }

    pub async fn exists(&self, subscriber_id: &str, channel_id: &str) -> Result<bool> {
        let found = subscriptions::Entity::find()
            .filter(subscriptions::Column::SubscriberId.eq(subscriber_id))
            .filter(subscriptions::Column::ChannelId.eq(channel_id))
            .one(&self.conn)
            .await
            .context("Failed to query subscription pair")?;

        Ok(found.is_some())
    }

    async fn delete_pair(&self, subscriber_id: &str, channel_id: &str) -> Result<()> {
        subscriptions::Entity::delete_many()
            .filter(subscriptions::Column::SubscriberId.eq(subscriber_id))
            .filter(subscriptions::Column::ChannelId.eq(channel_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete subscription pair")?;

        Ok(())
    }

    pub async fn subscribers_of(&self, channel_id: &str) -> Result<Vec<SubscriptionUserRow>> {
        let stmt = self
            .conn
            .get_database_backend()
            .build(&queries::subscribers_of(channel_id));

        SubscriptionUserRow::find_by_statement(stmt)
            .all(&self.conn)
            .await
            .context("Failed to list subscribers")
    }

    pub async fn channels_of(&self, subscriber_id: &str) -> Result<Vec<SubscriptionUserRow>> {
        let stmt = self
            .conn
            .get_database_backend()
            .build(&queries::channels_of(subscriber_id));

        SubscriptionUserRow::find_by_statement(stmt)
            .all(&self.conn)
            .await
            .context("Failed to list subscribed channels")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::entities::users;

    async fn seed_user(conn: &DatabaseConnection, id: &str) {
        let now = chrono::Utc::now().to_rfc3339();
        users::ActiveModel {
            id: Set(id.to_string()),
            username: Set(id.to_string()),
            email: Set(format!("{id}@example.com")),
            full_name: Set(id.to_string()),
            password_hash: Set(String::new()),
            avatar_url: Set(String::new()),
            cover_image_url: Set(None),
            refresh_token: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        }
        .insert(conn)
        .await
        .unwrap();
    }

    async fn repo() -> SubscriptionRepository {
        let store = Store::new("sqlite::memory:").await.unwrap();
        seed_user(&store.conn, "u-1").await;
        seed_user(&store.conn, "ch-1").await;
        SubscriptionRepository::new(store.conn)
    }

    #[tokio::test]
    async fn losing_the_insert_race_converts_to_unsubscribe() {
        let repo = repo().await;

        // The pair lands before our insert, as if a concurrent toggle won
        // the race between this one's existence check and its insert.
        let _ = repo.insert_pair("u-1", "ch-1").await.unwrap();

        let outcome = repo.insert_pair("u-1", "ch-1").await.unwrap();
        assert!(matches!(outcome, ToggleOutcome::Unsubscribed));
        assert!(!repo.exists("u-1", "ch-1").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_toggles_leave_at_most_one_row() {
        // Single connection keeps SQLite happy while the tasks still
        // interleave between the existence check and the insert.
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        seed_user(&store.conn, "u-1").await;
        seed_user(&store.conn, "ch-1").await;
        let repo = std::sync::Arc::new(SubscriptionRepository::new(store.conn));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.toggle("u-1", "ch-1").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let rows = subscriptions::Entity::find()
            .filter(subscriptions::Column::SubscriberId.eq("u-1"))
            .filter(subscriptions::Column::ChannelId.eq("ch-1"))
            .all(&repo.conn)
            .await
            .unwrap();
        assert!(rows.len() <= 1, "duplicate subscription rows: {}", rows.len());
    }
}
