use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::tweets;

pub struct TweetRepository {
    conn: DatabaseConnection,
}

impl TweetRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, owner_id: &str, content: String) -> Result<tweets::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = tweets::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            owner_id: Set(owner_id.to_string()),
            content: Set(content),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        model
            .insert(&self.conn)
            .await
            .context("Failed to insert tweet")
    }

    pub async fn get(&self, id: &str) -> Result<Option<tweets::Model>> {
        tweets::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query tweet by id")
    }

    pub async fn update_content(
        &self,
        tweet: tweets::Model,
        content: String,
    ) -> Result<tweets::Model> {
        let mut active: tweets::ActiveModel = tweet.into();
        active.content = Set(content);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(active.update(&self.conn).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = tweets::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete tweet")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<tweets::Model>> {
        tweets::Entity::find()
            .filter(tweets::Column::OwnerId.eq(owner_id))
            .order_by_asc(tweets::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list tweets for owner")
    }
}
