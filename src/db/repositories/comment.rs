use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult, Set,
};
use uuid::Uuid;

use crate::db::queries;
use crate::entities::comments;

/// Comment joined with the commenter's public identity.
#[derive(Debug, Clone, FromQueryResult)]
pub struct CommentWithOwnerRow {
    pub id: String,
    pub video_id: String,
    pub content: String,
    pub created_at: String,
    pub owner_username: String,
    pub owner_full_name: String,
}

/// Comment joined with a minimal view of its video.
#[derive(Debug, Clone, FromQueryResult)]
pub struct CommentWithVideoRow {
    pub id: String,
    pub video_id: String,
    pub content: String,
    pub created_at: String,
    pub video_title: String,
    pub video_duration_seconds: f64,
    pub video_views: i64,
}

pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        owner_id: &str,
        video_id: &str,
        content: String,
    ) -> Result<comments::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = comments::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            owner_id: Set(owner_id.to_string()),
            video_id: Set(video_id.to_string()),
            content: Set(content),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        model
            .insert(&self.conn)
            .await
            .context("Failed to insert comment")
    }

    pub async fn get(&self, id: &str) -> Result<Option<comments::Model>> {
        comments::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query comment by id")
    }

    pub async fn update_content(
        &self,
        comment: comments::Model,
        content: String,
    ) -> Result<comments::Model> {
        let mut active: comments::ActiveModel = comment.into();
        active.content = Set(content);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(active.update(&self.conn).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = comments::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete comment")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn for_video(&self, video_id: &str) -> Result<Vec<CommentWithOwnerRow>> {
        let stmt = self
            .conn
            .get_database_backend()
            .build(&queries::comments_for_video(video_id));

        CommentWithOwnerRow::find_by_statement(stmt)
            .all(&self.conn)
            .await
            .context("Failed to run comments-for-video query")
    }

    pub async fn for_user(&self, user_id: &str) -> Result<Vec<CommentWithVideoRow>> {
        let stmt = self
            .conn
            .get_database_backend()
            .build(&queries::comments_for_user(user_id));

        CommentWithVideoRow::find_by_statement(stmt)
            .all(&self.conn)
            .await
            .context("Failed to run comments-for-user query")
    }
}
