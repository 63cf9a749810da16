use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Order};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, Set,
};
use uuid::Uuid;

use crate::db::queries;
use crate::entities::videos;

#[derive(Debug)]
pub struct NewVideo {
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: f64,
    pub is_published: bool,
}

#[derive(Debug, Default)]
pub struct VideoDetailsUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_published: Option<bool>,
}

/// Video row with the owner's public identity flattened in.
#[derive(Debug, Clone, FromQueryResult)]
pub struct VideoWithOwnerRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
    pub owner_id: String,
    pub owner_full_name: String,
    pub owner_username: String,
    pub owner_email: String,
    pub owner_avatar_url: String,
}

#[derive(Debug, Clone, FromQueryResult)]
struct CountRow {
    total: i64,
}

pub struct VideoRepository {
    conn: DatabaseConnection,
}

impl VideoRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, input: NewVideo) -> Result<videos::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = videos::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            owner_id: Set(input.owner_id),
            title: Set(input.title),
            description: Set(input.description),
            video_url: Set(input.video_url),
            thumbnail_url: Set(input.thumbnail_url),
            duration_seconds: Set(input.duration_seconds),
            views: Set(0),
            is_published: Set(input.is_published),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        model
            .insert(&self.conn)
            .await
            .context("Failed to insert video")
    }

    pub async fn get(&self, id: &str) -> Result<Option<videos::Model>> {
        videos::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query video by id")
    }

    pub async fn get_with_owner(&self, id: &str) -> Result<Option<VideoWithOwnerRow>> {
        let stmt = self
            .conn
            .get_database_backend()
            .build(&queries::video_with_owner(id));

        VideoWithOwnerRow::find_by_statement(stmt)
            .one(&self.conn)
            .await
            .context("Failed to run video-with-owner query")
    }

    pub async fn update_details(
        &self,
        video: videos::Model,
        update: VideoDetailsUpdate,
    ) -> Result<videos::Model> {
        let mut active: videos::ActiveModel = video.into();

        if let Some(title) = update.title {
            active.title = Set(title);
        }
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }
        if let Some(is_published) = update.is_published {
            active.is_published = Set(is_published);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(active.update(&self.conn).await?)
    }

    /// Swap the thumbnail, returning the updated row and the replaced URL.
    pub async fn set_thumbnail_url(
        &self,
        video: videos::Model,
        url: String,
    ) -> Result<(videos::Model, Option<String>)> {
        let old_url = video.thumbnail_url.clone();

        let mut active: videos::ActiveModel = video.into();
        active.thumbnail_url = Set(Some(url));
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok((active.update(&self.conn).await?, old_url))
    }

    pub async fn toggle_publish(&self, video: videos::Model) -> Result<videos::Model> {
        let flipped = !video.is_published;

        let mut active: videos::ActiveModel = video.into();
        active.is_published = Set(flipped);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(active.update(&self.conn).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = videos::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete video")?;

        Ok(result.rows_affected > 0)
    }

    /// Atomic single-statement increment; the counter never goes backwards.
    pub async fn increment_views(&self, id: &str) -> Result<()> {
        videos::Entity::update_many()
            .col_expr(
                videos::Column::Views,
                Expr::col(videos::Column::Views).add(1),
            )
            .filter(videos::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to increment view count")?;

        Ok(())
    }

    pub async fn feed_page(
        &self,
        channel_id: &str,
        direction: Order,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<videos::Model>, i64)> {
        let backend = self.conn.get_database_backend();

        let items_stmt = backend.build(&queries::video_feed(channel_id, direction, page, limit));
        let items = videos::Model::find_by_statement(items_stmt)
            .all(&self.conn)
            .await
            .context("Failed to run video feed query")?;

        let count_stmt = backend.build(&queries::video_feed_count(channel_id));
        let total = CountRow::find_by_statement(count_stmt)
            .one(&self.conn)
            .await
            .context("Failed to count video feed")?
            .map_or(0, |row| row.total);

        Ok((items, total))
    }
}
