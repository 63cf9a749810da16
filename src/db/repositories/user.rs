use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, Set,
};
use uuid::Uuid;

use crate::db::queries;
use crate::entities::{users, watch_history};

/// Input for a user insert; the password arrives pre-hashed.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

/// Channel profile view produced by the subscription-count join query.
#[derive(Debug, Clone, FromQueryResult)]
pub struct ChannelProfileRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub subscriber_count: i64,
    pub subscribed_to_count: i64,
    pub is_subscribed: bool,
}

/// One watched video with its flattened owner sub-shape.
#[derive(Debug, Clone, FromQueryResult)]
pub struct WatchHistoryRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: f64,
    pub views: i64,
    pub watched_at: String,
    pub owner_full_name: String,
    pub owner_username: String,
    pub owner_avatar_url: String,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a new user; username is normalized to lowercase here so the
    /// unique index always sees one casing.
    pub async fn create(&self, input: NewUser) -> Result<users::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = users::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            username: Set(input.username.to_lowercase()),
            email: Set(input.email),
            full_name: Set(input.full_name),
            password_hash: Set(input.password_hash),
            avatar_url: Set(input.avatar_url),
            cover_image_url: Set(input.cover_image_url),
            refresh_token: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        model.insert(&self.conn).await.context("Failed to insert user")
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<users::Model>> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")
    }

    /// Login lookup: the identifier may be a username or an email.
    pub async fn get_by_username_or_email(&self, identifier: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(
                users::Column::Username
                    .eq(identifier.to_lowercase())
                    .or(users::Column::Email.eq(identifier)),
            )
            .one(&self.conn)
            .await
            .context("Failed to query user by username or email")
    }

    /// Pre-insert uniqueness probe; the unique indexes remain the backstop.
    pub async fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool> {
        let existing = users::Entity::find()
            .filter(
                users::Column::Username
                    .eq(username.to_lowercase())
                    .or(users::Column::Email.eq(email)),
            )
            .one(&self.conn)
            .await
            .context("Failed to check username/email uniqueness")?;

        Ok(existing.is_some())
    }

    /// Persist (or clear) the single active refresh token.
    pub async fn set_refresh_token(&self, user_id: &str, token: Option<String>) -> Result<()> {
        let user = self.require(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.refresh_token = Set(token);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn set_password_hash(&self, user_id: &str, password_hash: String) -> Result<()> {
        let user = self.require(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn update_account(
        &self,
        user_id: &str,
        full_name: String,
        email: String,
    ) -> Result<users::Model> {
        let user = self.require(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.full_name = Set(full_name);
        active.email = Set(email);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(active.update(&self.conn).await?)
    }

    /// Swap the avatar URL, returning the updated row and the replaced URL
    /// so the caller can clean up the old asset best-effort.
    pub async fn set_avatar_url(&self, user_id: &str, url: String) -> Result<(users::Model, String)> {
        let user = self.require(user_id).await?;
        let old_url = user.avatar_url.clone();

        let mut active: users::ActiveModel = user.into();
        active.avatar_url = Set(url);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok((active.update(&self.conn).await?, old_url))
    }

    pub async fn set_cover_image_url(
        &self,
        user_id: &str,
        url: String,
    ) -> Result<(users::Model, Option<String>)> {
        let user = self.require(user_id).await?;
        let old_url = user.cover_image_url.clone();

        let mut active: users::ActiveModel = user.into();
        active.cover_image_url = Set(Some(url));
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok((active.update(&self.conn).await?, old_url))
    }

    pub async fn channel_profile(
        &self,
        username: &str,
        requester_id: Option<&str>,
    ) -> Result<Option<ChannelProfileRow>> {
        let stmt = self
            .conn
            .get_database_backend()
            .build(&queries::channel_profile(&username.to_lowercase(), requester_id));

        ChannelProfileRow::find_by_statement(stmt)
            .one(&self.conn)
            .await
            .context("Failed to run channel profile query")
    }

    pub async fn watch_history(&self, user_id: &str) -> Result<Vec<WatchHistoryRow>> {
        let stmt = self
            .conn
            .get_database_backend()
            .build(&queries::watch_history(user_id));

        WatchHistoryRow::find_by_statement(stmt)
            .all(&self.conn)
            .await
            .context("Failed to run watch history query")
    }

    pub async fn append_watch_history(&self, user_id: &str, video_id: &str) -> Result<()> {
        let entry = watch_history::ActiveModel {
            user_id: Set(user_id.to_string()),
            video_id: Set(video_id.to_string()),
            watched_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        entry
            .insert(&self.conn)
            .await
            .context("Failed to append watch history")?;

        Ok(())
    }

    async fn require(&self, user_id: &str) -> Result<users::Model> {
        self.get_by_id(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))
    }
}
