use anyhow::Result;
use sea_orm::sea_query::Order;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{comments, tweets, users, videos};

pub mod migrator;
pub mod queries;
pub mod repositories;

pub use repositories::comment::{CommentWithOwnerRow, CommentWithVideoRow};
pub use repositories::subscription::{SubscriptionUserRow, ToggleOutcome};
pub use repositories::user::{ChannelProfileRow, NewUser, WatchHistoryRow};
pub use repositories::video::{NewVideo, VideoDetailsUpdate, VideoWithOwnerRow};

/// Whether an error chain bottoms out in a unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sea_orm::DbErr>()
        .and_then(sea_orm::DbErr::sql_err)
        .is_some_and(|e| matches!(e, sea_orm::SqlErr::UniqueConstraintViolation(_)))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn video_repo(&self) -> repositories::video::VideoRepository {
        repositories::video::VideoRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    fn tweet_repo(&self) -> repositories::tweet::TweetRepository {
        repositories::tweet::TweetRepository::new(self.conn.clone())
    }

    fn subscription_repo(&self) -> repositories::subscription::SubscriptionRepository {
        repositories::subscription::SubscriptionRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn create_user(&self, input: NewUser) -> Result<users::Model> {
        self.user_repo().create(input).await
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<users::Model>> {
        self.user_repo().get_by_username_or_email(identifier).await
    }

    pub async fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool> {
        self.user_repo()
            .username_or_email_taken(username, email)
            .await
    }

    pub async fn set_refresh_token(&self, user_id: &str, token: Option<String>) -> Result<()> {
        self.user_repo().set_refresh_token(user_id, token).await
    }

    pub async fn set_password_hash(&self, user_id: &str, password_hash: String) -> Result<()> {
        self.user_repo()
            .set_password_hash(user_id, password_hash)
            .await
    }

    pub async fn update_user_account(
        &self,
        user_id: &str,
        full_name: String,
        email: String,
    ) -> Result<users::Model> {
        self.user_repo()
            .update_account(user_id, full_name, email)
            .await
    }

    pub async fn set_user_avatar_url(
        &self,
        user_id: &str,
        url: String,
    ) -> Result<(users::Model, String)> {
        self.user_repo().set_avatar_url(user_id, url).await
    }

    pub async fn set_user_cover_image_url(
        &self,
        user_id: &str,
        url: String,
    ) -> Result<(users::Model, Option<String>)> {
        self.user_repo().set_cover_image_url(user_id, url).await
    }

    pub async fn channel_profile(
        &self,
        username: &str,
        requester_id: Option<&str>,
    ) -> Result<Option<ChannelProfileRow>> {
        self.user_repo()
            .channel_profile(username, requester_id)
            .await
    }

    pub async fn watch_history(&self, user_id: &str) -> Result<Vec<WatchHistoryRow>> {
        self.user_repo().watch_history(user_id).await
    }

    pub async fn append_watch_history(&self, user_id: &str, video_id: &str) -> Result<()> {
        self.user_repo()
            .append_watch_history(user_id, video_id)
            .await
    }

    // ========== Videos ==========

    pub async fn create_video(&self, input: NewVideo) -> Result<videos::Model> {
        self.video_repo().create(input).await
    }

    pub async fn get_video(&self, id: &str) -> Result<Option<videos::Model>> {
        self.video_repo().get(id).await
    }

    pub async fn get_video_with_owner(&self, id: &str) -> Result<Option<VideoWithOwnerRow>> {
        self.video_repo().get_with_owner(id).await
    }

    pub async fn update_video_details(
        &self,
        video: videos::Model,
        update: VideoDetailsUpdate,
    ) -> Result<videos::Model> {
        self.video_repo().update_details(video, update).await
    }

    pub async fn set_video_thumbnail_url(
        &self,
        video: videos::Model,
        url: String,
    ) -> Result<(videos::Model, Option<String>)> {
        self.video_repo().set_thumbnail_url(video, url).await
    }

    pub async fn toggle_video_publish(&self, video: videos::Model) -> Result<videos::Model> {
        self.video_repo().toggle_publish(video).await
    }

    pub async fn delete_video(&self, id: &str) -> Result<bool> {
        self.video_repo().delete(id).await
    }

    pub async fn increment_video_views(&self, id: &str) -> Result<()> {
        self.video_repo().increment_views(id).await
    }

    pub async fn video_feed_page(
        &self,
        channel_id: &str,
        direction: Order,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<videos::Model>, i64)> {
        self.video_repo()
            .feed_page(channel_id, direction, page, limit)
            .await
    }

    // ========== Comments ==========

    pub async fn create_comment(
        &self,
        owner_id: &str,
        video_id: &str,
        content: String,
    ) -> Result<comments::Model> {
        self.comment_repo().create(owner_id, video_id, content).await
    }

    pub async fn get_comment(&self, id: &str) -> Result<Option<comments::Model>> {
        self.comment_repo().get(id).await
    }

    pub async fn update_comment_content(
        &self,
        comment: comments::Model,
        content: String,
    ) -> Result<comments::Model> {
        self.comment_repo().update_content(comment, content).await
    }

    pub async fn delete_comment(&self, id: &str) -> Result<bool> {
        self.comment_repo().delete(id).await
    }

    pub async fn comments_for_video(&self, video_id: &str) -> Result<Vec<CommentWithOwnerRow>> {
        self.comment_repo().for_video(video_id).await
    }

    pub async fn comments_for_user(&self, user_id: &str) -> Result<Vec<CommentWithVideoRow>> {
        self.comment_repo().for_user(user_id).await
    }

    // ========== Tweets ==========

    pub async fn create_tweet(&self, owner_id: &str, content: String) -> Result<tweets::Model> {
        self.tweet_repo().create(owner_id, content).await
    }

    pub async fn get_tweet(&self, id: &str) -> Result<Option<tweets::Model>> {
        self.tweet_repo().get(id).await
    }

    pub async fn update_tweet_content(
        &self,
        tweet: tweets::Model,
        content: String,
    ) -> Result<tweets::Model> {
        self.tweet_repo().update_content(tweet, content).await
    }

    pub async fn delete_tweet(&self, id: &str) -> Result<bool> {
        self.tweet_repo().delete(id).await
    }

    pub async fn tweets_for_owner(&self, owner_id: &str) -> Result<Vec<tweets::Model>> {
        self.tweet_repo().list_for_owner(owner_id).await
    }

    // ========== Subscriptions ==========

    pub async fn toggle_subscription(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<ToggleOutcome> {
        self.subscription_repo()
            .toggle(subscriber_id, channel_id)
            .await
    }

    pub async fn subscribers_of(&self, channel_id: &str) -> Result<Vec<SubscriptionUserRow>> {
        self.subscription_repo().subscribers_of(channel_id).await
    }

    pub async fn subscribed_channels_of(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<SubscriptionUserRow>> {
        self.subscription_repo().channels_of(subscriber_id).await
    }
}
