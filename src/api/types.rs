use serde::Serialize;

use crate::db::{
    ChannelProfileRow, CommentWithOwnerRow, CommentWithVideoRow, SubscriptionUserRow,
    VideoWithOwnerRow, WatchHistoryRow,
};
use crate::entities::{comments, tweets, users, videos};

/// The envelope every successful response serializes to.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            data,
            message: message.into(),
            success: true,
        }
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: 201,
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// A user as the API exposes it. Credential columns never leave the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for UserDto {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar_url,
            cover_image: user.cover_image_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub user: UserDto,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairDto {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDto {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub description: Option<String>,
    pub video_file: String,
    pub thumbnail: Option<String>,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<videos::Model> for VideoDto {
    fn from(video: videos::Model) -> Self {
        Self {
            id: video.id,
            owner: video.owner_id,
            title: video.title,
            description: video.description,
            video_file: video.video_url,
            thumbnail: video.thumbnail_url,
            duration: video.duration_seconds,
            views: video.views,
            is_published: video.is_published,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwnerDto {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub avatar: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoWithOwnerDto {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub video_file: String,
    pub thumbnail: Option<String>,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
    pub owner: VideoOwnerDto,
}

impl From<VideoWithOwnerRow> for VideoWithOwnerDto {
    fn from(row: VideoWithOwnerRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            video_file: row.video_url,
            thumbnail: row.thumbnail_url,
            duration: row.duration_seconds,
            views: row.views,
            is_published: row.is_published,
            created_at: row.created_at,
            updated_at: row.updated_at,
            owner: VideoOwnerDto {
                id: row.owner_id,
                username: row.owner_username,
                full_name: row.owner_full_name,
                email: row.owner_email,
                avatar: row.owner_avatar_url,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFeedDto {
    pub items: Vec<VideoDto>,
    pub total_count: i64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDeletionDto {
    pub record_deleted: bool,
    /// Per-asset deletion outcome, video file first, then the thumbnail
    /// if one existed.
    pub media_deleted: Vec<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfileDto {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

impl From<ChannelProfileRow> for ChannelProfileDto {
    fn from(row: ChannelProfileRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            email: row.email,
            avatar: row.avatar_url,
            cover_image: row.cover_image_url,
            subscribers_count: row.subscriber_count,
            channels_subscribed_to_count: row.subscribed_to_count,
            is_subscribed: row.is_subscribed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryOwnerDto {
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryItemDto {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub video_file: String,
    pub thumbnail: Option<String>,
    pub duration: f64,
    pub views: i64,
    pub watched_at: String,
    pub owner: WatchHistoryOwnerDto,
}

impl From<WatchHistoryRow> for WatchHistoryItemDto {
    fn from(row: WatchHistoryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            video_file: row.video_url,
            thumbnail: row.thumbnail_url,
            duration: row.duration_seconds,
            views: row.views,
            watched_at: row.watched_at,
            owner: WatchHistoryOwnerDto {
                full_name: row.owner_full_name,
                username: row.owner_username,
                avatar: row.owner_avatar_url,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: String,
    pub video: String,
    pub owner: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<comments::Model> for CommentDto {
    fn from(comment: comments::Model) -> Self {
        Self {
            id: comment.id,
            video: comment.video_id,
            owner: comment.owner_id,
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentOwnerDto {
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithOwnerDto {
    pub id: String,
    pub video: String,
    pub content: String,
    pub created_at: String,
    pub owner: CommentOwnerDto,
}

impl From<CommentWithOwnerRow> for CommentWithOwnerDto {
    fn from(row: CommentWithOwnerRow) -> Self {
        Self {
            id: row.id,
            video: row.video_id,
            content: row.content,
            created_at: row.created_at,
            owner: CommentOwnerDto {
                username: row.owner_username,
                full_name: row.owner_full_name,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentVideoDto {
    pub title: String,
    pub duration: f64,
    pub views: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithVideoDto {
    pub id: String,
    pub video_id: String,
    pub content: String,
    pub created_at: String,
    pub video: CommentVideoDto,
}

impl From<CommentWithVideoRow> for CommentWithVideoDto {
    fn from(row: CommentWithVideoRow) -> Self {
        Self {
            id: row.id,
            video_id: row.video_id,
            content: row.content,
            created_at: row.created_at,
            video: CommentVideoDto {
                title: row.video_title,
                duration: row.video_duration_seconds,
                views: row.video_views,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetDto {
    pub id: String,
    pub owner: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<tweets::Model> for TweetDto {
    fn from(tweet: tweets::Model) -> Self {
        Self {
            id: tweet.id,
            owner: tweet.owner_id,
            content: tweet.content,
            created_at: tweet.created_at,
            updated_at: tweet.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUserDto {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
    pub subscribed_at: String,
}

impl From<SubscriptionUserRow> for SubscriptionUserDto {
    fn from(row: SubscriptionUserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            avatar: row.avatar_url,
            subscribed_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionToggleDto {
    pub subscribed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub status: String,
    pub database: String,
}
