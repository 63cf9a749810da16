use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{
    ApiError, ApiResponse, AppState, VideoDeletionDto, VideoDto, VideoFeedDto, VideoWithOwnerDto,
    validation,
};
use crate::db::{NewVideo, VideoDetailsUpdate};
use crate::entities::videos;
use crate::media::{ResourceType, StagedFile, extract_asset_id};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub channel_id: String,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default = "default_sort")]
    pub sort_by: String,
}

const fn default_page() -> u64 {
    1
}

const fn default_limit() -> u64 {
    10
}

fn default_sort() -> String {
    "desc".to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVideoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_published: Option<bool>,
}

fn require_owner(video: &videos::Model, user_id: &str) -> Result<(), ApiError> {
    if video.owner_id != user_id {
        return Err(ApiError::forbidden(
            "Only the owner can modify this video",
        ));
    }
    Ok(())
}

struct UploadForm {
    title: String,
    description: Option<String>,
    video_file: Option<StagedFile>,
    thumbnail: Option<StagedFile>,
}

async fn read_upload_form(
    staging_dir: &std::path::Path,
    mut multipart: Multipart,
) -> Result<UploadForm, ApiError> {
    let mut title = String::new();
    let mut description = None;
    let mut video_file = None;
    let mut thumbnail = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        match name.as_str() {
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
            }
            "description" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
                if !text.trim().is_empty() {
                    description = Some(text);
                }
            }
            "videoFile" | "thumbnail" => {
                let original_name = field.file_name().map(ToString::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
                let staged =
                    StagedFile::create(staging_dir, original_name.as_deref(), &bytes).await?;
                if name == "videoFile" {
                    video_file = Some(staged);
                } else {
                    thumbnail = Some(staged);
                }
            }
            _ => {}
        }
    }

    Ok(UploadForm {
        title,
        description,
        video_file,
        thumbnail,
    })
}

/// `POST /videos` (multipart): publishes a video. The record is inserted
/// only after the media host confirms the video upload; its duration comes
/// from the uploaded asset.
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let staging_dir = PathBuf::from(&state.config.media.staging_path);
    let form = read_upload_form(&staging_dir, multipart).await?;

    validation::require_fields(&[("title", &form.title)])?;

    let video_file = form
        .video_file
        .as_ref()
        .ok_or_else(|| ApiError::validation("videoFile is required"))?;

    let video_asset = state
        .media
        .upload(video_file.path())
        .await
        .ok_or_else(|| ApiError::internal("Video upload failed"))?;

    let thumbnail_url = match &form.thumbnail {
        Some(staged) => state.media.upload(staged.path()).await.map(|a| a.url),
        None => None,
    };

    let video = state
        .store
        .create_video(NewVideo {
            owner_id: user.id,
            title: form.title.trim().to_string(),
            description: form.description,
            video_url: video_asset.url,
            thumbnail_url,
            duration_seconds: video_asset.duration_seconds.unwrap_or(0.0),
            is_published: true,
        })
        .await?;

    tracing::info!(video_id = %video.id, "Video published");

    Ok(Json(ApiResponse::ok(
        VideoDto::from(video),
        "Video published successfully",
    )))
}

/// `GET /videos/{id}`: the video with its owner's public identity.
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .store
        .get_video_with_owner(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video", &id))?;

    Ok(Json(ApiResponse::ok(
        VideoWithOwnerDto::from(row),
        "Video fetched successfully",
    )))
}

/// `PATCH /videos/{id}`: partial details update, owner only.
pub async fn update_video(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateVideoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(title) = body.title.as_deref() {
        validation::validate_content(title)?;
    }

    let video = state
        .store
        .get_video(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video", &id))?;
    require_owner(&video, &user.id)?;

    let updated = state
        .store
        .update_video_details(
            video,
            VideoDetailsUpdate {
                title: body.title.map(|t| t.trim().to_string()),
                description: body.description,
                is_published: body.is_published,
            },
        )
        .await?;

    Ok(Json(ApiResponse::ok(
        VideoDto::from(updated),
        "Video details updated successfully",
    )))
}

/// `PATCH /videos/{id}/thumbnail` (multipart), owner only. The replaced
/// asset is deleted best-effort.
pub async fn update_thumbnail(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let video = state
        .store
        .get_video(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video", &id))?;
    require_owner(&video, &user.id)?;

    let staging_dir = PathBuf::from(&state.config.media.staging_path);
    let mut staged = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("thumbnail") {
            let original_name = field.file_name().map(ToString::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(e.to_string()))?;
            staged = Some(StagedFile::create(&staging_dir, original_name.as_deref(), &bytes).await?);
        }
    }
    let staged = staged.ok_or_else(|| ApiError::validation("thumbnail file is required"))?;

    let asset = state
        .media
        .upload(staged.path())
        .await
        .ok_or_else(|| ApiError::internal("Thumbnail upload failed"))?;

    let (updated, old_url) = state.store.set_video_thumbnail_url(video, asset.url).await?;

    if let Some(asset_id) = old_url.as_deref().and_then(extract_asset_id) {
        state.media.delete(&asset_id, ResourceType::Image).await;
    }

    Ok(Json(ApiResponse::ok(
        VideoDto::from(updated),
        "Thumbnail updated successfully",
    )))
}

/// `POST /videos/{id}/toggle-publish`, owner only.
pub async fn toggle_publish(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let video = state
        .store
        .get_video(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video", &id))?;
    require_owner(&video, &user.id)?;

    let updated = state.store.toggle_video_publish(video).await?;

    Ok(Json(ApiResponse::ok(
        VideoDto::from(updated),
        "Publish status toggled successfully",
    )))
}

/// `DELETE /videos/{id}`: the ownership check happens before anything is
/// removed, and the database record goes first so a media failure can
/// never leave a record pointing at deleted assets.
pub async fn delete_video(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let video = state
        .store
        .get_video(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video", &id))?;
    require_owner(&video, &user.id)?;

    let record_deleted = state.store.delete_video(&id).await?;
    if !record_deleted {
        return Err(ApiError::not_found("Video", &id));
    }

    let mut media_deleted = Vec::new();
    if let Some(asset_id) = extract_asset_id(&video.video_url) {
        media_deleted.push(state.media.delete(&asset_id, ResourceType::Video).await);
    }
    if let Some(asset_id) = video.thumbnail_url.as_deref().and_then(extract_asset_id) {
        media_deleted.push(state.media.delete(&asset_id, ResourceType::Image).await);
    }

    tracing::info!(video_id = %id, ?media_deleted, "Video deleted");

    Ok(Json(ApiResponse::ok(
        VideoDeletionDto {
            record_deleted,
            media_deleted,
        },
        "Video deleted successfully",
    )))
}

/// `GET /videos`: a channel's paginated feed ordered by last update.
pub async fn video_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    validation::require_fields(&[("channelId", &query.channel_id)])?;
    let page = validation::validate_page(query.page)?;
    let limit = validation::validate_limit(query.limit)?;
    let direction = validation::parse_sort_direction(&query.sort_by)?;

    let (items, total_count) = state
        .store
        .video_feed_page(&query.channel_id, direction, page, limit)
        .await?;

    Ok(Json(ApiResponse::ok(
        VideoFeedDto {
            items: items.into_iter().map(Into::into).collect(),
            total_count,
            page,
            limit,
        },
        "Videos fetched successfully",
    )))
}

/// `POST /videos/{id}/view`: bumps the view counter and appends the video
/// to the viewer's watch history.
pub async fn record_view(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let video = state
        .store
        .get_video(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video", &id))?;

    state.store.increment_video_views(&video.id).await?;
    state.store.append_watch_history(&user.id, &video.id).await?;

    Ok(Json(ApiResponse::ok(
        serde_json::json!({}),
        "View recorded",
    )))
}
