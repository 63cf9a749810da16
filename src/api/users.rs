use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{
    ApiError, ApiResponse, AppState, ChannelProfileDto, UserDto, WatchHistoryItemDto, validation,
};
use crate::media::{ResourceType, StagedFile, extract_asset_id};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: String,
    pub email: String,
}

/// `GET /users/me`
pub async fn current_user(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> impl IntoResponse {
    Json(ApiResponse::ok(
        UserDto::from(user),
        "Current user fetched successfully",
    ))
}

/// `PATCH /users/me`: updates the mutable profile fields.
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::require_fields(&[("fullName", &body.full_name), ("email", &body.email)])?;
    validation::validate_email(&body.email)?;

    let updated = state
        .store
        .update_user_account(
            &user.id,
            body.full_name.trim().to_string(),
            body.email.trim().to_string(),
        )
        .await?;

    Ok(Json(ApiResponse::ok(
        UserDto::from(updated),
        "Account details updated successfully",
    )))
}

/// Pull the first file field out of a single-file multipart form.
async fn read_file_field(
    state: &AppState,
    mut multipart: Multipart,
    field_name: &str,
) -> Result<StagedFile, ApiError> {
    let staging_dir = PathBuf::from(&state.config.media.staging_path);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let original_name = field.file_name().map(ToString::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(e.to_string()))?;
        return Ok(StagedFile::create(&staging_dir, original_name.as_deref(), &bytes).await?);
    }

    Err(ApiError::validation(format!(
        "{} file is required",
        field_name
    )))
}

/// `PATCH /users/me/avatar` (multipart): replaces the avatar. The previous
/// asset is deleted best-effort after the record update.
pub async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let staged = read_file_field(&state, multipart, "avatar").await?;

    let asset = state
        .media
        .upload(staged.path())
        .await
        .ok_or_else(|| ApiError::internal("Avatar upload failed"))?;

    let (updated, old_url) = state.store.set_user_avatar_url(&user.id, asset.url).await?;

    if let Some(asset_id) = extract_asset_id(&old_url) {
        state.media.delete(&asset_id, ResourceType::Image).await;
    }

    Ok(Json(ApiResponse::ok(
        UserDto::from(updated),
        "Avatar updated successfully",
    )))
}

/// `PATCH /users/me/cover-image` (multipart)
pub async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let staged = read_file_field(&state, multipart, "coverImage").await?;

    let asset = state
        .media
        .upload(staged.path())
        .await
        .ok_or_else(|| ApiError::internal("Cover image upload failed"))?;

    let (updated, old_url) = state
        .store
        .set_user_cover_image_url(&user.id, asset.url)
        .await?;

    if let Some(asset_id) = old_url.as_deref().and_then(extract_asset_id) {
        state.media.delete(&asset_id, ResourceType::Image).await;
    }

    Ok(Json(ApiResponse::ok(
        UserDto::from(updated),
        "Cover image updated successfully",
    )))
}

/// `GET /users/channel/{username}`: the channel profile with subscriber
/// counts and whether the requester is subscribed.
pub async fn channel_profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(requester)): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::validation("username is required"));
    }

    let profile = state
        .store
        .channel_profile(&username, Some(&requester.id))
        .await?
        .ok_or_else(|| ApiError::not_found("Channel", &username))?;

    Ok(Json(ApiResponse::ok(
        ChannelProfileDto::from(profile),
        "Channel profile fetched successfully",
    )))
}

/// `GET /users/history`: watched videos in watch order, oldest first.
pub async fn watch_history(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.store.watch_history(&user.id).await?;
    let items: Vec<WatchHistoryItemDto> = rows.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::ok(
        items,
        "Watch history fetched successfully",
    )))
}
