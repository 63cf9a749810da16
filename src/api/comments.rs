use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{
    ApiError, ApiResponse, AppState, CommentDto, CommentWithOwnerDto, CommentWithVideoDto,
    validation,
};

#[derive(Deserialize)]
pub struct CommentBody {
    pub content: String,
}

/// `POST /videos/{id}/comments`
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(video_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let content = validation::validate_content(&body.content)?;

    let video = state
        .store
        .get_video(&video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video", &video_id))?;

    let comment = state
        .store
        .create_comment(&user.id, &video.id, content.to_string())
        .await?;

    Ok(Json(ApiResponse::ok(
        CommentDto::from(comment),
        "Comment added successfully",
    )))
}

/// `GET /videos/{id}/comments`: comments with each commenter's identity.
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.store.comments_for_video(&video_id).await?;
    let items: Vec<CommentWithOwnerDto> = rows.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::ok(
        items,
        "Comments fetched successfully",
    )))
}

/// `GET /comments/mine`: the caller's comments with video context.
pub async fn my_comments(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.store.comments_for_user(&user.id).await?;
    let items: Vec<CommentWithVideoDto> = rows.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::ok(
        items,
        "Comments fetched successfully",
    )))
}

/// `PATCH /comments/{id}`, author only.
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let content = validation::validate_content(&body.content)?;

    let comment = state
        .store
        .get_comment(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", &id))?;

    if comment.owner_id != user.id {
        return Err(ApiError::forbidden("Only the author can edit this comment"));
    }

    let updated = state
        .store
        .update_comment_content(comment, content.to_string())
        .await?;

    Ok(Json(ApiResponse::ok(
        CommentDto::from(updated),
        "Comment updated successfully",
    )))
}

/// `DELETE /comments/{id}`, author only.
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .store
        .get_comment(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", &id))?;

    if comment.owner_id != user.id {
        return Err(ApiError::forbidden(
            "Only the author can delete this comment",
        ));
    }

    state.store.delete_comment(&id).await?;

    Ok(Json(ApiResponse::ok(
        serde_json::json!({}),
        "Comment deleted successfully",
    )))
}
