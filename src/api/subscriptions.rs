use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, SubscriptionToggleDto, SubscriptionUserDto};
use crate::db::ToggleOutcome;

/// `POST /subscriptions/{channel_id}/toggle`: subscribe if not subscribed,
/// unsubscribe otherwise. Subscribing to yourself is rejected.
pub async fn toggle_subscription(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(channel_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if channel_id == user.id {
        return Err(ApiError::validation("Cannot subscribe to your own channel"));
    }

    let channel = state
        .store
        .get_user(&channel_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Channel", &channel_id))?;

    let outcome = state.store.toggle_subscription(&user.id, &channel.id).await?;

    let (subscribed, message) = match outcome {
        ToggleOutcome::Subscribed(_) => (true, "Subscribed successfully"),
        ToggleOutcome::Unsubscribed => (false, "Unsubscribed successfully"),
    };

    Ok(Json(ApiResponse::ok(
        SubscriptionToggleDto { subscribed },
        message,
    )))
}

/// `GET /subscriptions/{channel_id}/subscribers`
pub async fn channel_subscribers(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let channel = state
        .store
        .get_user(&channel_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Channel", &channel_id))?;

    let rows = state.store.subscribers_of(&channel.id).await?;
    let items: Vec<SubscriptionUserDto> = rows.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::ok(
        items,
        "Subscribers fetched successfully",
    )))
}

/// `GET /subscriptions/mine`: channels the caller is subscribed to.
pub async fn subscribed_channels(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.store.subscribed_channels_of(&user.id).await?;
    let items: Vec<SubscriptionUserDto> = rows.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::ok(
        items,
        "Subscribed channels fetched successfully",
    )))
}
