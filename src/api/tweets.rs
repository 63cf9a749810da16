use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, TweetDto, validation};

#[derive(Deserialize)]
pub struct TweetBody {
    pub content: String,
}

/// `POST /tweets`
pub async fn create_tweet(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<TweetBody>,
) -> Result<impl IntoResponse, ApiError> {
    let content = validation::validate_content(&body.content)?;

    let tweet = state.store.create_tweet(&user.id, content.to_string()).await?;

    Ok(Json(ApiResponse::ok(
        TweetDto::from(tweet),
        "Tweet created successfully",
    )))
}

/// `GET /users/{id}/tweets`: a user's tweets, oldest first.
pub async fn user_tweets(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &user_id))?;

    let tweets = state.store.tweets_for_owner(&owner.id).await?;
    let items: Vec<TweetDto> = tweets.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::ok(items, "Tweets fetched successfully")))
}

/// `PATCH /tweets/{id}`, author only.
pub async fn update_tweet(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<TweetBody>,
) -> Result<impl IntoResponse, ApiError> {
    let content = validation::validate_content(&body.content)?;

    let tweet = state
        .store
        .get_tweet(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tweet", &id))?;

    if tweet.owner_id != user.id {
        return Err(ApiError::forbidden("Only the author can edit this tweet"));
    }

    let updated = state
        .store
        .update_tweet_content(tweet, content.to_string())
        .await?;

    Ok(Json(ApiResponse::ok(
        TweetDto::from(updated),
        "Tweet updated successfully",
    )))
}

/// `DELETE /tweets/{id}`, author only.
pub async fn delete_tweet(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tweet = state
        .store
        .get_tweet(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tweet", &id))?;

    if tweet.owner_id != user.id {
        return Err(ApiError::forbidden("Only the author can delete this tweet"));
    }

    state.store.delete_tweet(&id).await?;

    Ok(Json(ApiResponse::ok(
        serde_json::json!({}),
        "Tweet deleted successfully",
    )))
}
