use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::TokenService;
use crate::config::Config;
use crate::db::Store;
use crate::media::{LocalMediaHost, MediaHost};

pub mod auth;
mod comments;
mod error;
mod subscriptions;
mod tweets;
mod types;
mod users;
mod validation;
mod videos;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,

    pub store: Store,

    pub tokens: TokenService,

    pub media: Arc<dyn MediaHost>,
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let tokens = TokenService::new(&config.auth);

    let media: Arc<dyn MediaHost> = Arc::new(LocalMediaHost::new(
        config.media.library_path.clone().into(),
        config.media.public_base_url.clone(),
        Duration::from_secs(config.media.upload_timeout_seconds),
    ));

    Ok(Arc::new(AppState {
        config,
        store,
        tokens,
        media,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let media_library = state.config.media.library_path.clone();
    let cors_origins = state.config.server.cors_allowed_origins.clone();
    let body_limit = state.config.media.max_upload_bytes;

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/health", get(health))
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
        .route("/users/refresh-token", post(auth::refresh_token))
        .route("/users/{id}/tweets", get(tweets::user_tweets))
        .route("/videos", get(videos::video_feed))
        .route("/videos/{id}", get(videos::get_video))
        .route("/videos/{id}/comments", get(comments::list_comments))
        .route(
            "/subscriptions/{channel_id}/subscribers",
            get(subscriptions::channel_subscribers),
        )
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api/v1", api_router)
        .nest_service(
            "/media",
            tower_http::services::ServeDir::new(media_library),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/logout", post(auth::logout))
        .route("/users/change-password", post(auth::change_password))
        .route("/users/me", get(users::current_user))
        .route("/users/me", patch(users::update_account))
        .route("/users/me/avatar", patch(users::update_avatar))
        .route("/users/me/cover-image", patch(users::update_cover_image))
        .route("/users/channel/{username}", get(users::channel_profile))
        .route("/users/history", get(users::watch_history))
        .route("/videos", post(videos::upload_video))
        .route("/videos/{id}", patch(videos::update_video))
        .route("/videos/{id}", delete(videos::delete_video))
        .route("/videos/{id}/thumbnail", patch(videos::update_thumbnail))
        .route(
            "/videos/{id}/toggle-publish",
            post(videos::toggle_publish),
        )
        .route("/videos/{id}/view", post(videos::record_view))
        .route("/videos/{id}/comments", post(comments::add_comment))
        .route("/comments/mine", get(comments::my_comments))
        .route("/comments/{id}", patch(comments::update_comment))
        .route("/comments/{id}", delete(comments::delete_comment))
        .route("/tweets", post(tweets::create_tweet))
        .route("/tweets/{id}", patch(tweets::update_tweet))
        .route("/tweets/{id}", delete(tweets::delete_tweet))
        .route(
            "/subscriptions/{channel_id}/toggle",
            post(subscriptions::toggle_subscription),
        )
        .route("/subscriptions/mine", get(subscriptions::subscribed_channels))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<HealthDto>>, ApiError> {
    let database = match state.store.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::error!("Database ping failed: {}", e);
            return Err(ApiError::DatabaseError(e.to_string()));
        }
    };

    Ok(Json(ApiResponse::ok(
        HealthDto {
            status: "ok".to_string(),
            database,
        },
        "Service healthy",
    )))
}
