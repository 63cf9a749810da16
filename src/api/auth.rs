use axum::{
    Json,
    extract::{Multipart, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SessionDto, TokenPairDto, UserDto, validation};
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::db::NewUser;
use crate::entities::users;
use crate::media::StagedFile;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// The authenticated user, inserted by [`auth_middleware`] for handlers
/// behind the guard.
#[derive(Clone)]
pub struct CurrentUser(pub users::Model);

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication guard. Accepts the access token from, in order:
/// 1. The `accessToken` cookie
/// 2. The `Authorization: Bearer <token>` header
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_access_token(&jar, request.headers())
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let claims = state
        .tokens
        .verify_access(&token)
        .map_err(|_| ApiError::unauthorized("Invalid access token"))?;

    let user = state
        .store
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid access token"))?;

    tracing::Span::current().record("user_id", user.id.as_str());
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

fn extract_access_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        return Some(cookie.value().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

struct RegisterForm {
    full_name: String,
    email: String,
    username: String,
    password: String,
    avatar: Option<StagedFile>,
    cover_image: Option<StagedFile>,
}

async fn read_register_form(
    staging_dir: &Path,
    mut multipart: Multipart,
) -> Result<RegisterForm, ApiError> {
    let mut full_name = String::new();
    let mut email = String::new();
    let mut username = String::new();
    let mut password = String::new();
    let mut avatar = None;
    let mut cover_image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        match name.as_str() {
            "fullName" => {
                full_name = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
            }
            "email" => {
                email = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
            }
            "username" => {
                username = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
            }
            "password" => {
                password = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
            }
            "avatar" | "coverImage" => {
                let original_name = field.file_name().map(ToString::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
                let staged =
                    StagedFile::create(staging_dir, original_name.as_deref(), &bytes).await?;
                if name == "avatar" {
                    avatar = Some(staged);
                } else {
                    cover_image = Some(staged);
                }
            }
            _ => {}
        }
    }

    Ok(RegisterForm {
        full_name,
        email,
        username,
        password,
        avatar,
        cover_image,
    })
}

/// `POST /users/register` (multipart): creates an account. The avatar file
/// is mandatory; the cover image is optional. Staged files are removed on
/// every exit path.
pub async fn register(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let staging_dir = PathBuf::from(&state.config.media.staging_path);
    let form = read_register_form(&staging_dir, multipart).await?;

    validation::require_fields(&[
        ("fullName", &form.full_name),
        ("email", &form.email),
        ("username", &form.username),
        ("password", &form.password),
    ])?;
    validation::validate_email(&form.email)?;

    let avatar = form
        .avatar
        .as_ref()
        .ok_or_else(|| ApiError::validation("Avatar file is required"))?;

    let username = form.username.trim().to_lowercase();
    let email = form.email.trim().to_string();

    if state.store.username_or_email_taken(&username, &email).await? {
        return Err(ApiError::conflict(
            "User with email or username already exists",
        ));
    }

    let avatar_asset = state
        .media
        .upload(avatar.path())
        .await
        .ok_or_else(|| ApiError::internal("Avatar upload failed"))?;

    let cover_image_url = match &form.cover_image {
        Some(staged) => state.media.upload(staged.path()).await.map(|a| a.url),
        None => None,
    };

    let password_hash = hash_password_blocking(
        form.password.clone(),
        Some(state.config.security.clone()),
    )
    .await?;

    let user = state
        .store
        .create_user(NewUser {
            username,
            email,
            full_name: form.full_name.trim().to_string(),
            password_hash,
            avatar_url: avatar_asset.url,
            cover_image_url,
        })
        .await?;

    tracing::info!(user_id = %user.id, "New user registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(
            UserDto::from(user),
            "User registered successfully",
        )),
    ))
}

/// `POST /users/login`: verifies credentials by username or email, issues a
/// token pair, persists the refresh token, and sets both auth cookies.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identifier = body
        .username
        .as_deref()
        .or(body.email.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("Username or email is required"))?;

    if body.password.is_empty() {
        return Err(ApiError::validation("password is required"));
    }

    let user = state
        .store
        .get_user_by_username_or_email(identifier)
        .await?
        .ok_or_else(|| ApiError::not_found("User", identifier))?;

    let valid =
        verify_password_blocking(body.password, user.password_hash.clone()).await?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid user credentials"));
    }

    let (user, access_token, refresh_token, jar) = establish_session(&state, user, jar).await?;

    Ok((
        jar,
        Json(ApiResponse::ok(
            SessionDto {
                user: UserDto::from(user),
                access_token,
                refresh_token,
            },
            "User logged in successfully",
        )),
    ))
}

/// `POST /users/refresh-token`: rotates the refresh token. The presented
/// token must verify *and* exactly match the stored one; any mismatch is
/// treated as reuse and answered with 401.
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let presented = extract_refresh_token(&jar, &headers, body.as_deref())
        .ok_or_else(|| ApiError::unauthorized("Refresh token is required"))?;

    let claims = state
        .tokens
        .verify_refresh(&presented)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    let user = state
        .store
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    if user.refresh_token.as_deref() != Some(presented.as_str()) {
        // A verified token that no longer matches the stored one has been
        // rotated out already: revoke the whole session.
        state.store.set_refresh_token(&user.id, None).await?;
        tracing::warn!(user_id = %user.id, "Refresh token reuse detected");
        return Err(ApiError::unauthorized("Refresh token is expired or used"));
    }

    let (_, access_token, refresh_token, jar) = establish_session(&state, user, jar).await?;

    Ok((
        jar,
        Json(ApiResponse::ok(
            TokenPairDto {
                access_token,
                refresh_token,
            },
            "Access token refreshed",
        )),
    ))
}

/// `POST /users/logout`: clears the stored refresh token and both cookies.
/// Logging out twice is fine.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    axum::Extension(CurrentUser(user)): axum::Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.set_refresh_token(&user.id, None).await?;

    let jar = jar
        .remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"));

    Ok((
        jar,
        Json(ApiResponse::ok(
            serde_json::json!({}),
            "User logged out successfully",
        )),
    ))
}

/// `POST /users/change-password`: requires the current password, rejects a
/// no-op change and a mismatched confirmation.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    axum::Extension(CurrentUser(user)): axum::Extension<CurrentUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::require_fields(&[
        ("oldPassword", &body.old_password),
        ("newPassword", &body.new_password),
        ("confirmPassword", &body.confirm_password),
    ])?;

    if body.old_password == body.new_password {
        return Err(ApiError::validation(
            "New password must differ from the old password",
        ));
    }
    if body.new_password != body.confirm_password {
        return Err(ApiError::validation(
            "New password and confirmation do not match",
        ));
    }

    let valid =
        verify_password_blocking(body.old_password, user.password_hash.clone()).await?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid old password"));
    }

    let password_hash =
        hash_password_blocking(body.new_password, Some(state.config.security.clone())).await?;
    state.store.set_password_hash(&user.id, password_hash).await?;

    Ok(Json(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    )))
}

// ============================================================================
// Helpers
// ============================================================================

/// Issue a fresh token pair for `user`, persist the refresh token, and set
/// both cookies on the jar.
async fn establish_session(
    state: &AppState,
    user: users::Model,
    jar: CookieJar,
) -> Result<(users::Model, String, String, CookieJar), ApiError> {
    let access_token = state
        .tokens
        .issue_access(&user.id, &user.username)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let refresh_token = state
        .tokens
        .issue_refresh(&user.id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    state
        .store
        .set_refresh_token(&user.id, Some(refresh_token.clone()))
        .await?;

    let secure = state.config.auth.secure_cookies;
    let jar = jar
        .add(auth_cookie(ACCESS_COOKIE, access_token.clone(), secure))
        .add(auth_cookie(REFRESH_COOKIE, refresh_token.clone(), secure));

    Ok((user, access_token, refresh_token, jar))
}

fn auth_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Refresh token precedence: cookie, then bearer header, then JSON body.
fn extract_refresh_token(
    jar: &CookieJar,
    headers: &HeaderMap,
    body: Option<&RefreshRequest>,
) -> Option<String> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        return Some(cookie.value().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    body.and_then(|b| b.refresh_token.clone())
}
