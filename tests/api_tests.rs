use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use streamtube::config::Config;
use tower::ServiceExt;

const BOUNDARY: &str = "----streamtube-test-boundary";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let scratch = std::env::temp_dir().join(format!("streamtube-test-{}", uuid::Uuid::new_v4()));
    config.media.staging_path = scratch.join("staging").to_string_lossy().to_string();
    config.media.library_path = scratch.join("library").to_string_lossy().to_string();

    let state = streamtube::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    streamtube::api::router(state)
}

fn text_part(name: &str, value: &str) -> String {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
    )
}

fn file_part(name: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut part = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    part.extend_from_slice(bytes);
    part.extend_from_slice(b"\r\n");
    part
}

fn close_multipart(mut body: Vec<u8>) -> Vec<u8> {
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn register_body(full_name: &str, email: &str, username: &str, password: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(text_part("fullName", full_name).as_bytes());
    body.extend_from_slice(text_part("email", email).as_bytes());
    body.extend_from_slice(text_part("username", username).as_bytes());
    body.extend_from_slice(text_part("password", password).as_bytes());
    body.extend(file_part("avatar", "avatar.png", b"not-really-a-png"));
    close_multipart(body)
}

async fn register(app: &Router, username: &str, password: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/register")
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(register_body(
                    "Test User",
                    &format!("{username}@example.com"),
                    username,
                    password,
                )))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "username": username, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn register_returns_sanitized_user() {
    let app = spawn_app().await;

    let body = register(&app, "Alice", "secret123").await;

    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["success"], true);
    // Usernames are stored lowercase.
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"]["avatar"].as_str().unwrap().contains("/upload/v1/"));
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("refreshToken").is_none());
}

#[tokio::test]
async fn register_rejects_duplicates_and_bad_input() {
    let app = spawn_app().await;

    register(&app, "alice", "secret123").await;

    // Same username again, different case.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/register")
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(register_body(
                    "Alice Again",
                    "other@example.com",
                    "ALICE",
                    "secret123",
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Missing avatar file.
    let mut body = Vec::new();
    body.extend_from_slice(text_part("fullName", "Bob").as_bytes());
    body.extend_from_slice(text_part("email", "bob@example.com").as_bytes());
    body.extend_from_slice(text_part("username", "bob").as_bytes());
    body.extend_from_slice(text_part("password", "secret123").as_bytes());
    let body = close_multipart(body);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/register")
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Email without a dot.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/register")
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(register_body(
                    "Carol",
                    "carol@examplecom",
                    "carol",
                    "secret123",
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_returns_tokens_and_sets_cookies() {
    let app = spawn_app().await;
    register(&app, "alice", "secret123").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "email": "alice@example.com", "password": "secret123" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(body["data"]["accessToken"].is_string());
    assert!(body["data"]["refreshToken"].is_string());
    assert_eq!(body["data"]["user"]["username"], "alice");
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = spawn_app().await;
    register(&app, "alice", "secret123").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "username": "alice", "password": "wrong" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "username": "nobody", "password": "secret123" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn guard_rejects_missing_and_garbage_tokens() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/me")
                .header("Authorization", "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let error_body = response.into_body().collect().await.unwrap().to_bytes();
    let error_body: serde_json::Value = serde_json::from_slice(&error_body).unwrap();
    assert_eq!(error_body["success"], false);
    assert_eq!(error_body["statusCode"], 401);
    assert!(error_body["errors"].is_array());
}

#[tokio::test]
async fn bearer_token_grants_access() {
    let app = spawn_app().await;
    register(&app, "alice", "secret123").await;
    let session = login(&app, "alice", "secret123").await;
    let access = session["data"]["accessToken"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/me")
                .header("Authorization", format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["data"]["username"], "alice");
}

#[tokio::test]
async fn refresh_rotates_exactly_once() {
    let app = spawn_app().await;
    register(&app, "alice", "secret123").await;
    let session = login(&app, "alice", "secret123").await;
    let refresh = session["data"]["refreshToken"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/refresh-token")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "refreshToken": refresh }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let rotated = body["data"]["refreshToken"].as_str().unwrap();
    assert_ne!(rotated, refresh);

    // Presenting the consumed token again is treated as reuse.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/refresh-token")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "refreshToken": refresh }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_without_token_is_unauthorized() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/refresh-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_refresh_and_is_idempotent() {
    let app = spawn_app().await;
    register(&app, "alice", "secret123").await;
    let session = login(&app, "alice", "secret123").await;
    let access = session["data"]["accessToken"].as_str().unwrap().to_string();
    let refresh = session["data"]["refreshToken"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/users/logout")
                    .header("Authorization", format!("Bearer {access}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // The stored refresh token is gone, so refresh now fails.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/refresh-token")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "refreshToken": refresh }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_rules() {
    let app = spawn_app().await;
    register(&app, "alice", "secret123").await;
    let session = login(&app, "alice", "secret123").await;
    let access = session["data"]["accessToken"].as_str().unwrap().to_string();

    let attempt = |body: serde_json::Value| {
        let app = app.clone();
        let access = access.clone();
        async move {
            app.oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/users/change-password")
                    .header("Authorization", format!("Bearer {access}"))
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
        }
    };

    // New password equal to the old one.
    let response = attempt(serde_json::json!({
        "oldPassword": "secret123",
        "newPassword": "secret123",
        "confirmPassword": "secret123"
    }))
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Confirmation mismatch.
    let response = attempt(serde_json::json!({
        "oldPassword": "secret123",
        "newPassword": "newsecret",
        "confirmPassword": "different"
    }))
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Wrong old password is an authentication failure, not a validation one.
    let response = attempt(serde_json::json!({
        "oldPassword": "wrong",
        "newPassword": "newsecret",
        "confirmPassword": "newsecret"
    }))
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Valid change, then the new password works.
    let response = attempt(serde_json::json!({
        "oldPassword": "secret123",
        "newPassword": "newsecret",
        "confirmPassword": "newsecret"
    }))
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    login(&app, "alice", "newsecret").await;
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = spawn_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
