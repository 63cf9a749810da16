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

/// Register a user and log in. Returns (user id, access token).
async fn register_and_login(app: &Router, username: &str) -> (String, String) {
    let email = format!("{username}@example.com");
    let mut body = Vec::new();
    for (name, value) in [
        ("fullName", "Test User"),
        ("email", email.as_str()),
        ("username", username),
        ("password", "secret123"),
    ] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"avatar.png\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"not-really-a-png\r\n");
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

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
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered = response.into_body().collect().await.unwrap().to_bytes();
    let registered: serde_json::Value = serde_json::from_slice(&registered).unwrap();
    let user_id = registered["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "username": username, "password": "secret123" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = response.into_body().collect().await.unwrap().to_bytes();
    let session: serde_json::Value = serde_json::from_slice(&session).unwrap();
    let access = session["data"]["accessToken"].as_str().unwrap().to_string();

    (user_id, access)
}

async fn toggle(app: &Router, access: &str, channel_id: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/subscriptions/{channel_id}/toggle"))
                .header("Authorization", format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get_json(app: &Router, uri: &str, access: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = access {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn toggle_subscribes_then_unsubscribes() {
    let app = spawn_app().await;
    let (_, alice) = register_and_login(&app, "alice").await;
    let (bob_id, _) = register_and_login(&app, "bob").await;

    let (status, body) = toggle(&app, &alice, &bob_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subscribed"], true);

    let (status, body) = toggle(&app, &alice, &bob_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subscribed"], false);

    // A full on-off cycle leaves no edge behind.
    let (status, body) = get_json(
        &app,
        &format!("/api/v1/subscriptions/{bob_id}/subscribers"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn self_subscription_is_rejected() {
    let app = spawn_app().await;
    let (alice_id, alice) = register_and_login(&app, "alice").await;

    let (status, _) = toggle(&app, &alice, &alice_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_channel_is_not_found() {
    let app = spawn_app().await;
    let (_, alice) = register_and_login(&app, "alice").await;

    let (status, _) = toggle(&app, &alice, "no-such-user").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subscriber_listings_show_public_identity() {
    let app = spawn_app().await;
    let (_, alice) = register_and_login(&app, "alice").await;
    let (_, carol) = register_and_login(&app, "carol").await;
    let (bob_id, _) = register_and_login(&app, "bob").await;

    toggle(&app, &alice, &bob_id).await;
    toggle(&app, &carol, &bob_id).await;

    let (status, body) = get_json(
        &app,
        &format!("/api/v1/subscriptions/{bob_id}/subscribers"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let subscribers = body["data"].as_array().unwrap();
    assert_eq!(subscribers.len(), 2);
    let usernames: Vec<&str> = subscribers
        .iter()
        .map(|s| s["username"].as_str().unwrap())
        .collect();
    assert!(usernames.contains(&"alice"));
    assert!(usernames.contains(&"carol"));
    assert!(subscribers[0].get("email").is_none());

    let (status, body) = get_json(&app, "/api/v1/subscriptions/mine", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["username"], "bob");
}

#[tokio::test]
async fn channel_profile_reflects_subscription_state() {
    let app = spawn_app().await;
    let (_, alice) = register_and_login(&app, "alice").await;
    let (_, carol) = register_and_login(&app, "carol").await;
    let (bob_id, bob) = register_and_login(&app, "bob").await;

    toggle(&app, &alice, &bob_id).await;
    toggle(&app, &carol, &bob_id).await;

    let (status, body) = get_json(&app, "/api/v1/users/channel/bob", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "bob");
    assert_eq!(body["data"]["subscribersCount"], 2);
    assert_eq!(body["data"]["isSubscribed"], true);

    // Bob is not subscribed to himself.
    let (status, body) = get_json(&app, "/api/v1/users/channel/bob", Some(&bob)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isSubscribed"], false);
    assert_eq!(body["data"]["channelsSubscribedToCount"], 0);

    // Alice subscribes to one channel.
    let (status, body) = get_json(&app, "/api/v1/users/channel/alice", Some(&bob)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["channelsSubscribedToCount"], 1);
    assert_eq!(body["data"]["subscribersCount"], 0);

    let (status, _) = get_json(&app, "/api/v1/users/channel/nobody", Some(&alice)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
