use archipelago::{Config, create_app, settings::Settings};
use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

async fn setup_test_server() -> (TempDir, PathBuf, TestServer) {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.root = temp_dir.path().join("gallery_storage");
    let settings_path = config.storage.settings_path();

    let app = create_app(config).await;
    let server = TestServer::new(app).unwrap();
    (temp_dir, settings_path, server)
}

async fn login(server: &TestServer) -> HeaderValue {
    let response = server
        .post("/api/auth")
        .json(&json!({ "password": "ARCH" }))
        .await;
    let set_cookie = response.header(header::SET_COOKIE);
    let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
    HeaderValue::from_str(pair).unwrap()
}

fn read_settings_file(path: &Path) -> Settings {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_fresh_session_gets_defaults() {
    let (_temp_dir, settings_path, server) = setup_test_server().await;
    let session = login(&server).await;

    let body: Value = server
        .get("/api/settings")
        .add_header(header::COOKIE, session)
        .await
        .json();

    assert_eq!(body["settings"], serde_json::to_value(Settings::default()).unwrap());
    assert!(!settings_path.exists());
}

#[tokio::test]
async fn test_update_without_auto_save_stays_in_session() {
    let (_temp_dir, settings_path, server) = setup_test_server().await;
    let session = login(&server).await;

    let body: Value = server
        .put("/api/settings")
        .add_header(header::COOKIE, session.clone())
        .json(&json!({ "accent": "#ff0000", "unknown_key": 1 }))
        .await
        .json();
    assert_eq!(body["settings"]["accent"], "#ff0000");
    assert!(body["persisted"].is_null());
    assert!(!settings_path.exists());

    // Another login reads the file, not someone else's session
    let other = login(&server).await;
    let body: Value = server
        .get("/api/settings")
        .add_header(header::COOKIE, other)
        .await
        .json();
    assert_eq!(body["settings"]["accent"], "#0b6cff");

    let body: Value = server
        .get("/api/settings")
        .add_header(header::COOKIE, session)
        .await
        .json();
    assert_eq!(body["settings"]["accent"], "#ff0000");
}

#[tokio::test]
async fn test_auto_save_persists_clamped_settings() {
    let (_temp_dir, settings_path, server) = setup_test_server().await;
    let session = login(&server).await;

    let body: Value = server
        .put("/api/settings")
        .add_header(header::COOKIE, session)
        .json(&json!({ "auto_save": true, "grid_columns": 9, "thumb_size": "large" }))
        .await
        .json();
    assert_eq!(body["persisted"], true);
    assert_eq!(body["settings"]["grid_columns"], 6);

    let saved = read_settings_file(&settings_path);
    assert!(saved.auto_save);
    assert_eq!(saved.grid_columns, 6);

    let fresh = login(&server).await;
    let body: Value = server
        .get("/api/settings")
        .add_header(header::COOKIE, fresh)
        .await
        .json();
    assert_eq!(body["settings"]["thumb_size"], "large");
}

#[tokio::test]
async fn test_mistyped_update_is_rejected() {
    let (_temp_dir, _settings_path, server) = setup_test_server().await;
    let session = login(&server).await;

    let response = server
        .put("/api/settings")
        .add_header(header::COOKIE, session)
        .json(&json!({ "grid_columns": "many" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_and_reset() {
    let (_temp_dir, settings_path, server) = setup_test_server().await;
    let session = login(&server).await;

    server
        .put("/api/settings")
        .add_header(header::COOKIE, session.clone())
        .json(&json!({ "theme_mode": "Dark" }))
        .await;

    let response = server
        .post("/api/settings/save")
        .add_header(header::COOKIE, session.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        read_settings_file(&settings_path).theme_mode,
        archipelago::settings::ThemeMode::Dark
    );

    let body: Value = server
        .post("/api/settings/reset")
        .add_header(header::COOKIE, session)
        .await
        .json();
    assert_eq!(body["persisted"], true);
    assert_eq!(read_settings_file(&settings_path), Settings::default());
}

#[tokio::test]
async fn test_ping_without_webhook() {
    let (_temp_dir, _settings_path, server) = setup_test_server().await;

    let response = server.post("/api/ping").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let session = login(&server).await;
    let body: Value = server
        .post("/api/ping")
        .add_header(header::COOKIE, session.clone())
        .await
        .json();
    assert_eq!(body["sent"], false);
    assert!(body["warning"].is_null());
    assert_eq!(body["time"].as_str().unwrap().len(), 8);

    let response = server
        .post("/api/webhook/test")
        .add_header(header::COOKIE, session)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "Enter webhook URL first.");
}

#[tokio::test]
async fn test_ping_with_unreachable_webhook_warns() {
    let (_temp_dir, _settings_path, server) = setup_test_server().await;
    let session = login(&server).await;

    server
        .put("/api/settings")
        .add_header(header::COOKIE, session.clone())
        .json(&json!({ "webhook_url": "http://127.0.0.1:1/hook" }))
        .await;

    let body: Value = server
        .post("/api/ping")
        .add_header(header::COOKIE, session)
        .await
        .json();
    assert_eq!(body["sent"], false);
    assert_eq!(body["warning"], "Webhook ping failed (check URL)");
}
