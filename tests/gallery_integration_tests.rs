use archipelago::{Config, create_app};
use axum::http::{HeaderValue, StatusCode, header};
use axum_test::{
    TestServer,
    multipart::{MultipartForm, Part},
};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Helper to create a test configuration rooted in a temp directory
fn create_test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.root = temp_dir.path().join("gallery_storage");
    config.app.session_secret = "test-secret".to_string();
    config
}

async fn setup_test_server() -> (TempDir, TestServer) {
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(&temp_dir);
    let app = create_app(config).await;
    let server = TestServer::new(app).unwrap();
    (temp_dir, server)
}

/// Log in with the shared passkey and return a `Cookie` header value
async fn login(server: &TestServer) -> HeaderValue {
    let response = server
        .post("/api/auth")
        .json(&json!({ "password": "ARCH" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let set_cookie = response.header(header::SET_COOKIE);
    let pair = set_cookie
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    HeaderValue::from_str(&pair).unwrap()
}

fn image_part(bytes: &[u8], name: &str, mime: &str) -> Part {
    Part::bytes(bytes.to_vec())
        .file_name(name.to_string())
        .mime_type(mime.to_string())
}

#[tokio::test]
async fn test_requests_without_session_are_rejected() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server.get("/api/sections").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server.get("/api/sections/Selected%20Works/images").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .get("/api/sections")
        .add_header(header::COOKIE, HeaderValue::from_static("session=forged:signature"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let verify: Value = server.get("/api/verify").await.json();
    assert_eq!(verify["authorized"], false);
}

#[tokio::test]
async fn test_login_and_logout() {
    let (_temp_dir, server) = setup_test_server().await;

    let response = server
        .post("/api/auth")
        .json(&json!({ "password": "wrong" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let session = login(&server).await;
    let verify: Value = server
        .get("/api/verify")
        .add_header(header::COOKIE, session.clone())
        .await
        .json();
    assert_eq!(verify["authorized"], true);

    let response = server
        .post("/api/logout")
        .add_header(header::COOKIE, session.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(
        response
            .header(header::SET_COOKIE)
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );

    let response = server
        .get("/api/sections")
        .add_header(header::COOKIE, session)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_default_section_exists_on_start() {
    let (_temp_dir, server) = setup_test_server().await;
    let session = login(&server).await;

    let sections: Value = server
        .get("/api/sections")
        .add_header(header::COOKIE, session)
        .await
        .json();

    assert_eq!(
        sections,
        json!([{ "name": "Selected Works", "image_count": 0 }])
    );
}

#[tokio::test]
async fn test_create_section_conflict() {
    let (_temp_dir, server) = setup_test_server().await;
    let session = login(&server).await;

    let response = server
        .post("/api/sections")
        .add_header(header::COOKIE, session.clone())
        .json(&json!({ "name": "Harbour Tower!" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["name"], "Harbour Tower");

    let response = server
        .post("/api/sections")
        .add_header(header::COOKIE, session.clone())
        .json(&json!({ "name": "Harbour Tower" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = server
        .post("/api/sections")
        .add_header(header::COOKIE, session)
        .json(&json!({ "name": "../../" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_list_download_delete() {
    let (temp_dir, server) = setup_test_server().await;
    let session = login(&server).await;
    let png = b"\x89PNG\r\n\x1a\nnot really a png".to_vec();

    let form = MultipartForm::new()
        .add_part("files", image_part(&png, "facade.png", "image/png"))
        .add_part("files", image_part(b"plain text", "notes.txt", "text/plain"));

    let response = server
        .post("/api/sections/Selected%20Works/images")
        .add_header(header::COOKIE, session.clone())
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let report: Value = response.json();
    assert_eq!(report["succeeded"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["files"][1]["filename"], "notes.txt");

    let images: Value = server
        .get("/api/sections/Selected%20Works/images")
        .add_header(header::COOKIE, session.clone())
        .await
        .json();
    let images = images.as_array().unwrap();
    assert_eq!(images.len(), 1);

    let image = &images[0];
    let filename = image["filename"].as_str().unwrap();
    assert!(filename.ends_with("_facade.png"));
    assert_eq!(image["section"], "Selected Works");
    assert_eq!(image["size"], png.len());

    let on_disk = temp_dir
        .path()
        .join("gallery_storage")
        .join("Selected Works")
        .join(image["date"].as_str().unwrap())
        .join(filename);
    assert!(on_disk.is_file());

    let url = image["url"].as_str().unwrap().to_string();
    let response = server.get(&url).add_header(header::COOKIE, session.clone()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), "image/png");
    assert_eq!(response.as_bytes().to_vec(), png);

    let response = server
        .get(&format!("{}?download=true", url))
        .add_header(header::COOKIE, session.clone())
        .await;
    let disposition = response.header(header::CONTENT_DISPOSITION);
    assert!(disposition.to_str().unwrap().starts_with("attachment;"));

    for _ in 0..2 {
        let response = server
            .delete(&url)
            .add_header(header::COOKIE, session.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    }
    assert!(!on_disk.exists());

    let response = server.get(&url).add_header(header::COOKIE, session).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_with_only_bad_files_fails() {
    let (_temp_dir, server) = setup_test_server().await;
    let session = login(&server).await;

    let form = MultipartForm::new()
        .add_part("files", image_part(b"GIF89a", "anim.gif", "image/gif"));

    let response = server
        .post("/api/sections/Selected%20Works/images")
        .add_header(header::COOKIE, session)
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_traversal_handles_are_rejected() {
    let (temp_dir, server) = setup_test_server().await;
    let session = login(&server).await;
    std::fs::write(temp_dir.path().join("secret.jpg"), b"x").unwrap();

    let response = server
        .get("/api/images/..%2Fsecret.jpg")
        .add_header(header::COOKIE, session.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .delete("/api/images/Selected%20Works/_metadata.json")
        .add_header(header::COOKIE, session)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(temp_dir.path().join("secret.jpg").exists());
}

#[tokio::test]
async fn test_captions_hero_and_featured() {
    let (_temp_dir, server) = setup_test_server().await;
    let session = login(&server).await;

    let hero: Value = server
        .get("/api/hero")
        .add_header(header::COOKIE, session.clone())
        .await
        .json();
    assert!(hero.is_null());

    let form =
        MultipartForm::new().add_part("files", image_part(b"jpeg", "lobby.jpg", "image/jpeg"));
    let report: Value = server
        .post("/api/sections/Selected%20Works/images")
        .add_header(header::COOKIE, session.clone())
        .multipart(form)
        .await
        .json();
    let handle = report["files"][0]["stored"]["handle"]
        .as_str()
        .unwrap()
        .to_string();

    let response = server
        .put(&format!("/api/captions/{}", handle))
        .add_header(header::COOKIE, session.clone())
        .json(&json!({ "caption": "Main lobby" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let hero: Value = server
        .get("/api/hero")
        .add_header(header::COOKIE, session.clone())
        .await
        .json();
    assert_eq!(hero["handle"], handle.as_str());
    assert_eq!(hero["caption"], "Main lobby");

    let featured: Value = server
        .get("/api/featured")
        .add_header(header::COOKIE, session)
        .await
        .json();
    assert_eq!(featured.as_array().unwrap().len(), 1);
    assert_eq!(featured[0]["section"], "Selected Works");
}

#[tokio::test]
async fn test_delete_section_reports_counts() {
    let (temp_dir, server) = setup_test_server().await;
    let session = login(&server).await;

    server
        .post("/api/sections")
        .add_header(header::COOKIE, session.clone())
        .json(&json!({ "name": "Scratch" }))
        .await;

    let form = MultipartForm::new()
        .add_part("files", image_part(b"a", "a.jpg", "image/jpeg"))
        .add_part("files", image_part(b"b", "b.jpg", "image/jpeg"));
    server
        .post("/api/sections/Scratch/images")
        .add_header(header::COOKIE, session.clone())
        .multipart(form)
        .await;

    let response = server
        .delete("/api/sections/Scratch")
        .add_header(header::COOKIE, session)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let report: Value = response.json();
    assert_eq!(report["files_removed"], 2);
    assert_eq!(report["files_failed"], 0);
    assert!(!temp_dir.path().join("gallery_storage").join("Scratch").exists());
}

#[tokio::test]
async fn test_upload_accepts_underscore_camera_names() {
    let (temp_dir, server) = setup_test_server().await;
    let session = login(&server).await;

    let form = MultipartForm::new()
        .add_part("files", image_part(b"raw jpeg", "_DSC0001.jpg", "image/jpeg"));
    let response = server
        .post("/api/sections/Selected%20Works/images")
        .add_header(header::COOKIE, session.clone())
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let report: Value = response.json();
    assert_eq!(report["succeeded"], 1);
    assert_eq!(report["failed"], 0);

    let images: Value = server
        .get("/api/sections/Selected%20Works/images")
        .add_header(header::COOKIE, session)
        .await
        .json();
    let images = images.as_array().unwrap();
    assert_eq!(images.len(), 1);

    let filename = images[0]["filename"].as_str().unwrap();
    assert!(filename.ends_with("__DSC0001.jpg"));
    assert!(
        temp_dir
            .path()
            .join("gallery_storage")
            .join("Selected Works")
            .join(images[0]["date"].as_str().unwrap())
            .join(filename)
            .is_file()
    );
}

async fn setup_test_server_with_ttl(minutes: u64) -> (TempDir, TestServer) {
    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&temp_dir);
    config.app.session_ttl_minutes = minutes;
    let app = create_app(config).await;
    let server = TestServer::new(app).unwrap();
    (temp_dir, server)
}

#[tokio::test]
async fn test_session_cookie_without_ttl_has_no_max_age() {
    let (_temp_dir, server) = setup_test_server_with_ttl(0).await;

    let response = server
        .post("/api/auth")
        .json(&json!({ "password": "ARCH" }))
        .await;
    let set_cookie = response.header(header::SET_COOKIE);
    let set_cookie = set_cookie.to_str().unwrap();
    assert!(set_cookie.starts_with("session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(!set_cookie.contains("Max-Age"));

    // Nothing to slide when the cookie lives for the browser session
    let session = login(&server).await;
    let response = server
        .get("/api/sections")
        .add_header(header::COOKIE, session)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_session_cookie_is_renewed_on_activity() {
    let (_temp_dir, server) = setup_test_server_with_ttl(30).await;

    let response = server
        .post("/api/auth")
        .json(&json!({ "password": "ARCH" }))
        .await;
    let issued = response.header(header::SET_COOKIE);
    assert!(issued.to_str().unwrap().contains("Max-Age=1800"));

    let session = login(&server).await;
    let response = server
        .get("/api/sections")
        .add_header(header::COOKIE, session.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let renewed = response.header(header::SET_COOKIE);
    let renewed = renewed.to_str().unwrap();
    assert!(renewed.starts_with(&format!("{};", session.to_str().unwrap())));
    assert!(renewed.contains("Max-Age=1800"));

    // No renewal without a live session
    let response = server.get("/api/sections").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    server
        .post("/api/logout")
        .add_header(header::COOKIE, session.clone())
        .await;
    let response = server
        .get("/api/verify")
        .add_header(header::COOKIE, session)
        .await;
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}
