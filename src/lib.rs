use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod atomic_file;
pub mod gallery;
pub mod session;
pub mod settings;
pub mod startup_checks;
pub mod webhook;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    /// Single passphrase shared by every user of the studio.
    pub shared_password: String,
    pub session_secret: String,
    /// Idle minutes before a session is dropped; 0 keeps it until logout.
    /// The cookie's `Max-Age` is renewed on every authenticated request.
    pub session_ttl_minutes: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub default_section: String,
    /// Defaults to `<root>/app_settings.json`.
    pub settings_file: Option<PathBuf>,
    pub max_upload_mb: usize,
    pub featured_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub timeout_seconds: u64,
    /// Value of the `source` field in ping payloads.
    pub source: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Archipelago".to_string(),
            log_level: "info".to_string(),
            shared_password: "ARCH".to_string(),
            session_secret: "change-me-in-production".to_string(),
            session_ttl_minutes: 7 * 24 * 60,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("gallery_storage"),
            default_section: "Selected Works".to_string(),
            settings_file: None,
            max_upload_mb: 200,
            featured_limit: 12,
        }
    }
}

impl StorageConfig {
    pub fn settings_path(&self) -> PathBuf {
        self.settings_file
            .clone()
            .unwrap_or_else(|| self.root.join("app_settings.json"))
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 6,
            source: "ARCHIPELAGO".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub gallery: gallery::SharedGallery,
    pub settings_store: Arc<settings::SettingsStore>,
    pub sessions: Arc<session::SessionStore>,
    pub webhook: webhook::WebhookClient,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let gallery = Arc::new(gallery::Gallery::new(config.storage.clone()));
        if let Err(e) = gallery.initialize() {
            tracing::error!("Failed to initialize storage at {:?}: {}", config.storage.root, e);
        }

        Self {
            gallery,
            settings_store: Arc::new(settings::SettingsStore::new(
                config.storage.settings_path(),
            )),
            sessions: Arc::new(session::SessionStore::new(config.app.session_ttl_minutes)),
            webhook: webhook::WebhookClient::new(&config.webhook),
            config,
        }
    }
}

pub async fn create_app(config: Config) -> Router {
    create_router(AppState::new(config))
}

pub fn create_router(app_state: AppState) -> Router {
    let upload_limit = app_state.config.storage.max_upload_mb * 1024 * 1024;

    Router::new()
        .route("/api/auth", post(api::authenticate_handler))
        .route("/api/logout", post(api::logout_handler))
        .route("/api/verify", get(api::verify_handler))
        .route(
            "/api/sections",
            get(gallery::list_sections_handler).post(gallery::create_section_handler),
        )
        .route(
            "/api/sections/{section}",
            delete(gallery::delete_section_handler),
        )
        .route(
            "/api/sections/{section}/images",
            get(gallery::list_images_handler).post(gallery::upload_handler),
        )
        .route(
            "/api/images/{*handle}",
            get(gallery::image_handler).delete(gallery::delete_image_handler),
        )
        .route("/api/captions/{*handle}", put(gallery::set_caption_handler))
        .route("/api/hero", get(gallery::hero_handler))
        .route("/api/featured", get(gallery::featured_handler))
        .route(
            "/api/settings",
            get(settings::get_settings_handler).put(settings::update_settings_handler),
        )
        .route("/api/settings/save", post(settings::save_settings_handler))
        .route("/api/settings/reset", post(settings::reset_settings_handler))
        .route("/api/ping", post(api::ping_handler))
        .route("/api/webhook/test", post(api::webhook_test_handler))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            session::refresh_session_cookie,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let headers = request.headers();
                    let user_agent = headers
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
