use super::{Settings, SettingsResponse};
use crate::{AppState, session::authenticated_session};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;

async fn persist(app_state: &AppState, settings: Settings) -> bool {
    let store = app_state.settings_store.clone();
    tokio::task::spawn_blocking(move || store.save(&settings))
        .await
        .unwrap_or_else(|e| {
            error!("Settings save task failed: {}", e);
            false
        })
}

pub async fn get_settings_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    match authenticated_session(&app_state, &headers).await {
        Ok(session) => Json(SettingsResponse {
            settings: session.settings,
            persisted: None,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Apply a partial update to the session's settings, persisting immediately
/// when auto-save is on.
pub async fn update_settings_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(patch): Json<serde_json::Value>,
) -> Response {
    let session = match authenticated_session(&app_state, &headers).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    let settings = match session.settings.merge_json(&patch) {
        Ok(settings) => settings,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    if app_state
        .sessions
        .update_settings(&session.id, settings.clone())
        .await
        .is_none()
    {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let persisted = if settings.auto_save {
        Some(persist(&app_state, settings.clone()).await)
    } else {
        None
    };

    Json(SettingsResponse {
        settings,
        persisted,
    })
    .into_response()
}

pub async fn save_settings_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let session = match authenticated_session(&app_state, &headers).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    let saved = persist(&app_state, session.settings.clone()).await;
    let status = if saved {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(SettingsResponse {
            settings: session.settings,
            persisted: Some(saved),
        }),
    )
        .into_response()
}

pub async fn reset_settings_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let session = match authenticated_session(&app_state, &headers).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    let defaults = Settings::default();
    app_state
        .sessions
        .update_settings(&session.id, defaults.clone())
        .await;
    let saved = persist(&app_state, defaults.clone()).await;

    Json(SettingsResponse {
        settings: defaults,
        persisted: Some(saved),
    })
    .into_response()
}
