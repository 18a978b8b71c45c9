use super::{Session, SessionError};
use crate::{
    AppState,
    api::{get_cookie_value, verify_signed_cookie},
};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::Response,
};

pub const SESSION_COOKIE: &str = "session";

/// Extract the session id from a correctly signed session cookie
pub fn session_id_from_headers(headers: &HeaderMap, secret: &str) -> Option<String> {
    get_cookie_value(headers, SESSION_COOKIE).and_then(|signed_value| {
        if verify_signed_cookie(secret, &signed_value) {
            signed_value.split(':').next().map(|s| s.to_string())
        } else {
            None
        }
    })
}

/// Resolve the caller's live session or fail with 401
pub async fn authenticated_session(
    app_state: &AppState,
    headers: &HeaderMap,
) -> Result<Session, SessionError> {
    let session_id = session_id_from_headers(headers, &app_state.config.app.session_secret)
        .ok_or(SessionError::Unauthorized)?;

    app_state
        .sessions
        .get(&session_id)
        .await
        .ok_or(SessionError::Unauthorized)
}

/// Cookie lifetime matching the idle TTL. A TTL of 0 yields a browser
/// session cookie with no `Max-Age`.
pub fn session_cookie_max_age(idle_ttl_minutes: u64) -> Option<u64> {
    (idle_ttl_minutes > 0).then(|| idle_ttl_minutes.saturating_mul(60))
}

pub fn session_cookie(signed_value: &str, max_age_seconds: Option<u64>) -> String {
    match max_age_seconds {
        Some(max_age) => format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, signed_value, max_age
        ),
        None => format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, signed_value
        ),
    }
}

/// Re-issue the session cookie after every request made with a live session,
/// so the browser's expiry slides along with the server's idle TTL.
pub async fn refresh_session_cookie(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let app_config = &app_state.config.app;
    let signed_value = session_cookie_max_age(app_config.session_ttl_minutes)
        .and_then(|_| get_cookie_value(request.headers(), SESSION_COOKIE))
        .filter(|value| verify_signed_cookie(&app_config.session_secret, value));

    let mut response = next.run(request).await;

    let Some(signed_value) = signed_value else {
        return response;
    };
    // Login and logout set their own cookie
    if response.headers().contains_key(SET_COOKIE)
        || response.status() == StatusCode::UNAUTHORIZED
    {
        return response;
    }

    let session_id = signed_value.split(':').next().unwrap_or_default();
    if !app_state.sessions.contains(session_id).await {
        return response;
    }

    let cookie = session_cookie(
        &signed_value,
        session_cookie_max_age(app_config.session_ttl_minutes),
    );
    if let Ok(value) = cookie.parse() {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}

pub fn cleared_session_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE)
}
