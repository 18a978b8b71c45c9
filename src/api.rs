use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Json, Response},
};
use base64::{Engine, engine::general_purpose};
use chrono::Local;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    AppState,
    session::{
        SessionError, authenticated_session, cleared_session_cookie, session_cookie,
        session_cookie_max_age, session_id_from_headers,
    },
    webhook::{PingResponse, WebhookError},
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Deserialize)]
pub struct AuthRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    success: bool,
    message: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    authorized: bool,
}

#[derive(Debug, Serialize)]
pub struct PingResult {
    pub sent: bool,
    pub time: String,
    pub webhook: Option<PingResponse>,
    pub warning: Option<String>,
}

pub fn create_signed_cookie(secret: &str, value: &str) -> Result<String, String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "Invalid secret key")?;
    mac.update(value.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);
    Ok(format!("{}:{}", value, signature_b64))
}

pub fn verify_signed_cookie(secret: &str, signed_value: &str) -> bool {
    if let Some((value, signature_b64)) = signed_value.split_once(':')
        && let Ok(signature) = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64)
        && let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes())
    {
        mac.update(value.as_bytes());
        return mac.verify_slice(&signature).is_ok();
    }
    false
}

pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get("cookie")?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

pub async fn authenticate_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<impl IntoResponse, SessionError> {
    tracing::info!("Authentication attempt received");
    let config = &app_state.config;

    if payload.password != config.app.shared_password {
        tracing::warn!("Authentication failed - invalid passkey");
        return Err(SessionError::InvalidPassword);
    }

    let session = app_state
        .sessions
        .create(app_state.settings_store.load())
        .await;
    let signed_value = create_signed_cookie(&config.app.session_secret, &session.id)
        .map_err(SessionError::InternalError)?;
    let cookie = session_cookie(
        &signed_value,
        session_cookie_max_age(config.app.session_ttl_minutes),
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| SessionError::InternalError("unencodable cookie".to_string()))?,
    );

    tracing::info!("Authentication successful");
    Ok((
        headers,
        Json(AuthResponse {
            success: true,
            message: "Authentication successful".to_string(),
        }),
    ))
}

pub async fn verify_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Json<VerifyResponse> {
    let authorized = authenticated_session(&app_state, &headers).await.is_ok();
    Json(VerifyResponse { authorized })
}

pub async fn logout_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(session_id) =
        session_id_from_headers(&headers, &app_state.config.app.session_secret)
    {
        app_state.sessions.remove(&session_id).await;
    }

    [(SET_COOKIE, cleared_session_cookie())]
}

/// Manual ping: always recorded locally, forwarded to the webhook when one
/// is configured. Webhook failures come back as a warning, never an error.
pub async fn ping_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PingResult>, SessionError> {
    let session = authenticated_session(&app_state, &headers).await?;
    let time = Local::now().format("%H:%M:%S").to_string();

    let Some(url) = session.settings.webhook_url() else {
        return Ok(Json(PingResult {
            sent: false,
            time,
            webhook: None,
            warning: None,
        }));
    };

    let result = match app_state.webhook.ping(url, "Manual ping").await {
        Ok(response) => PingResult {
            sent: true,
            time,
            webhook: Some(response),
            warning: None,
        },
        Err(e) => {
            tracing::warn!("Webhook ping failed: {}", e);
            PingResult {
                sent: false,
                time,
                webhook: None,
                warning: Some("Webhook ping failed (check URL)".to_string()),
            }
        }
    };

    Ok(Json(result))
}

pub async fn webhook_test_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, SessionError> {
    let session = authenticated_session(&app_state, &headers).await?;
    let url = session.settings.webhook_url.clone();

    match app_state.webhook.ping(&url, "Test ping").await {
        Ok(response) => Ok(Json(response).into_response()),
        Err(WebhookError::EmptyUrl) => {
            Ok((StatusCode::BAD_REQUEST, "Enter webhook URL first.").into_response())
        }
        Err(e) => {
            tracing::warn!("Webhook test failed: {}", e);
            Ok((StatusCode::BAD_GATEWAY, e.to_string()).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_cookie_round_trip() {
        let signed = create_signed_cookie("secret", "abc-123").unwrap();
        assert!(signed.starts_with("abc-123:"));
        assert!(verify_signed_cookie("secret", &signed));
        assert!(!verify_signed_cookie("other-secret", &signed));
        assert!(!verify_signed_cookie("secret", "abc-123:forged"));
        assert!(!verify_signed_cookie("secret", "no-signature"));
    }

    #[test]
    fn test_get_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", "theme=dark; session=abc:sig ; other=1".parse().unwrap());
        assert_eq!(
            get_cookie_value(&headers, "session"),
            Some("abc:sig".to_string())
        );
        assert_eq!(get_cookie_value(&headers, "missing"), None);
    }
}
