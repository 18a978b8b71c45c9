use super::{
    CaptionRequest, CreateSectionRequest, FeaturedQuery, GalleryError, ImageQuery, SharedGallery,
    UploadReport,
};
use crate::{AppState, session::authenticated_session};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::{error, warn};

/// Run a blocking store operation off the async runtime.
async fn with_gallery<T, F>(gallery: &SharedGallery, op: F) -> Result<T, GalleryError>
where
    F: FnOnce(&super::Gallery) -> Result<T, GalleryError> + Send + 'static,
    T: Send + 'static,
{
    let gallery = gallery.clone();
    tokio::task::spawn_blocking(move || op(&gallery))
        .await
        .map_err(|e| {
            error!("Gallery task panicked: {}", e);
            GalleryError::IoError(std::io::Error::other(e.to_string()))
        })?
}

pub async fn list_sections_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = authenticated_session(&app_state, &headers).await {
        return e.into_response();
    }

    match with_gallery(&app_state.gallery, |g| Ok(g.section_summaries())).await {
        Ok(sections) => Json(sections).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_section_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateSectionRequest>,
) -> Response {
    if let Err(e) = authenticated_session(&app_state, &headers).await {
        return e.into_response();
    }

    match with_gallery(&app_state.gallery, move |g| g.try_create_section(&request.name)).await {
        Ok(name) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "name": name })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_section_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(section): Path<String>,
) -> Response {
    if let Err(e) = authenticated_session(&app_state, &headers).await {
        return e.into_response();
    }

    match with_gallery(&app_state.gallery, move |g| g.delete_section(&section)).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_images_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(section): Path<String>,
) -> Response {
    if let Err(e) = authenticated_session(&app_state, &headers).await {
        return e.into_response();
    }

    match with_gallery(&app_state.gallery, move |g| Ok(g.list_images(&section))).await {
        Ok(images) => Json(images).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Multipart upload. Each file is stored independently; one bad file never
/// stops the rest of the batch.
pub async fn upload_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(section): Path<String>,
    mut multipart: Multipart,
) -> Response {
    if let Err(e) = authenticated_session(&app_state, &headers).await {
        return e.into_response();
    }
    if !super::is_valid_section_name(&section) {
        return GalleryError::InvalidSectionName(section).into_response();
    }

    let mut report = UploadReport::new(&section);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Upload to '{}' ended early: {}", section, e);
                report.record_failure(String::new(), e.body_text());
                break;
            }
        };

        let Some(filename) = field.file_name().map(|n| n.to_string()) else {
            continue;
        };

        let accepted = super::ingest::clean_original_filename(&filename)
            .is_ok_and(|name| super::has_allowed_extension(&name));
        if !accepted {
            report.record_failure(filename, "Unsupported file type".to_string());
            continue;
        }

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                report.record_failure(filename, e.body_text());
                continue;
            }
        };

        let target = section.clone();
        let original = filename.clone();
        match with_gallery(&app_state.gallery, move |g| g.save(&target, &bytes, &original)).await
        {
            Ok(image) => report.record_success(filename, image),
            Err(e) => {
                warn!("Failed to store '{}' in '{}': {}", filename, section, e);
                report.record_failure(filename, e.to_string());
            }
        }
    }

    let status = if report.failed > 0 && report.succeeded == 0 {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };

    (status, Json(report)).into_response()
}

pub async fn image_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(handle): Path<String>,
    Query(query): Query<ImageQuery>,
) -> Response {
    if let Err(e) = authenticated_session(&app_state, &headers).await {
        return e.into_response();
    }

    let path = match app_state.gallery.resolve_handle(&handle) {
        Ok(path) => path,
        Err(e) => return e.into_response(),
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
    };

    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type);

    if query.download {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().replace('"', ""))
            .unwrap_or_default();
        response = response.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        );
    }

    response.body(body).unwrap_or_else(|e| {
        error!("Failed to build image response: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

pub async fn delete_image_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(handle): Path<String>,
) -> Response {
    if let Err(e) = authenticated_session(&app_state, &headers).await {
        return e.into_response();
    }

    match with_gallery(&app_state.gallery, move |g| g.delete_by_handle(&handle)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn set_caption_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(handle): Path<String>,
    Json(request): Json<CaptionRequest>,
) -> Response {
    if let Err(e) = authenticated_session(&app_state, &headers).await {
        return e.into_response();
    }

    match with_gallery(&app_state.gallery, move |g| {
        g.set_caption(&handle, &request.caption)
    })
    .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn hero_handler(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = authenticated_session(&app_state, &headers).await {
        return e.into_response();
    }

    match with_gallery(&app_state.gallery, |g| Ok(g.hero())).await {
        Ok(hero) => Json(hero).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn featured_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FeaturedQuery>,
) -> Response {
    if let Err(e) = authenticated_session(&app_state, &headers).await {
        return e.into_response();
    }

    let limit = query
        .limit
        .unwrap_or(app_state.config.storage.featured_limit)
        .min(app_state.config.storage.featured_limit);

    match with_gallery(&app_state.gallery, move |g| Ok(g.featured(limit))).await {
        Ok(featured) => Json(featured).into_response(),
        Err(e) => e.into_response(),
    }
}
