use axum::{
    Extension, Json,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::value::RawValue;
use std::sync::Arc;

use super::auth::AuthUser;
use super::flash::{self, Flash, FlashLevel};
use super::types::{GeoJsonDetailDto, GeoJsonEntry, MessageResponse, UploadJsonRequest};
use super::validation::validate_id;
use super::{ApiError, AppState, PageError, pages};
use crate::domain::{FileId, Identity};
use crate::services::{SigError, UploadInput};
use tower_sessions::Session;

/// Reads the upload form: a non-empty `file` part wins over `raw_json`.
async fn read_upload(mut multipart: Multipart) -> Result<UploadInput, String> {
    let mut name = None;
    let mut file: Option<(Option<String>, String)> = None;
    let mut raw_json = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        match field.name().unwrap_or_default() {
            "name" => name = Some(field.text().await.map_err(|e| e.body_text())?),
            "raw_json" => raw_json = Some(field.text().await.map_err(|e| e.body_text())?),
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| e.body_text())?;
                if !bytes.is_empty() {
                    let text = String::from_utf8(bytes.to_vec())
                        .map_err(|_| "Uploaded file must be UTF-8 text".to_string())?;
                    file = Some((filename, text));
                }
            }
            _ => {}
        }
    }

    let input = match file {
        Some((filename, content)) => UploadInput {
            name,
            filename,
            content,
        },
        None => UploadInput {
            name,
            filename: None,
            content: raw_json.map(|raw| raw.trim().to_string()).unwrap_or_default(),
        },
    };
    Ok(input)
}

/// A JSON string holding the document is unwrapped; anything else is kept as sent.
pub(super) fn json_document(raw: &RawValue) -> Result<String, ApiError> {
    let text = raw.get();
    if text.starts_with('"') {
        serde_json::from_str::<String>(text)
            .map_err(|e| ApiError::validation(format!("Invalid document string: {e}")))
    } else {
        Ok(text.to_string())
    }
}

fn parse_file_id(id: i32) -> Result<FileId, ApiError> {
    validate_id(id, "file").map(FileId::new)
}

// ============================================================================
// Pages
// ============================================================================

/// GET /sig
pub async fn index(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(identity): Extension<Identity>,
    AuthUser(user): AuthUser,
) -> Result<Response, PageError> {
    let count = state.sig().list(&user).await?.len();
    let messages = flash::take(&session).await;
    Ok(pages::sig_index(&identity, &messages, count).into_response())
}

/// GET /sig/files
pub async fn files(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(identity): Extension<Identity>,
    AuthUser(user): AuthUser,
) -> Result<Response, PageError> {
    let files = state.sig().list(&user).await?;
    let messages = flash::take(&session).await;
    Ok(pages::files_page(&identity, &messages, &files).into_response())
}

/// POST /sig/files
pub async fn upload_form(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(identity): Extension<Identity>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> Result<Response, PageError> {
    let result = match read_upload(multipart).await {
        Ok(input) => state.sig().upload(&user, input).await,
        Err(msg) => Err(SigError::Validation(msg)),
    };

    match result {
        Ok(file) => {
            flash::push(
                &session,
                FlashLevel::Success,
                format!("Saved \"{}\".", file.name),
            )
            .await;
            Ok(Redirect::to("/sig/files").into_response())
        }
        Err(SigError::Validation(msg)) => {
            let files = state.sig().list(&user).await?;
            let messages = [Flash {
                level: FlashLevel::Danger,
                message: msg,
            }];
            let page = pages::files_page(&identity, &messages, &files);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /sig/files/{id}/delete
pub async fn delete_form(
    State(state): State<Arc<AppState>>,
    session: Session,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Response, PageError> {
    let id = parse_file_id(id).map_err(|_| PageError::NotFound)?;
    state.sig().delete(&user, id).await?;
    flash::push(&session, FlashLevel::Info, "File removed.").await;
    Ok(Redirect::to("/sig/files").into_response())
}

/// POST /sig/load-examples
pub async fn load_examples(
    State(state): State<Arc<AppState>>,
    session: Session,
    AuthUser(user): AuthUser,
) -> Result<Response, PageError> {
    let outcome = state.sig().load_examples(&user).await?;

    if outcome.created.is_empty() {
        flash::push(&session, FlashLevel::Warning, "Examples are already loaded.").await;
    } else {
        flash::push(
            &session,
            FlashLevel::Success,
            format!("Loaded {} example file(s).", outcome.created.len()),
        )
        .await;
    }
    Ok(Redirect::to("/sig/files").into_response())
}

/// GET /sig/map
pub async fn map(
    session: Session,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    let messages = flash::take(&session).await;
    pages::map_page(&identity, &messages)
}

// ============================================================================
// JSON API
// ============================================================================

/// GET /sig/api/my-geojsons
pub async fn api_my_geojsons(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<GeoJsonEntry>>, ApiError> {
    let files = state.sig().list_with_content(&user).await?;
    let entries = files
        .into_iter()
        .map(GeoJsonEntry::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::internal(format!("Stored document is not JSON: {e}")))?;
    Ok(Json(entries))
}

/// POST /sig/api/upload
/// Accepts a JSON body (`{"name": .., "geojson": ..}`) or the multipart form.
pub async fn api_upload(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    req: Request,
) -> Result<(StatusCode, Json<GeoJsonEntry>), ApiError> {
    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let input = if is_json {
        let Json(body) = Json::<UploadJsonRequest>::from_request(req, &state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        UploadInput {
            name: body.name,
            filename: None,
            content: json_document(&body.geojson)?,
        }
    } else {
        let multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        read_upload(multipart).await.map_err(ApiError::validation)?
    };

    let file = state.sig().upload(&user, input).await?;
    let entry = GeoJsonEntry::try_from(file)
        .map_err(|e| ApiError::internal(format!("Stored document is not JSON: {e}")))?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /sig/api/files/{id}
pub async fn api_get_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<GeoJsonDetailDto>, ApiError> {
    let id = parse_file_id(id).map_err(|_| ApiError::from(SigError::NotFound))?;
    let file = state.sig().get(&user, id).await?;
    let dto = GeoJsonDetailDto::try_from(file)
        .map_err(|e| ApiError::internal(format!("Stored document is not JSON: {e}")))?;
    Ok(Json(dto))
}

/// DELETE /sig/api/files/{id}
pub async fn api_delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_file_id(id).map_err(|_| ApiError::from(SigError::NotFound))?;
    state.sig().delete(&user, id).await?;
    Ok(Json(MessageResponse {
        message: "File deleted".to_string(),
    }))
}
