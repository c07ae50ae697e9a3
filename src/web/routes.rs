use std::path::PathBuf;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::pages;
use super::{ApiError, SharedState};
use crate::workspace::secure_filename;

const IMAGE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".gif"];

struct Upload {
    file_name: String,
    data: Vec<u8>,
}

async fn read_upload(field: Field<'_>) -> Result<Upload, MultipartError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let data = field.bytes().await?.to_vec();
    Ok(Upload { file_name, data })
}

/// Empties the temp directories before each request except image views.
pub async fn cleanup_temp(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    if !request.uri().path().starts_with("/view/") {
        let cleanup = state.clone();
        let result = tokio::task::spawn_blocking(move || {
            let _guard = cleanup.handler();
            cleanup.workspace.cleanup_temp()
        })
        .await;
        match result {
            Ok(Err(e)) => log::warn!("temp cleanup failed: {e}"),
            Err(e) => log::warn!("temp cleanup task failed: {e}"),
            Ok(Ok(())) => {}
        }
    }
    next.run(request).await
}

pub async fn index() -> Html<String> {
    Html(pages::index(None))
}

pub async fn upload(State(state): State<SharedState>, mut multipart: Multipart) -> Result<Response, ApiError> {
    let bad_upload = |e: MultipartError| ApiError::page(StatusCode::BAD_REQUEST, format!("upload failed: {e}"));
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        if field.name() == Some("file") {
            files.push(read_upload(field).await.map_err(bad_upload)?);
        }
    }
    if files.is_empty() {
        return Err(ApiError::page(StatusCode::BAD_REQUEST, "no file uploaded"));
    }
    if files[0].file_name.is_empty() {
        return Err(ApiError::page(StatusCode::BAD_REQUEST, "no file selected"));
    }

    let is_ress = |u: &&Upload| u.file_name.ends_with(".resS");
    let main = files
        .iter()
        .find(|u| !is_ress(u))
        .ok_or_else(|| ApiError::page(StatusCode::BAD_REQUEST, "please upload a .assets file"))?;
    let ress = files.iter().find(is_ress);

    let name = secure_filename(&main.file_name);
    if name.is_empty() {
        return Err(ApiError::page(StatusCode::BAD_REQUEST, "invalid file name"));
    }
    let main_path = state.workspace.uploads.join(&name);
    let write_failed = |e: std::io::Error| ApiError::page(StatusCode::INTERNAL_SERVER_ERROR, format!("cannot store upload: {e}"));
    tokio::fs::write(&main_path, &main.data).await.map_err(write_failed)?;
    if let Some(ress) = ress {
        tokio::fs::write(state.workspace.uploads.join(format!("{name}.resS")), &ress.data)
            .await
            .map_err(write_failed)?;
    }
    log::info!("received {name} ({} bytes, resS: {})", main.data.len(), ress.is_some());

    let worker = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let mut handler = worker.handler();
        handler.set_files(&main_path)?;
        let extracted = handler.extract_textures()?;
        let summary = if extracted.is_empty() { handler.type_summary()? } else { Default::default() };
        Ok::<_, crate::UnityError>((extracted, summary))
    })
    .await
    .map_err(|e| ApiError::page(StatusCode::INTERNAL_SERVER_ERROR, format!("processing task failed: {e}")))?;

    let (extracted, summary) =
        outcome.map_err(|e| ApiError::page(StatusCode::BAD_REQUEST, format!("error while processing the file: {e}")))?;
    if extracted.is_empty() {
        let types = summary.iter().map(|(class, count)| format!("{class} ({count})")).collect::<Vec<_>>().join(", ");
        let types = if types.is_empty() { "none".to_string() } else { types };
        return Err(ApiError::page(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("no extractable textures found; object types in this file: {types}"),
        ));
    }
    Ok(Html(pages::results(&extracted)).into_response())
}

pub async fn view(State(state): State<SharedState>, Path(filename): Path<String>) -> Response {
    let Some(path) = state.workspace.extracted_file(&filename) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match tokio::fs::read(&path).await {
        Ok(data) => ([(header::CONTENT_TYPE, "image/png")], data).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct ReplaceResponse {
    pub success: bool,
    pub message: String,
}

pub async fn replace_texture(State(state): State<SharedState>, mut multipart: Multipart) -> Result<Json<ReplaceResponse>, ApiError> {
    let bad_request = |message: &str| ApiError::replace(StatusCode::BAD_REQUEST, message);
    let mut image = None;
    let mut path_id = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| bad_request(&e.to_string()))? {
        match field.name() {
            Some("file") if image.is_none() => image = Some(read_upload(field).await.map_err(|e| bad_request(&e.to_string()))?),
            Some("path_id") => path_id = Some(field.text().await.map_err(|e| bad_request(&e.to_string()))?),
            _ => {}
        }
    }

    let image = image.ok_or_else(|| bad_request("no file uploaded"))?;
    let path_id = path_id.filter(|p| !p.trim().is_empty()).ok_or_else(|| bad_request("no path id given"))?;
    if image.file_name.is_empty() {
        return Err(bad_request("no file selected"));
    }
    let lower = image.file_name.to_lowercase();
    if !IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Err(bad_request("please choose an image file"));
    }
    let path_id: i64 = path_id.trim().parse().map_err(|_| bad_request("path id must be an integer"))?;
    let mut temp_name = secure_filename(&image.file_name);
    if temp_name.is_empty() {
        temp_name = "replacement.png".to_string();
    }

    let worker = state.clone();
    let (success, message) = tokio::task::spawn_blocking(move || {
        let mut handler = worker.handler();
        let temp: PathBuf = worker.workspace.upload_temp().join(temp_name);
        std::fs::write(&temp, &image.data)?;
        let result = handler.replace_texture(path_id, &temp);
        if let Err(e) = std::fs::remove_file(&temp) {
            log::warn!("cannot remove {}: {e}", temp.display());
        }
        Ok::<_, std::io::Error>(result)
    })
    .await
    .map_err(|e| ApiError::replace(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| ApiError::replace(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ReplaceResponse { success, message }))
}

pub async fn download_modified(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let not_found = || ApiError::Download(StatusCode::NOT_FOUND, "no modified file to download".to_string());
    let worker = state.clone();
    let path = tokio::task::spawn_blocking(move || worker.handler().modified_file().map(|p| p.to_path_buf()))
        .await
        .map_err(|e| ApiError::Download(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(not_found)?;
    let data = tokio::fs::read(&path).await.map_err(|_| not_found())?;
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{name}\"")),
        ],
        data,
    )
        .into_response())
}
