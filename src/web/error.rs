use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::pages;

/// Failure of a request, rendered in the shape its route answers with.
#[derive(Debug)]
pub enum ApiError {
    /// Upload page with the message shown as an error.
    Page(StatusCode, String),
    /// `{"success": false, "message": ...}` as sent by `/replace_texture`.
    Replace(StatusCode, String),
    /// `{"error": ...}` as sent by `/download_modified`.
    Download(StatusCode, String),
}

impl ApiError {
    pub fn page(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Page(status, message.into())
    }

    pub fn replace(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Replace(status, message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Page(status, _) | Self::Replace(status, _) | Self::Download(status, _) => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Page(status, message) => {
                if status.is_server_error() {
                    log::error!("{message}");
                }
                (status, Html(pages::index(Some(&message)))).into_response()
            }
            Self::Replace(status, message) => (status, Json(json!({ "success": false, "message": message }))).into_response(),
            Self::Download(status, message) => (status, Json(json!({ "error": message }))).into_response(),
        }
    }
}
