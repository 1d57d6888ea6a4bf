use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use tracing::{error, warn};

impl Error {
    /// HTTP status reported for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            e if e.is_input_error() => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::CalendarFetch { .. } | Error::CalendarParse { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let code = self
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "hackboard::other".to_string());
        let body = Json(json!({
            "error": self.to_string(),
            "code": code,
        }));

        (status, body).into_response()
    }
}
