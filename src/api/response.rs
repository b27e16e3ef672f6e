//! Response envelope shared by every endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// `{ code, status, message, data }` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebResponse<T> {
    pub code: u16,
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> WebResponse<T> {
    pub fn new<S: Into<String>>(status: StatusCode, message: S, data: Option<T>) -> Self {
        Self {
            code: status.as_u16(),
            status: status_label(status),
            message: message.into(),
            data,
        }
    }

    pub fn ok<S: Into<String>>(message: S, data: T) -> Self {
        Self::new(StatusCode::OK, message, Some(data))
    }
}

impl WebResponse<()> {
    pub fn message<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self::new(status, message, None)
    }
}

impl<T: Serialize> IntoResponse for WebResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Upper-cased canonical reason, e.g. `BAD REQUEST`.
fn status_label(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("UNKNOWN").to_uppercase()
}
