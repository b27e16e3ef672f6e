use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::response::WebResponse;
use crate::errors::Error;

/// Error rendered as the `{ code, status, message }` envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    field: Option<String>,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self { status, message: message.into(), field: None }
    }

    pub fn bad_request<S: Into<String>>(msg: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let data = self.field.map(|field| json!({ "field": field }));
        WebResponse::new(self.status, self.message, data).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match err {
            Error::Validation { message, field } => Self { status, message, field },
            Error::InvalidateFailure { .. }
            | Error::Database { .. }
            | Error::Config(_)
            | Error::Internal(_) => {
                tracing::error!(error = %err, kind = err.kind(), "request failed");
                Self::new(status, "Internal server error")
            }
            other => Self::new(status, other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid request format: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("Invalid query parameters: {}", rejection.body_text()))
    }
}
