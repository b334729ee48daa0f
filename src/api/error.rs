use crate::integrations::ConnectorError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Error body: `{"detail": "..."}`
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// Application error types for the integration endpoints
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    ServerError(String),
    BadGateway(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::ServerError(msg)
            | AppError::BadGateway(msg) => msg,
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<ConnectorError> for AppError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::InvalidCredentials(msg) => AppError::BadRequest(msg),
            ConnectorError::Auth(msg) => AppError::Unauthorized(msg),
            ConnectorError::RateLimited(msg) | ConnectorError::Upstream(msg) => {
                AppError::BadGateway(msg)
            }
        }
    }
}
