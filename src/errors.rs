use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no user identity on request")]
    NotAuthenticated,
    #[error("concurrent update conflict")]
    Conflict,
    #[error("status must be 'present', 'absent' or 'not_held', got '{0}'")]
    InvalidStatus(String),
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("subject must not be empty")]
    InvalidSubject,
    #[error("schedule provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn internal(err: impl std::error::Error) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::InvalidStatus(_)
            | AppError::InvalidDate(_)
            | AppError::InvalidDateRange { .. }
            | AppError::InvalidSubject => StatusCode::BAD_REQUEST,
            AppError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::ProviderUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
