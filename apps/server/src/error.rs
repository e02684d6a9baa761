//! Error types for the variant search server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;
use thiserror::Error;
use togovar_format::FormattedResponse;
use togovar_query::ValidationErrors;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Search backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("Search backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Query error: {0}")]
    Query(#[from] togovar_query::Error),

    #[error("Formatter error: {0}")]
    Format(#[from] togovar_format::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Backend(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_)
            | Error::Registry(_)
            | Error::Query(_)
            | Error::Format(_)
            | Error::Internal(_)
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Messages placed in the response `error` array.
    fn messages(&self) -> Vec<String> {
        match self {
            Error::Validation(errors) => errors.messages(),
            Error::BadRequest(message) => vec![message.clone()],
            Error::Timeout(_) => vec!["Search backend did not respond in time".to_string()],
            Error::Backend(_) => vec!["Search backend is unavailable".to_string()],
            _ => vec!["Internal server error".to_string()],
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        match status {
            StatusCode::BAD_REQUEST => tracing::debug!("Rejected request: {}", self),
            StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
                tracing::warn!("Backend failure: {}", self)
            }
            _ => tracing::error!("Internal error: {}", self),
        }

        let body = Json(FormattedResponse::errors(self.messages()));
        (status, body).into_response()
    }
}
