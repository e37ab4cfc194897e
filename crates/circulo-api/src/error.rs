use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

const NOT_FOUND_PAGE: &str = "<!doctype html><title>Not found</title><h1>Not found</h1>\
<p>The page you asked for does not exist.</p><p><a href=\"/\">Home</a></p>";

const SERVER_ERROR_PAGE: &str = "<!doctype html><title>Server error</title><h1>Server error</h1>\
<p>Something went wrong. Please try again.</p><p><a href=\"/\">Home</a></p>";

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing record, or a record the viewer does not own.
    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response(),
            other => {
                error!("Request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(SERVER_ERROR_PAGE)).into_response()
            }
        }
    }
}
