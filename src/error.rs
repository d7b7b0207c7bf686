use hyper::{header, Body, Response, StatusCode};
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not open database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("database error: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("database connection lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT must be a valid port number, got {0:?}")]
    InvalidPort(String),

    #[error("HOST must be an IP address, got {0:?}")]
    InvalidHost(String),

    #[error("CORS_ALLOWED_ORIGINS contains an unusable origin {0:?}")]
    InvalidOrigin(String),
}

/// Everything a handler can fail with, each mapped to one status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("record not found")]
    NotFound,

    #[error("not found")]
    RouteNotFound,

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Response<Body> {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }
        let body = json!({ "error": self.to_string() }).to_string();
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        response
    }
}
