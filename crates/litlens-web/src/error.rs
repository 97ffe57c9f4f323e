//! API error type. Every handler returns `Result<_, ApiError>`; the error
//! renders as `{"error": <kind>, "message": <text>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use litlens_db::DbError;
use litlens_ingestion::SourceError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// An external service (PubMed, Europe PMC, a publisher) failed.
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)   => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_)    => StatusCode::FORBIDDEN,
            ApiError::NotFound(_)     => StatusCode::NOT_FOUND,
            ApiError::Conflict(_)     => StatusCode::CONFLICT,
            ApiError::Upstream(_)     => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_)     => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_)   => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_)    => "forbidden",
            ApiError::NotFound(_)     => "not_found",
            ApiError::Conflict(_)     => "conflict",
            ApiError::Upstream(_)     => "upstream",
            ApiError::Internal(_)     => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.kind(), "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => ApiError::NotFound(what),
            DbError::Conflict(what) => ApiError::Conflict(what),
            other => {
                error!(error = %other, "Database error");
                ApiError::Internal("database error".to_string())
            }
        }
    }
}

impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Upstream(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_map_to_statuses() {
        assert_eq!(ApiError::from(DbError::NotFound("x".into())).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(DbError::Conflict("x".into())).status(), StatusCode::CONFLICT);
        let bad_json = serde_json::from_str::<u8>("x").unwrap_err();
        assert_eq!(ApiError::from(DbError::Serialization(bad_json)).kind(), "internal");
    }

    #[test]
    fn test_source_errors_are_upstream() {
        let err = ApiError::from(SourceError::NotPdf);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.kind(), "upstream");
    }
}
