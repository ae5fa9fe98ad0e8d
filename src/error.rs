use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::aggregates::{CartError, ProductError};

/// Error returned by every handler; renders as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PaymentDeclined(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn not_found(what: &str) -> Self { Self::NotFound(format!("{} not found", what)) }

    pub fn unauthorized() -> Self { Self::Unauthorized("Authentication required".into()) }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return Self::Conflict(match db.constraint() {
                    Some(c) if c.contains("email") => "Email is already registered".into(),
                    Some(c) if c.contains("slug") => "Slug is already in use".into(),
                    _ => "Resource already exists".into(),
                });
            }
            if db.is_foreign_key_violation() {
                return Self::BadRequest("Referenced resource does not exist".into());
            }
        }
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("Not found".into()),
            other => Self::Database(other),
        }
    }
}

impl From<ProductError> for ApiError {
    fn from(e: ProductError) -> Self { Self::BadRequest(e.to_string()) }
}

impl From<CartError> for ApiError {
    fn from(e: CartError) -> Self { Self::BadRequest(e.to_string()) }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self { Self::BadRequest(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self { Self::BadRequest(r.body_text()) }
}

impl From<PathRejection> for ApiError {
    fn from(r: PathRejection) -> Self { Self::BadRequest(r.body_text()) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "database failure");
                json!({ "error": "Internal server error" })
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                json!({ "error": "Internal server error" })
            }
            Self::Validation(errors) => json!({ "error": self.to_string(), "details": errors }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
