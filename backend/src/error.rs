use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

pub const INTERNAL_ERROR_MESSAGE: &str = "Error interno del servidor";

// Define a custom error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Token signing error: {0}")]
    JwtError(jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordError(bcrypt::BcryptError),

    #[error("{0}")]
    BadRequest(String),

    /// A body that could not be read as the expected JSON. Keeps the extractor's status.
    #[error("{1}")]
    InvalidBody(StatusCode, String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Token no proporcionado")]
    MissingToken,

    #[error("Token inválido o expirado")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A report over an empty collection.
    #[error("{0}")]
    NoData(String),

    #[error("{message}")]
    Validation {
        message: String,
        errors: ValidationErrors,
    },
}

impl AppError {
    pub fn invalid_fields(message: impl Into<String>, errors: ValidationErrors) -> Self {
        AppError::Validation {
            message: message.into(),
            errors,
        }
    }
}

/// One message per failing field, as `{ "title": "El campo no puede estar vacío" }`.
fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let message = errs
                .first()
                .map(|err| {
                    err.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string())
                })
                .unwrap_or_default();
            (field.to_string(), message)
        })
        .collect()
}

fn internal(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "ok": false, "error": INTERNAL_ERROR_MESSAGE, "message": message })),
    )
        .into_response()
}

// Implement IntoResponse to convert AppError into an HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                return internal(msg);
            }
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {}", e);
                return internal(e.to_string());
            }
            AppError::JwtError(e) => {
                tracing::error!("JWT error: {}", e);
                return internal(e.to_string());
            }
            AppError::PasswordError(e) => {
                tracing::error!("Password error: {}", e);
                return internal(e.to_string());
            }
            AppError::NotFound(msg) => {
                return (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response();
            }
            AppError::NoData(msg) => {
                return (StatusCode::NOT_FOUND, Json(json!({ "ok": false, "message": msg }))).into_response();
            }
            AppError::Validation { message, errors } => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "message": message, "errors": field_messages(&errors) })),
                )
                    .into_response();
            }
            err @ (AppError::MissingToken | AppError::InvalidToken) => {
                tracing::warn!("Rejected request: {}", err);
                (StatusCode::UNAUTHORIZED, err.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidBody(status, msg) => {
                tracing::warn!("Rejected request body: {}", msg);
                (status, msg)
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({ "message": message }));
        (status, body).into_response()
    }
}

// Add From implementations for easy '?' conversion in handlers
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::DatabaseError(e)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::JwtError(e)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::PasswordError(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidBody(rejection.status(), rejection.body_text())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::InternalServerError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use validator::ValidationError;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_errors_list_each_field() {
        let mut errors = ValidationErrors::new();
        let mut error = ValidationError::new("invalid");
        error.message = Some("El campo no puede estar vacío".into());
        errors.add("title", error);

        let response = AppError::invalid_fields("Completar los campos correctamente", errors).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_of(response).await;
        assert_eq!(body["message"], "Completar los campos correctamente");
        assert_eq!(body["errors"]["title"], "El campo no puede estar vacío");
    }

    #[tokio::test]
    async fn not_found_uses_the_error_key() {
        let response = AppError::NotFound("Cancion no encontrada".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, json!({ "error": "Cancion no encontrada" }));
    }

    #[tokio::test]
    async fn storage_failures_pass_the_message_through() {
        let response = AppError::DatabaseError(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);
        assert_eq!(body["message"], sqlx::Error::RowNotFound.to_string());
    }

    #[tokio::test]
    async fn rejected_bodies_keep_their_status_and_answer_json() {
        let response = AppError::InvalidBody(StatusCode::UNPROCESSABLE_ENTITY, "name: invalid type".into())
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_of(response).await, json!({ "message": "name: invalid type" }));
    }

    #[tokio::test]
    async fn token_failures_are_unauthorized() {
        let response = AppError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(response).await["message"], "Token inválido o expirado");
    }
}
