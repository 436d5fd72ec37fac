//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Handlers and stores both speak `AppError`, so a failure anywhere between the
//! database and the route is mapped onto one of a handful of client-facing buckets.
//!
//! `AppError` implements `actix_web::error::ResponseError` to convert application
//! errors into HTTP responses with JSON bodies. Authentication failures always render
//! the same generic body; the detail carried by `Unauthorized` is for logs only.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing, malformed, expired or revoked credentials (HTTP 401).
    /// The message is logged but never sent to the client.
    Unauthorized(String),
    /// Login with an unknown email or a wrong password (HTTP 400).
    /// Both cases look the same to the caller.
    AuthFailed,
    /// A client-side error due to a malformed or invalid request (HTTP 400).
    BadRequest(String),
    /// An update touched fields outside the allowed set (HTTP 400).
    InvalidFields(String),
    /// The requested resource does not exist or belongs to someone else (HTTP 404).
    NotFound(String),
    /// An unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// An error originating from the storage backend (HTTP 500).
    DatabaseError(String),
    /// Failed input validation (HTTP 400).
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::AuthFailed => write!(f, "Authentication failed"),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::InvalidFields(msg) => write!(f, "Invalid Fields: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthFailed
            | AppError::BadRequest(_)
            | AppError::InvalidFields(_)
            | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Unauthorized(_) => "Please authenticate.".to_string(),
            AppError::AuthFailed => "Unable to login".to_string(),
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                log::error!("{}", self);
                "Internal server error".to_string()
            }
            AppError::BadRequest(msg)
            | AppError::InvalidFields(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg) => msg.clone(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// Unique-constraint violations can only come from the users' email index,
/// so they surface as a 400 rather than a 500.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(ref db)
                if db.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                AppError::BadRequest("Email already registered".into())
            }
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> AppError {
        AppError::DatabaseError(error.to_string())
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// Undecodable or unsupported image data is the uploader's fault.
impl From<image::ImageError> for AppError {
    fn from(error: image::ImageError) -> AppError {
        match error {
            image::ImageError::IoError(e) => AppError::InternalServerError(e.to_string()),
            other => AppError::BadRequest(format!("Unable to process image: {}", other)),
        }
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> AppError {
        AppError::BadRequest(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: AppError) -> serde_json::Value {
        let response = error.error_response();
        let body = actix_web::body::to_bytes(response.into_body())
            .await
            .unwrap_or_default();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_error_responses() {
        let error = AppError::Unauthorized("Invalid token".into());
        assert_eq!(error.error_response().status(), 401);

        let error = AppError::AuthFailed;
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::InvalidFields("Invalid updates!".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::ValidationError("bad email".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::NotFound("Resource not found".into());
        assert_eq!(error.error_response().status(), 404);

        let error = AppError::DatabaseError("connection reset".into());
        assert_eq!(error.error_response().status(), 500);
    }

    #[actix_web::test]
    async fn test_unauthorized_body_hides_detail() {
        let json = body_json(AppError::Unauthorized("InvalidSignature".into())).await;
        assert_eq!(json["error"], "Please authenticate.");
    }

    #[actix_web::test]
    async fn test_internal_body_hides_detail() {
        let json = body_json(AppError::DatabaseError("relation users missing".into())).await;
        assert_eq!(json["error"], "Internal server error");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            AppError::from(sqlx::Error::RowNotFound),
            AppError::NotFound(_)
        ));
    }
}
