//! AppError - errore HTTP unico per handler e middleware

use crate::invites::InviteError;
use crate::notifications::NotifyError;
use crate::repositories::StoreError;
use axum::http::{HeaderValue, header};
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_attempts: Option<i32>,
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: &'static str,
    code: Option<&'static str>,
    details: Option<String>,
    retry_after_seconds: Option<i64>,
    remaining_attempts: Option<i32>,
}

impl AppError {
    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self {
            status,
            message,
            code: None,
            details: None,
            retry_after_seconds: None,
            remaining_attempts: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Codice stabile letto dal client (es. `INVITE_EXPIRED`)
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    /// Also sets the `Retry-After` header
    pub fn with_retry_after(mut self, seconds: i64) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }

    pub fn with_remaining_attempts(mut self, remaining: i32) -> Self {
        self.remaining_attempts = Some(remaining);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> Option<&'static str> {
        self.code
    }

    // Common error constructors
    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: &'static str) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: &'static str) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn gone(message: &'static str) -> Self {
        Self::new(StatusCode::GONE, message)
    }

    pub fn locked(message: &'static str) -> Self {
        Self::new(StatusCode::LOCKED, message)
    }

    pub fn too_many_requests(message: &'static str) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn internal_server_error(message: &'static str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_gateway(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable(message: &'static str) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        error!("Database error: {}", err);
        match err {
            sqlx::Error::RowNotFound => Self::not_found("Resource not found"),

            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::service_unavailable("Database unavailable")
            }

            _ => Self::internal_server_error("Internal server error"),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => e.into(),
            StoreError::Conflict(_) => {
                Self::conflict("Invite was modified concurrently, please retry")
            }
            StoreError::DuplicateUser => Self::conflict("An account with this email already exists"),
            StoreError::DuplicateMembership { .. } => {
                Self::conflict("User is already a member of this garage")
                    .with_code("DUPLICATE_MEMBERSHIP")
            }
        }
    }
}

impl From<NotifyError> for AppError {
    fn from(err: NotifyError) -> Self {
        error!("Email delivery failed: {}", err);
        Self::bad_gateway("Failed to send email")
    }
}

impl From<InviteError> for AppError {
    fn from(err: InviteError) -> Self {
        match err {
            InviteError::Store(e) => e.into(),
            InviteError::Delivery(e) => e.into(),
            InviteError::PasswordHash(e) => {
                error!("Password hashing failed: {}", e);
                Self::internal_server_error("Internal server error")
            }
            InviteError::Contention(_) | InviteError::Superseded(_) => {
                Self::conflict("Invite was modified concurrently, please retry")
            }
            InviteError::MissingTenant(tenant_id) => {
                error!("Tenant {} referenced but missing", tenant_id);
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

impl From<axum::Error> for AppError {
    fn from(err: axum::Error) -> Self {
        Self::internal_server_error("Internal server error").with_details(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::bad_request("Validation error")
            .with_code("VALIDATION_ERROR")
            .with_details(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let retry_after = self.retry_after_seconds;
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code,
            details: self.details,
            retry_after_seconds: self.retry_after_seconds,
            remaining_attempts: self.remaining_attempts,
        });
        let mut response = (self.status, body).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
