use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::models::PaymentStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("no free bib number after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },

    #[error("registration is full ({limit} participants)")]
    CapacityReached { limit: u32 },

    #[error("registrant not found")]
    NotFound,

    #[error("payment status cannot change from {from} to {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("authentication required")]
    Unauthorized,

    #[error("storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::AllocationExhausted { .. }
            | AppError::CapacityReached { .. }
            | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) | AppError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::AllocationExhausted { .. } => "allocation_exhausted",
            AppError::CapacityReached { .. } => "capacity_reached",
            AppError::NotFound => "not_found",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Unauthorized => "unauthorized",
            AppError::Storage(_) => "storage_unavailable",
            AppError::PasswordHash(_) => "internal_error",
        }
    }

    /// Message safe to show to a client. Internal failures are not echoed back.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Storage(_) | AppError::PasswordHash(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let mut body = json!({
            "error": self.code(),
            "message": self.public_message(),
        });
        if let AppError::Validation { field, .. } = &self {
            body["field"] = json!(field);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_http_status() {
        let validation = AppError::Validation {
            field: "name",
            message: "too short",
        };
        assert_eq!(validation.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            AppError::AllocationExhausted { attempts: 3 }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::CapacityReached { limit: 100 }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Storage(sqlx::Error::PoolTimedOut).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_details_stay_out_of_the_public_message() {
        let err = AppError::Storage(sqlx::Error::Protocol("disk I/O error at /var/db".into()));
        assert_eq!(err.public_message(), "internal server error");
        assert_eq!(err.code(), "storage_unavailable");
    }
}
