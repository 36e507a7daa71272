use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("access denied")]
    Forbidden,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient stock for {0}")]
    InsufficientStock(String),

    #[error("invalid coupon '{0}'")]
    InvalidCoupon(String),

    #[error("cannot change order status from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("cart is empty")]
    EmptyCart,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(what) => AppError::NotFound(what),
            DomainError::Forbidden => AppError::Forbidden,
            DomainError::InvalidInput(msg) => AppError::InvalidInput(msg),
            DomainError::InsufficientStock(product) => AppError::InsufficientStock(product),
            DomainError::InvalidCoupon(code) => AppError::InvalidCoupon(code),
            DomainError::InvalidStatusTransition { from, to } => AppError::InvalidStatusTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            },
            DomainError::EmptyCart => AppError::EmptyCart,
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_) | AppError::InvalidCoupon(_) | AppError::EmptyCart => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::InsufficientStock(_) | AppError::InvalidStatusTransition { .. } => {
                StatusCode::CONFLICT
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // Never leak internal details to the caller.
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "message": message
        }))
    }
}
