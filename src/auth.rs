//! Authenticated principal, as handed to us by the upstream auth middleware.
//!
//! The gateway in front of this service terminates authentication and
//! forwards the verified identity in `x-user-id` / `x-user-role` headers;
//! this extractor treats them as trusted input.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let id = req
            .headers()
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());

        let result = match id {
            Some(id) => {
                let role = match req.headers().get("x-user-role").and_then(|v| v.to_str().ok()) {
                    Some("admin") => Role::Admin,
                    _ => Role::Customer,
                };
                Ok(AuthUser { id, role })
            }
            None => Err(AppError::Forbidden),
        };
        ready(result)
    }
}
