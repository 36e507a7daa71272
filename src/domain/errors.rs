use thiserror::Error;

use super::status::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
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
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("cart is empty")]
    EmptyCart,

    #[error("internal error: {0}")]
    Internal(String),
}
