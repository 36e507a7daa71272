use std::fmt;

use super::errors::DomainError;

/// Order lifecycle states. Stored as lowercase strings in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(DomainError::InvalidInput(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }

    /// Whether moving from `self` to `to` is a legal lifecycle step.
    ///
    /// Every status change (customer cancel, payment confirmation, admin
    /// updates) goes through this table; there is no unguarded path.
    pub fn can_transition(self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
                | (Delivered, Refunded)
                | (Cancelled, Refunded)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment settlement state, tracked independently of the order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::InvalidInput(format!(
                "unknown payment status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use super::*;

    #[test]
    fn forward_path_is_legal() {
        assert!(Pending.can_transition(Confirmed));
        assert!(Confirmed.can_transition(Processing));
        assert!(Processing.can_transition(Shipped));
        assert!(Shipped.can_transition(Delivered));
    }

    #[test]
    fn cancel_is_legal_before_shipping_only() {
        assert!(Pending.can_transition(Cancelled));
        assert!(Confirmed.can_transition(Cancelled));
        assert!(Processing.can_transition(Cancelled));
        assert!(!Shipped.can_transition(Cancelled));
        assert!(!Delivered.can_transition(Cancelled));
        assert!(!Cancelled.can_transition(Cancelled));
    }

    #[test]
    fn illegal_jumps_are_rejected() {
        assert!(!Pending.can_transition(Delivered));
        assert!(!Pending.can_transition(Shipped));
        assert!(!Confirmed.can_transition(Delivered));
        assert!(!Delivered.can_transition(Pending));
    }

    #[test]
    fn refund_is_reachable_from_terminal_states() {
        assert!(Delivered.can_transition(Refunded));
        assert!(Cancelled.can_transition(Refunded));
        assert!(!Pending.can_transition(Refunded));
        assert!(!Refunded.can_transition(Cancelled));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::parse("unknown").is_err());
    }

    #[test]
    fn payment_status_round_trips_through_strings() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(PaymentStatus::parse("paid").is_err());
    }
}
