use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::OrderView;
use crate::domain::ports::{Notifier, OrderRepository, PaymentGateway, PaymentIntent};
use crate::domain::status::PaymentStatus;

/// Currency every amount in the store is denominated in.
const CURRENCY: &str = "KES";

pub struct PaymentService<R, G, N> {
    repo: R,
    gateway: G,
    notifier: N,
}

impl<R, G, N> PaymentService<R, G, N>
where
    R: OrderRepository,
    G: PaymentGateway,
    N: Notifier,
{
    pub fn new(repo: R, gateway: G, notifier: N) -> Self {
        Self {
            repo,
            gateway,
            notifier,
        }
    }

    fn owned_order(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderView, DomainError> {
        let order = self
            .repo
            .find_by_id(order_id)?
            .ok_or_else(|| DomainError::NotFound("order".to_string()))?;
        if order.user_id != user_id {
            return Err(DomainError::Forbidden);
        }
        Ok(order)
    }

    pub fn create_intent(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<PaymentIntent, DomainError> {
        let order = self.owned_order(user_id, order_id)?;
        self.gateway
            .create_intent(&order.grand_total, CURRENCY, &order.order_number)
    }

    pub fn initiate_stk_push(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        phone: &str,
    ) -> Result<String, DomainError> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(DomainError::InvalidInput(
                "phone number is required".to_string(),
            ));
        }
        let order = self.owned_order(user_id, order_id)?;
        self.gateway
            .initiate_stk_push(phone, &order.grand_total, &order.order_number)
    }

    /// Asynchronous confirmation from the processor. Only terminal results
    /// come through the webhook.
    pub fn handle_webhook(
        &self,
        order_number: &str,
        result: &str,
    ) -> Result<OrderView, DomainError> {
        let status = match result {
            "completed" => PaymentStatus::Completed,
            "failed" => PaymentStatus::Failed,
            other => {
                return Err(DomainError::InvalidInput(format!(
                    "unsupported payment result '{}'",
                    other
                )))
            }
        };

        let order = self.repo.record_payment_result(order_number, status)?;

        if status == PaymentStatus::Completed {
            if let Err(e) = self.notifier.payment_received(&order) {
                log::warn!(
                    "payment notification failed for {}: {}",
                    order.order_number,
                    e
                );
            }
        }
        Ok(order)
    }
}
