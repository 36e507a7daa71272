use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, OrderView, PlaceOrderInput, TrackingView};
use crate::domain::ports::{Notifier, OrderRepository, TrackingUpdate};
use crate::domain::status::{OrderStatus, PaymentStatus};

pub struct OrderService<R, N> {
    repo: R,
    notifier: N,
}

impl<R: OrderRepository, N: Notifier> OrderService<R, N> {
    pub fn new(repo: R, notifier: N) -> Self {
        Self { repo, notifier }
    }

    pub fn place_order(
        &self,
        user_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<OrderView, DomainError> {
        input.shipping_address.validate()?;
        let order = self.repo.place(user_id, input)?;

        // Fire-and-forget: the order is already committed.
        if let Err(e) = self.notifier.order_confirmation(&order) {
            log::warn!(
                "order confirmation notification failed for {}: {}",
                order.order_number,
                e
            );
        }
        Ok(order)
    }

    pub fn get_order(
        &self,
        user_id: Uuid,
        is_admin: bool,
        id: Uuid,
    ) -> Result<OrderView, DomainError> {
        let order = self
            .repo
            .find_by_id(id)?
            .ok_or_else(|| DomainError::NotFound("order".to_string()))?;
        if !is_admin && order.user_id != user_id {
            return Err(DomainError::Forbidden);
        }
        Ok(order)
    }

    pub fn list_own(
        &self,
        user_id: Uuid,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        self.repo
            .list(Some(user_id), status, page.max(1), limit.clamp(1, 100))
    }

    pub fn list_all(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        self.repo
            .list(None, status, page.max(1), limit.clamp(1, 100))
    }

    pub fn cancel(&self, user_id: Uuid, id: Uuid) -> Result<OrderView, DomainError> {
        self.repo.cancel(user_id, id)
    }

    pub fn update_status(
        &self,
        id: Uuid,
        target: OrderStatus,
        tracking: TrackingUpdate,
    ) -> Result<OrderView, DomainError> {
        self.repo.update_status(id, target, tracking)
    }

    pub fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<OrderView, DomainError> {
        self.repo.update_payment_status(id, status)
    }

    /// Public tracking by order number; the projection strips payment fields.
    pub fn track(&self, order_number: &str) -> Result<TrackingView, DomainError> {
        let order = self
            .repo
            .find_by_number(order_number)?
            .ok_or_else(|| DomainError::NotFound("order".to_string()))?;
        Ok(TrackingView::from(&order))
    }
}
