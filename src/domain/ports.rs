use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::cart::{AddItemInput, CartView};
use super::errors::DomainError;
use super::order::{ListResult, OrderView, PlaceOrderInput};
use super::status::{OrderStatus, PaymentStatus};

pub trait CartRepository: Send + Sync + 'static {
    fn get_or_create(&self, user_id: Uuid) -> Result<CartView, DomainError>;
    fn add_item(&self, user_id: Uuid, input: AddItemInput) -> Result<CartView, DomainError>;
    fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError>;
    fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError>;
    fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError>;
    fn apply_coupon(&self, user_id: Uuid, code: &str) -> Result<CartView, DomainError>;
}

#[derive(Debug, Clone)]
pub struct TrackingUpdate {
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Convert the user's cart into an order in a single transactional unit:
    /// conditional stock decrement, totals, order number allocation, coupon
    /// usage, and cart clearing all commit or roll back together.
    fn place(&self, user_id: Uuid, input: PlaceOrderInput) -> Result<OrderView, DomainError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn find_by_number(&self, order_number: &str) -> Result<Option<OrderView>, DomainError>;
    fn list(
        &self,
        user_id: Option<Uuid>,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError>;

    /// Customer-initiated cancel: restores stock and stamps `cancelled_at`.
    fn cancel(&self, user_id: Uuid, id: Uuid) -> Result<OrderView, DomainError>;

    /// Admin transition to `target`, guarded by the lifecycle table.
    fn update_status(
        &self,
        id: Uuid,
        target: OrderStatus,
        tracking: TrackingUpdate,
    ) -> Result<OrderView, DomainError>;

    fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<OrderView, DomainError>;

    /// Webhook-driven settlement result, keyed by order number.
    fn record_payment_result(
        &self,
        order_number: &str,
        status: PaymentStatus,
    ) -> Result<OrderView, DomainError>;
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub intent_id: String,
    pub client_secret: String,
}

pub trait PaymentGateway: Send + Sync + 'static {
    fn create_intent(
        &self,
        amount: &BigDecimal,
        currency: &str,
        order_number: &str,
    ) -> Result<PaymentIntent, DomainError>;

    /// Mobile-money STK push; returns the gateway's checkout request id.
    fn initiate_stk_push(
        &self,
        phone: &str,
        amount: &BigDecimal,
        reference: &str,
    ) -> Result<String, DomainError>;
}

/// Outbound customer notifications. Callers treat sends as fire-and-forget:
/// a failed send is logged and never fails the parent operation.
pub trait Notifier: Send + Sync + 'static {
    fn order_confirmation(&self, order: &OrderView) -> Result<(), DomainError>;
    fn payment_received(&self, order: &OrderView) -> Result<(), DomainError>;
}
