use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::status::{OrderStatus, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Mpesa,
    Stripe,
    Paypal,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "mpesa" => Ok(PaymentMethod::Mpesa),
            "stripe" => Ok(PaymentMethod::Stripe),
            "paypal" => Ok(PaymentMethod::Paypal),
            "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(DomainError::InvalidInput(format!(
                "unsupported payment method '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
    Pickup,
}

impl ShippingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ShippingMethod::Standard => "standard",
            ShippingMethod::Express => "express",
            ShippingMethod::Pickup => "pickup",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "standard" => Ok(ShippingMethod::Standard),
            "express" => Ok(ShippingMethod::Express),
            "pickup" => Ok(ShippingMethod::Pickup),
            other => Err(DomainError::InvalidInput(format!(
                "unsupported shipping method '{}'",
                other
            ))),
        }
    }
}

/// Shipping destination, persisted verbatim on the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub country: String,
}

impl Address {
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("street", &self.street),
            ("city", &self.city),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidInput(format!(
                    "shipping address field '{}' is required",
                    field
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PlaceOrderInput {
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_total: BigDecimal,
}

/// Immutable snapshot of a placed order, denormalized at creation time.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping_method: ShippingMethod,
    pub shipping_address: Address,
    pub notes: Option<String>,
    pub items: Vec<OrderItemView>,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub tax: BigDecimal,
    pub discount: BigDecimal,
    pub grand_total: BigDecimal,
    pub coupon_code: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Public tracking projection. Deliberately carries no payment fields.
#[derive(Debug, Clone)]
pub struct TrackingView {
    pub order_number: String,
    pub status: OrderStatus,
    pub shipping_method: ShippingMethod,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<&OrderView> for TrackingView {
    fn from(order: &OrderView) -> Self {
        TrackingView {
            order_number: order.order_number.clone(),
            status: order.status,
            shipping_method: order.shipping_method,
            tracking_number: order.tracking_number.clone(),
            tracking_url: order.tracking_url.clone(),
            placed_at: order.created_at,
            delivered_at: order.delivered_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<OrderView>,
    pub total: i64,
}
