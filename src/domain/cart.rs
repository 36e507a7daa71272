use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::errors::DomainError;

/// Upper bound on the quantity of a single cart line.
pub const MAX_LINE_QUANTITY: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            other => Err(DomainError::Internal(format!(
                "unknown discount type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CouponView {
    pub code: String,
    pub discount_type: DiscountType,
    pub amount: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct AddItemInput {
    pub product_id: Uuid,
    pub sku: String,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CartLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub image_url: Option<String>,
    pub sku: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    /// Product price captured when the line was added, not the live price.
    pub unit_price: BigDecimal,
    pub line_total: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lines: Vec<CartLineView>,
    pub coupon: Option<CouponView>,
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
}
