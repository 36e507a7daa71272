use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{
    cart_items, carts, coupons, order_counters, order_items, orders, product_variants, products,
};

// ── Products ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub image_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub image_url: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = product_variants)]
#[diesel(belongs_to(ProductRow, foreign_key = product_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VariantRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub size: String,
    pub color: String,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = product_variants)]
pub struct NewVariantRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub size: String,
    pub color: String,
    pub stock: i32,
}

// ── Coupons ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CouponRow {
    pub id: Uuid,
    pub code: String,
    pub discount_type: String,
    pub amount: BigDecimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub times_used: i32,
    pub active: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = coupons)]
pub struct NewCouponRow {
    pub id: Uuid,
    pub code: String,
    pub discount_type: String,
    pub amount: BigDecimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub times_used: i32,
    pub active: bool,
}

// ── Carts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub coupon_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = carts)]
pub struct NewCartRow {
    pub id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = cart_items)]
#[diesel(belongs_to(CartRow, foreign_key = cart_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub variant_sku: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub variant_sku: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub shipping_method: String,
    pub shipping_address: Value,
    pub notes: Option<String>,
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
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub shipping_method: String,
    pub shipping_address: Value,
    pub notes: Option<String>,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub tax: BigDecimal,
    pub discount: BigDecimal,
    pub grand_total: BigDecimal,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub variant_sku: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_total: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub variant_sku: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_total: BigDecimal,
}

/// Changeset for admin status transitions. `None` fields are left untouched.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderStatusChangeset {
    pub status: String,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

// ── Order number counter ─────────────────────────────────────────────────────

#[derive(Debug, Insertable)]
#[diesel(table_name = order_counters)]
pub struct NewCounterRow {
    pub day: NaiveDate,
    pub last_seq: i32,
}
