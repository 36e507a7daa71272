use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    Address, OrderView, PaymentMethod, PlaceOrderInput, ShippingMethod, TrackingView,
};
use crate::domain::status::OrderStatus;
use crate::errors::AppError;
use crate::infrastructure::notifier::LogNotifier;
use crate::infrastructure::order_repo::DieselOrderRepository;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AddressDto {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub country: String,
}

impl From<AddressDto> for Address {
    fn from(dto: AddressDto) -> Self {
        Address {
            full_name: dto.full_name,
            phone: dto.phone,
            street: dto.street,
            city: dto.city,
            postal_code: dto.postal_code,
            country: dto.country,
        }
    }
}

impl From<Address> for AddressDto {
    fn from(a: Address) -> Self {
        AddressDto {
            full_name: a.full_name,
            phone: a.phone,
            street: a.street,
            city: a.city,
            postal_code: a.postal_code,
            country: a.country,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub shipping_address: AddressDto,
    /// One of "mpesa", "stripe", "paypal", "cash_on_delivery".
    pub payment_method: String,
    /// One of "standard", "express", "pickup". Defaults to "standard".
    pub shipping_method: Option<String>,
    pub notes: Option<String>,
}

impl PlaceOrderRequest {
    fn into_input(self) -> Result<PlaceOrderInput, DomainError> {
        let shipping_method = match self.shipping_method.as_deref() {
            Some(method) => ShippingMethod::parse(method)?,
            None => ShippingMethod::default(),
        };
        Ok(PlaceOrderInput {
            shipping_address: self.shipping_address.into(),
            payment_method: PaymentMethod::parse(&self.payment_method)?,
            shipping_method,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub shipping_method: String,
    pub shipping_address: AddressDto,
    pub notes: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub subtotal: String,
    pub shipping_cost: String,
    pub tax: String,
    pub discount: String,
    pub grand_total: String,
    pub coupon_code: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub cancelled_at: Option<String>,
    pub delivered_at: Option<String>,
    pub created_at: String,
}

impl From<OrderView> for OrderResponse {
    fn from(order: OrderView) -> Self {
        OrderResponse {
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            status: order.status.as_str().to_string(),
            payment_method: order.payment_method.as_str().to_string(),
            payment_status: order.payment_status.as_str().to_string(),
            shipping_method: order.shipping_method.as_str().to_string(),
            shipping_address: order.shipping_address.into(),
            notes: order.notes,
            items: order
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    id: i.id,
                    product_id: i.product_id,
                    product_name: i.product_name,
                    sku: i.sku,
                    size: i.size,
                    color: i.color,
                    quantity: i.quantity,
                    unit_price: i.unit_price.to_string(),
                    line_total: i.line_total.to_string(),
                })
                .collect(),
            subtotal: order.subtotal.to_string(),
            shipping_cost: order.shipping_cost.to_string(),
            tax: order.tax.to_string(),
            discount: order.discount.to_string(),
            grand_total: order.grand_total.to_string(),
            coupon_code: order.coupon_code,
            tracking_number: order.tracking_number,
            tracking_url: order.tracking_url,
            cancelled_at: order.cancelled_at.map(|t| t.to_rfc3339()),
            delivered_at: order.delivered_at.map(|t| t.to_rfc3339()),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

/// Public tracking payload; built from a projection that carries no
/// payment fields.
#[derive(Debug, Serialize, ToSchema)]
pub struct TrackResponse {
    pub order_number: String,
    pub status: String,
    pub shipping_method: String,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub placed_at: String,
    pub delivered_at: Option<String>,
}

impl From<TrackingView> for TrackResponse {
    fn from(t: TrackingView) -> Self {
        TrackResponse {
            order_number: t.order_number,
            status: t.status.as_str().to_string(),
            shipping_method: t.shipping_method.as_str().to_string(),
            tracking_number: t.tracking_number,
            tracking_url: t.tracking_url,
            placed_at: t.placed_at.to_rfc3339(),
            delivered_at: t.delivered_at.map(|d| d.to_rfc3339()),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Optional status filter, e.g. "pending".
    pub status: Option<String>,
}

pub(super) fn default_page() -> i64 {
    1
}

pub(super) fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

pub(super) fn parse_status_filter(
    status: Option<String>,
) -> Result<Option<OrderStatus>, DomainError> {
    status.as_deref().map(OrderStatus::parse).transpose()
}

fn service(pool: DbPool) -> OrderService<DieselOrderRepository, LogNotifier> {
    OrderService::new(DieselOrderRepository::new(pool), LogNotifier)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Places an order from the caller's cart. Stock adjustment, order number
/// allocation, coupon usage and cart clearing commit in a single
/// transaction; the confirmation notification is sent best-effort after
/// the commit.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 409, description = "Insufficient stock"),
        (status = 422, description = "Empty cart or invalid input"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    pool: web::Data<DbPool>,
    user: AuthUser,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let body = body.into_inner();
    let order = web::block(move || {
        let input = body.into_input()?;
        service(pool).place_order(user.id, input)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created()
        .json(json!({ "success": true, "data": OrderResponse::from(order) })))
}

/// GET /orders
///
/// Paginated list of the caller's orders, newest first, without item
/// snapshots. Use `GET /orders/{id}` for the full order.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    pool: web::Data<DbPool>,
    user: AuthUser,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let params = query.into_inner();
    let (page, limit) = (params.page, params.limit);
    let result = web::block(move || {
        let status = parse_status_filter(params.status)?;
        service(pool).list_own(user.id, status, page, limit)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": ListOrdersResponse {
            items: result.items.into_iter().map(OrderResponse::from).collect(),
            total: result.total,
            page,
            limit,
        }
    })))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "The order", body = OrderResponse),
        (status = 403, description = "Not the caller's order"),
        (status = 404, description = "Unknown order"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    pool: web::Data<DbPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let id = path.into_inner();
    let order = web::block(move || service(pool).get_order(user.id, user.is_admin(), id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": OrderResponse::from(order) })))
}

/// POST /orders/{id}/cancel
///
/// Customer-initiated cancellation; restores stock for every line.
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Cancelled order", body = OrderResponse),
        (status = 403, description = "Not the caller's order"),
        (status = 404, description = "Unknown order"),
        (status = 409, description = "Order already shipped or closed"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    pool: web::Data<DbPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let id = path.into_inner();
    let order = web::block(move || service(pool).cancel(user.id, id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": OrderResponse::from(order) })))
}

/// GET /orders/track/{order_number}
///
/// Public, unauthenticated tracking endpoint.
#[utoipa::path(
    get,
    path = "/orders/track/{order_number}",
    params(("order_number" = String, Path, description = "Human-readable order number")),
    responses(
        (status = 200, description = "Shipment status", body = TrackResponse),
        (status = 404, description = "Unknown order number"),
    ),
    tag = "orders"
)]
pub async fn track_order(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let order_number = path.into_inner();
    let tracking = web::block(move || service(pool).track(&order_number))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok()
        .json(json!({ "success": true, "data": TrackResponse::from(tracking) })))
}
