use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::domain::ports::TrackingUpdate;
use crate::domain::status::{OrderStatus, PaymentStatus};
use crate::errors::AppError;
use crate::infrastructure::notifier::LogNotifier;
use crate::infrastructure::order_repo::DieselOrderRepository;

use super::orders::{parse_status_filter, ListOrdersParams, ListOrdersResponse, OrderResponse};

// ── Request DTOs ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// Target status; the transition must be legal from the current one.
    pub status: String,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentRequest {
    /// One of "pending", "completed", "failed", "refunded".
    pub payment_status: String,
}

fn service(pool: DbPool) -> OrderService<DieselOrderRepository, LogNotifier> {
    OrderService::new(DieselOrderRepository::new(pool), LogNotifier)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /admin/orders
#[utoipa::path(
    get,
    path = "/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
    ),
    responses(
        (status = 200, description = "Paginated list across all customers", body = ListOrdersResponse),
        (status = 403, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn list_all_orders(
    pool: web::Data<DbPool>,
    user: AuthUser,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    user.require_admin()?;
    let pool = pool.get_ref().clone();
    let params = query.into_inner();
    let (page, limit) = (params.page, params.limit);
    let result = web::block(move || {
        let status = parse_status_filter(params.status)?;
        service(pool).list_all(status, page, limit)
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

/// PATCH /admin/orders/{id}/status
///
/// Moves an order along its lifecycle. Shipping accepts tracking fields;
/// a transition to "cancelled" restores stock.
#[utoipa::path(
    patch,
    path = "/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated order", body = OrderResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Unknown order"),
        (status = 409, description = "Illegal status transition"),
    ),
    tag = "admin"
)]
pub async fn update_status(
    pool: web::Data<DbPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_admin()?;
    let pool = pool.get_ref().clone();
    let id = path.into_inner();
    let body = body.into_inner();
    let order = web::block(move || {
        let target = OrderStatus::parse(&body.status)?;
        service(pool).update_status(
            id,
            target,
            TrackingUpdate {
                tracking_number: body.tracking_number,
                tracking_url: body.tracking_url,
            },
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": OrderResponse::from(order) })))
}

/// PATCH /admin/orders/{id}/payment
///
/// Explicit payment settlement update, separate from the lifecycle
/// endpoint. Delivering an order never settles its payment.
#[utoipa::path(
    patch,
    path = "/admin/orders/{id}/payment",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Updated order", body = OrderResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Unknown order"),
    ),
    tag = "admin"
)]
pub async fn update_payment_status(
    pool: web::Data<DbPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_admin()?;
    let pool = pool.get_ref().clone();
    let id = path.into_inner();
    let body = body.into_inner();
    let order = web::block(move || {
        let status = PaymentStatus::parse(&body.payment_status)?;
        service(pool).update_payment_status(id, status)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": OrderResponse::from(order) })))
}
