use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::cart_service::CartService;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::domain::cart::{AddItemInput, CartView};
use crate::errors::AppError;
use crate::infrastructure::cart_repo::DieselCartRepository;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub sku: String,
    /// Defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyCouponRequest {
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub image_url: Option<String>,
    pub sku: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    /// Decimal amounts are serialized as strings, e.g. "999.50".
    pub unit_price: String,
    pub line_total: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponResponse {
    pub code: String,
    pub discount_type: String,
    pub amount: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub items: Vec<CartLineResponse>,
    pub coupon: Option<CouponResponse>,
    pub subtotal: String,
    pub discount: String,
    pub total: String,
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        CartResponse {
            id: cart.id,
            items: cart
                .lines
                .into_iter()
                .map(|l| CartLineResponse {
                    id: l.id,
                    product_id: l.product_id,
                    product_name: l.product_name,
                    image_url: l.image_url,
                    sku: l.sku,
                    size: l.size,
                    color: l.color,
                    quantity: l.quantity,
                    unit_price: l.unit_price.to_string(),
                    line_total: l.line_total.to_string(),
                })
                .collect(),
            coupon: cart.coupon.map(|c| CouponResponse {
                code: c.code,
                discount_type: c.discount_type.as_str().to_string(),
                amount: c.amount.to_string(),
            }),
            subtotal: cart.subtotal.to_string(),
            discount: cart.discount.to_string(),
            total: cart.total.to_string(),
        }
    }
}

fn cart_ok(cart: CartView) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "data": CartResponse::from(cart) }))
}

fn service(pool: DbPool) -> CartService<DieselCartRepository> {
    CartService::new(DieselCartRepository::new(pool))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
///
/// Returns the caller's cart, creating an empty one on first use.
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "The caller's cart", body = CartResponse),
    ),
    tag = "cart"
)]
pub async fn get_cart(pool: web::Data<DbPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let cart = web::block(move || service(pool).get_cart(user.id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(cart_ok(cart))
}

/// POST /cart/items
#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Unknown product"),
        (status = 409, description = "Insufficient stock"),
        (status = 422, description = "Invalid quantity"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    pool: web::Data<DbPool>,
    user: AuthUser,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let body = body.into_inner();
    let cart = web::block(move || {
        service(pool).add_item(
            user.id,
            AddItemInput {
                product_id: body.product_id,
                sku: body.sku,
                quantity: body.quantity,
            },
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(cart_ok(cart))
}

/// PATCH /cart/items/{item_id}
#[utoipa::path(
    patch,
    path = "/cart/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart line id")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Unknown cart line"),
        (status = 409, description = "Insufficient stock"),
    ),
    tag = "cart"
)]
pub async fn update_item(
    pool: web::Data<DbPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateItemRequest>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let item_id = path.into_inner();
    let quantity = body.quantity;
    let cart = web::block(move || service(pool).update_item(user.id, item_id, quantity))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(cart_ok(cart))
}

/// DELETE /cart/items/{item_id}
#[utoipa::path(
    delete,
    path = "/cart/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart line id")),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    pool: web::Data<DbPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let item_id = path.into_inner();
    let cart = web::block(move || service(pool).remove_item(user.id, item_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(cart_ok(cart))
}

/// DELETE /cart
#[utoipa::path(
    delete,
    path = "/cart",
    responses(
        (status = 200, description = "Emptied cart", body = CartResponse),
    ),
    tag = "cart"
)]
pub async fn clear_cart(pool: web::Data<DbPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let cart = web::block(move || service(pool).clear(user.id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(cart_ok(cart))
}

/// POST /cart/coupon
#[utoipa::path(
    post,
    path = "/cart/coupon",
    request_body = ApplyCouponRequest,
    responses(
        (status = 200, description = "Cart with coupon applied", body = CartResponse),
        (status = 422, description = "Invalid coupon"),
    ),
    tag = "cart"
)]
pub async fn apply_coupon(
    pool: web::Data<DbPool>,
    user: AuthUser,
    body: web::Json<ApplyCouponRequest>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let code = body.into_inner().code;
    let cart = web::block(move || service(pool).apply_coupon(user.id, &code))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(cart_ok(cart))
}
