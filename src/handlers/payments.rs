use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::payment_service::PaymentService;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::infrastructure::notifier::LogNotifier;
use crate::infrastructure::order_repo::DieselOrderRepository;
use crate::infrastructure::payment_gateway::HttpPaymentGateway;

use super::orders::OrderResponse;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIntentRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateIntentResponse {
    pub intent_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MpesaPushRequest {
    pub order_id: Uuid,
    pub phone: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MpesaPushResponse {
    pub checkout_request_id: String,
}

/// Asynchronous confirmation posted by the payment processor.
#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookRequest {
    pub order_number: String,
    /// Processor-side transaction reference, kept for the audit log.
    pub reference: String,
    /// Terminal result: "completed" or "failed".
    pub status: String,
}

fn service(
    pool: DbPool,
) -> Result<PaymentService<DieselOrderRepository, HttpPaymentGateway, LogNotifier>, AppError> {
    let gateway = HttpPaymentGateway::from_env()?;
    Ok(PaymentService::new(
        DieselOrderRepository::new(pool),
        gateway,
        LogNotifier,
    ))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /payments/intent
#[utoipa::path(
    post,
    path = "/payments/intent",
    request_body = CreateIntentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = CreateIntentResponse),
        (status = 403, description = "Not the caller's order"),
        (status = 404, description = "Unknown order"),
    ),
    tag = "payments"
)]
pub async fn create_intent(
    pool: web::Data<DbPool>,
    user: AuthUser,
    body: web::Json<CreateIntentRequest>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let order_id = body.order_id;
    let intent = web::block(move || {
        service(pool)?
            .create_intent(user.id, order_id)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": CreateIntentResponse {
            intent_id: intent.intent_id,
            client_secret: intent.client_secret,
        }
    })))
}

/// POST /payments/mpesa
#[utoipa::path(
    post,
    path = "/payments/mpesa",
    request_body = MpesaPushRequest,
    responses(
        (status = 200, description = "STK push initiated", body = MpesaPushResponse),
        (status = 403, description = "Not the caller's order"),
        (status = 404, description = "Unknown order"),
        (status = 422, description = "Missing phone number"),
    ),
    tag = "payments"
)]
pub async fn initiate_mpesa(
    pool: web::Data<DbPool>,
    user: AuthUser,
    body: web::Json<MpesaPushRequest>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let body = body.into_inner();
    let checkout_request_id = web::block(move || {
        service(pool)?
            .initiate_stk_push(user.id, body.order_id, &body.phone)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": MpesaPushResponse { checkout_request_id }
    })))
}

/// POST /payments/webhook
///
/// Unauthenticated endpoint for the processor's asynchronous confirmation.
#[utoipa::path(
    post,
    path = "/payments/webhook",
    request_body = WebhookRequest,
    responses(
        (status = 200, description = "Payment result recorded", body = OrderResponse),
        (status = 404, description = "Unknown order number"),
        (status = 422, description = "Unsupported payment result"),
    ),
    tag = "payments"
)]
pub async fn webhook(
    pool: web::Data<DbPool>,
    body: web::Json<WebhookRequest>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref().clone();
    let body = body.into_inner();
    log::info!(
        "payment webhook for {} (ref {}): {}",
        body.order_number,
        body.reference,
        body.status
    );
    let order = web::block(move || {
        service(pool)?
            .handle_webhook(&body.order_number, &body.status)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": OrderResponse::from(order) })))
}
