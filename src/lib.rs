pub mod application;
pub mod auth;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::cart::get_cart,
        handlers::cart::add_item,
        handlers::cart::update_item,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::cart::apply_coupon,
        handlers::orders::place_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::cancel_order,
        handlers::orders::track_order,
        handlers::admin::list_all_orders,
        handlers::admin::update_status,
        handlers::admin::update_payment_status,
        handlers::payments::create_intent,
        handlers::payments::initiate_mpesa,
        handlers::payments::webhook,
    ),
    components(schemas(
        handlers::cart::AddItemRequest,
        handlers::cart::UpdateItemRequest,
        handlers::cart::ApplyCouponRequest,
        handlers::cart::CartLineResponse,
        handlers::cart::CouponResponse,
        handlers::cart::CartResponse,
        handlers::orders::AddressDto,
        handlers::orders::PlaceOrderRequest,
        handlers::orders::OrderItemResponse,
        handlers::orders::OrderResponse,
        handlers::orders::TrackResponse,
        handlers::orders::ListOrdersResponse,
        handlers::admin::UpdateStatusRequest,
        handlers::admin::UpdatePaymentRequest,
        handlers::payments::CreateIntentRequest,
        handlers::payments::CreateIntentResponse,
        handlers::payments::MpesaPushRequest,
        handlers::payments::MpesaPushResponse,
        handlers::payments::WebhookRequest,
    )),
    tags(
        (name = "cart", description = "Cart management"),
        (name = "orders", description = "Order placement and lifecycle"),
        (name = "admin", description = "Administrative order management"),
        (name = "payments", description = "Payment processor integration"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(Logger::default())
            .service(
                web::scope("/cart")
                    .route("", web::get().to(handlers::cart::get_cart))
                    .route("", web::delete().to(handlers::cart::clear_cart))
                    .route("/items", web::post().to(handlers::cart::add_item))
                    .route("/items/{item_id}", web::patch().to(handlers::cart::update_item))
                    .route("/items/{item_id}", web::delete().to(handlers::cart::remove_item))
                    .route("/coupon", web::post().to(handlers::cart::apply_coupon)),
            )
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::place_order))
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route(
                        "/track/{order_number}",
                        web::get().to(handlers::orders::track_order),
                    )
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route("/{id}/cancel", web::post().to(handlers::orders::cancel_order)),
            )
            .service(
                web::scope("/admin/orders")
                    .route("", web::get().to(handlers::admin::list_all_orders))
                    .route("/{id}/status", web::patch().to(handlers::admin::update_status))
                    .route(
                        "/{id}/payment",
                        web::patch().to(handlers::admin::update_payment_status),
                    ),
            )
            .service(
                web::scope("/payments")
                    .route("/intent", web::post().to(handlers::payments::create_intent))
                    .route("/mpesa", web::post().to(handlers::payments::initiate_mpesa))
                    .route("/webhook", web::post().to(handlers::payments::webhook)),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
