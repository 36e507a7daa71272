use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{CouponView, DiscountType};
use crate::domain::errors::DomainError;
use crate::domain::order::{
    Address, ListResult, OrderItemView, OrderView, PaymentMethod, PlaceOrderInput, ShippingMethod,
};
use crate::domain::ports::{OrderRepository, TrackingUpdate};
use crate::domain::pricing;
use crate::domain::status::{OrderStatus, PaymentStatus};
use crate::schema::{
    cart_items, carts, coupons, order_counters, order_items, orders, product_variants, products,
};

use super::models::{
    CartItemRow, CartRow, CouponRow, NewCounterRow, NewOrderItemRow, NewOrderRow, OrderItemRow,
    OrderRow, OrderStatusChangeset,
};

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Allocate the next `ORD-YYMMDD-NNNN` number via an atomic upsert on the
/// per-day counter. Runs inside the placement transaction, so two
/// concurrent placements serialize on the counter row.
fn next_order_number(conn: &mut PgConnection) -> Result<String, DomainError> {
    let today = Utc::now().date_naive();
    let seq: i32 = diesel::insert_into(order_counters::table)
        .values(&NewCounterRow {
            day: today,
            last_seq: 1,
        })
        .on_conflict(order_counters::day)
        .do_update()
        .set(order_counters::last_seq.eq(order_counters::last_seq + 1))
        .returning(order_counters::last_seq)
        .get_result(conn)?;
    Ok(format!("ORD-{}-{:04}", today.format("%y%m%d"), seq))
}

fn row_to_view(row: OrderRow) -> Result<OrderView, DomainError> {
    let shipping_address: Address = serde_json::from_value(row.shipping_address)
        .map_err(|e| DomainError::Internal(format!("stored shipping address: {}", e)))?;
    Ok(OrderView {
        id: row.id,
        order_number: row.order_number,
        user_id: row.user_id,
        status: OrderStatus::parse(&row.status)?,
        payment_method: PaymentMethod::parse(&row.payment_method)?,
        payment_status: PaymentStatus::parse(&row.payment_status)?,
        shipping_method: ShippingMethod::parse(&row.shipping_method)?,
        shipping_address,
        notes: row.notes,
        items: vec![],
        subtotal: row.subtotal,
        shipping_cost: row.shipping_cost,
        tax: row.tax,
        discount: row.discount,
        grand_total: row.grand_total,
        coupon_code: row.coupon_code,
        tracking_number: row.tracking_number,
        tracking_url: row.tracking_url,
        cancelled_at: row.cancelled_at,
        delivered_at: row.delivered_at,
        created_at: row.created_at,
    })
}

fn load_view(conn: &mut PgConnection, row: OrderRow) -> Result<OrderView, DomainError> {
    let order_id = row.id;
    let mut view = row_to_view(row)?;
    let items: Vec<OrderItemRow> = order_items::table
        .filter(order_items::order_id.eq(order_id))
        .order(order_items::created_at.asc())
        .select(OrderItemRow::as_select())
        .load(conn)?;
    view.items = items
        .into_iter()
        .map(|i| OrderItemView {
            id: i.id,
            product_id: i.product_id,
            product_name: i.product_name,
            sku: i.variant_sku,
            size: i.size,
            color: i.color,
            quantity: i.quantity,
            unit_price: i.unit_price,
            line_total: i.line_total,
        })
        .collect();
    Ok(view)
}

fn find_row(conn: &mut PgConnection, id: Uuid) -> Result<OrderRow, DomainError> {
    orders::table
        .find(id)
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| DomainError::NotFound("order".to_string()))
}

/// Put every ordered unit back on the shelf. The inverse of the placement
/// decrement; missing variants (deleted product) are logged and skipped.
fn restore_stock(conn: &mut PgConnection, order_id: Uuid) -> Result<(), DomainError> {
    let items: Vec<OrderItemRow> = order_items::table
        .filter(order_items::order_id.eq(order_id))
        .select(OrderItemRow::as_select())
        .load(conn)?;
    for item in items {
        let updated = diesel::update(
            product_variants::table.filter(product_variants::sku.eq(&item.variant_sku)),
        )
        .set(product_variants::stock.eq(product_variants::stock + item.quantity))
        .execute(conn)?;
        if updated == 0 {
            log::warn!(
                "variant {} no longer exists; skipping stock restoration for order {}",
                item.variant_sku,
                order_id
            );
        }
    }
    Ok(())
}

fn filtered(
    user_id: Option<Uuid>,
    status_filter: Option<OrderStatus>,
) -> orders::BoxedQuery<'static, diesel::pg::Pg> {
    let mut query = orders::table.into_boxed();
    if let Some(uid) = user_id {
        query = query.filter(orders::user_id.eq(uid));
    }
    if let Some(status) = status_filter {
        query = query.filter(orders::status.eq(status.as_str()));
    }
    query
}

impl OrderRepository for DieselOrderRepository {
    fn place(&self, user_id: Uuid, input: PlaceOrderInput) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart: Option<CartRow> = carts::table
                .filter(carts::user_id.eq(user_id))
                .select(CartRow::as_select())
                .first(conn)
                .optional()?;
            let Some(cart) = cart else {
                return Err(DomainError::EmptyCart);
            };

            let lines: Vec<(CartItemRow, String)> = cart_items::table
                .inner_join(products::table)
                .filter(cart_items::cart_id.eq(cart.id))
                .order(cart_items::created_at.asc())
                .select((CartItemRow::as_select(), products::name))
                .load(conn)?;
            if lines.is_empty() {
                return Err(DomainError::EmptyCart);
            }

            // Conditional decrement doubles as the stock re-check: zero rows
            // means the variant is gone or cannot cover the quantity, and the
            // error rolls back every decrement made so far.
            for (item, product_name) in &lines {
                let updated = diesel::update(
                    product_variants::table.filter(
                        product_variants::sku
                            .eq(&item.variant_sku)
                            .and(product_variants::stock.ge(item.quantity)),
                    ),
                )
                .set(product_variants::stock.eq(product_variants::stock - item.quantity))
                .execute(conn)?;
                if updated == 0 {
                    return Err(DomainError::InsufficientStock(product_name.clone()));
                }
            }

            let coupon = match cart.coupon_id {
                Some(coupon_id) => {
                    let row: CouponRow = coupons::table
                        .find(coupon_id)
                        .select(CouponRow::as_select())
                        .first(conn)?;
                    diesel::update(coupons::table.find(coupon_id))
                        .set(coupons::times_used.eq(coupons::times_used + 1))
                        .execute(conn)?;
                    Some(CouponView {
                        discount_type: DiscountType::parse(&row.discount_type)?,
                        code: row.code,
                        amount: row.amount,
                    })
                }
                None => None,
            };

            let subtotal =
                pricing::subtotal(lines.iter().map(|(i, _)| (&i.unit_price, i.quantity)));
            let totals = pricing::order_totals(subtotal, input.shipping_method, coupon.as_ref());

            let order_id = Uuid::new_v4();
            let order_number = next_order_number(conn)?;
            let shipping_address = serde_json::to_value(&input.shipping_address)
                .map_err(|e| DomainError::Internal(format!("shipping address: {}", e)))?;

            let order: OrderRow = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    order_number,
                    user_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    payment_method: input.payment_method.as_str().to_string(),
                    payment_status: PaymentStatus::Pending.as_str().to_string(),
                    shipping_method: input.shipping_method.as_str().to_string(),
                    shipping_address,
                    notes: input.notes,
                    subtotal: totals.subtotal,
                    shipping_cost: totals.shipping_cost,
                    tax: totals.tax,
                    discount: totals.discount,
                    grand_total: totals.grand_total,
                    coupon_code: coupon.as_ref().map(|c| c.code.clone()),
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            let new_items: Vec<NewOrderItemRow> = lines
                .iter()
                .map(|(item, product_name)| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: item.product_id,
                    product_name: product_name.clone(),
                    variant_sku: item.variant_sku.clone(),
                    size: item.size.clone(),
                    color: item.color.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.clone(),
                    line_total: pricing::line_total(&item.unit_price, item.quantity),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;
            diesel::update(carts::table.find(cart.id))
                .set((
                    carts::coupon_id.eq(None::<Uuid>),
                    carts::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;

            load_view(conn, order)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<OrderRow> = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        match row {
            Some(row) => Ok(Some(load_view(&mut conn, row)?)),
            None => Ok(None),
        }
    }

    fn find_by_number(&self, order_number: &str) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<OrderRow> = orders::table
            .filter(orders::order_number.eq(order_number))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        match row {
            Some(row) => Ok(Some(load_view(&mut conn, row)?)),
            None => Ok(None),
        }
    }

    fn list(
        &self,
        user_id: Option<Uuid>,
        status_filter: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;
        let offset = (page - 1) * limit;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered(user_id, status_filter)
                .count()
                .get_result(conn)?;

            let rows: Vec<OrderRow> = filtered(user_id, status_filter)
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            // Listings skip item snapshots; fetch a single order for those.
            let items: Result<Vec<OrderView>, DomainError> =
                rows.into_iter().map(row_to_view).collect();

            Ok(ListResult {
                items: items?,
                total,
            })
        })
    }

    fn cancel(&self, user_id: Uuid, id: Uuid) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let order = find_row(conn, id)?;
            if order.user_id != user_id {
                return Err(DomainError::Forbidden);
            }

            let current = OrderStatus::parse(&order.status)?;
            if !current.can_transition(OrderStatus::Cancelled) {
                return Err(DomainError::InvalidStatusTransition {
                    from: current,
                    to: OrderStatus::Cancelled,
                });
            }

            restore_stock(conn, order.id)?;

            let updated: OrderRow = diesel::update(orders::table.find(order.id))
                .set((
                    orders::status.eq(OrderStatus::Cancelled.as_str()),
                    orders::cancelled_at.eq(Utc::now()),
                    orders::updated_at.eq(diesel::dsl::now),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;
            load_view(conn, updated)
        })
    }

    fn update_status(
        &self,
        id: Uuid,
        target: OrderStatus,
        tracking: TrackingUpdate,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let order = find_row(conn, id)?;
            let current = OrderStatus::parse(&order.status)?;
            if !current.can_transition(target) {
                return Err(DomainError::InvalidStatusTransition {
                    from: current,
                    to: target,
                });
            }

            if target == OrderStatus::Cancelled {
                restore_stock(conn, order.id)?;
            }

            let changes = OrderStatusChangeset {
                status: target.as_str().to_string(),
                tracking_number: if target == OrderStatus::Shipped {
                    tracking.tracking_number
                } else {
                    None
                },
                tracking_url: if target == OrderStatus::Shipped {
                    tracking.tracking_url
                } else {
                    None
                },
                cancelled_at: (target == OrderStatus::Cancelled).then(Utc::now),
                // Delivery stamps the timestamp only; payment settlement is a
                // separate, explicitly gated update.
                delivered_at: (target == OrderStatus::Delivered).then(Utc::now),
            };

            let updated: OrderRow = diesel::update(orders::table.find(order.id))
                .set((changes, orders::updated_at.eq(diesel::dsl::now)))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;
            load_view(conn, updated)
        })
    }

    fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let order = find_row(conn, id)?;
            let updated: OrderRow = diesel::update(orders::table.find(order.id))
                .set((
                    orders::payment_status.eq(status.as_str()),
                    orders::updated_at.eq(diesel::dsl::now),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;
            load_view(conn, updated)
        })
    }

    fn record_payment_result(
        &self,
        order_number: &str,
        status: PaymentStatus,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let order: Option<OrderRow> = orders::table
                .filter(orders::order_number.eq(order_number))
                .select(OrderRow::as_select())
                .first(conn)
                .optional()?;
            let Some(order) = order else {
                return Err(DomainError::NotFound("order".to_string()));
            };

            diesel::update(orders::table.find(order.id))
                .set((
                    orders::payment_status.eq(status.as_str()),
                    orders::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;

            // A settled payment moves a fresh order along to confirmed, going
            // through the same lifecycle table as everything else.
            let current = OrderStatus::parse(&order.status)?;
            if status == PaymentStatus::Completed
                && current.can_transition(OrderStatus::Confirmed)
            {
                diesel::update(orders::table.find(order.id))
                    .set(orders::status.eq(OrderStatus::Confirmed.as_str()))
                    .execute(conn)?;
            }

            let row = find_row(conn, order.id)?;
            load_view(conn, row)
        })
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselOrderRepository;
    use crate::domain::cart::AddItemInput;
    use crate::domain::errors::DomainError;
    use crate::domain::order::{Address, PaymentMethod, PlaceOrderInput, ShippingMethod};
    use crate::domain::ports::{CartRepository, OrderRepository, TrackingUpdate};
    use crate::domain::status::{OrderStatus, PaymentStatus};
    use crate::infrastructure::cart_repo::DieselCartRepository;
    use crate::infrastructure::test_support::{
        coupon_times_used, seed_coupon, seed_product, setup_db, variant_stock,
    };
    use crate::schema::{cart_items, product_variants};

    fn address() -> Address {
        Address {
            full_name: "Jane Wanjiku".to_string(),
            phone: "+254700000000".to_string(),
            street: "Moi Avenue".to_string(),
            city: "Nairobi".to_string(),
            postal_code: Some("00100".to_string()),
            country: "KE".to_string(),
        }
    }

    fn place_input(shipping: ShippingMethod) -> PlaceOrderInput {
        PlaceOrderInput {
            shipping_address: address(),
            payment_method: PaymentMethod::Mpesa,
            shipping_method: shipping,
            notes: None,
        }
    }

    fn no_tracking() -> TrackingUpdate {
        TrackingUpdate {
            tracking_number: None,
            tracking_url: None,
        }
    }

    #[tokio::test]
    async fn place_computes_totals_and_clears_cart() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_coupon(&mut conn, "SAVE10", "percentage", 10, true, false, None);
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 5)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        carts
            .add_item(
                user_id,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 2,
                },
            )
            .expect("add");
        carts.apply_coupon(user_id, "SAVE10").expect("coupon");

        let order = orders
            .place(user_id, place_input(ShippingMethod::Standard))
            .expect("place");

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.subtotal, BigDecimal::from(2000));
        assert_eq!(order.shipping_cost, BigDecimal::from(300));
        assert_eq!(order.tax, BigDecimal::from(320));
        assert_eq!(order.discount, BigDecimal::from(200));
        assert_eq!(order.grand_total, BigDecimal::from(2420));
        assert_eq!(order.coupon_code.as_deref(), Some("SAVE10"));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_name, "Denim Jacket");
        assert_eq!(order.items[0].line_total, BigDecimal::from(2000));

        let mut conn = pool.get().expect("conn");
        assert_eq!(variant_stock(&mut conn, "DJ-M-BLK"), 3);
        assert_eq!(coupon_times_used(&mut conn, "SAVE10"), 1);
        let cart = carts.get_or_create(user_id).expect("cart");
        assert!(cart.lines.is_empty());
        assert!(cart.coupon.is_none());
    }

    #[tokio::test]
    async fn place_with_exact_stock_leaves_zero() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 2)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        carts
            .add_item(
                user_id,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 2,
                },
            )
            .expect("add");
        orders
            .place(user_id, place_input(ShippingMethod::Pickup))
            .expect("place");

        let mut conn = pool.get().expect("conn");
        assert_eq!(variant_stock(&mut conn, "DJ-M-BLK"), 0);
    }

    #[tokio::test]
    async fn place_insufficient_stock_rolls_everything_back() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 2)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        carts
            .add_item(
                user_id,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 2,
                },
            )
            .expect("add");

        // Someone else buys a unit between add-to-cart and checkout.
        {
            let mut conn = pool.get().expect("conn");
            diesel::update(product_variants::table)
                .set(product_variants::stock.eq(1))
                .execute(&mut conn)
                .expect("shrink stock");
        }

        let err = orders
            .place(user_id, place_input(ShippingMethod::Standard))
            .expect_err("must fail");
        assert!(matches!(err, DomainError::InsufficientStock(_)));

        let mut conn = pool.get().expect("conn");
        assert_eq!(variant_stock(&mut conn, "DJ-M-BLK"), 1, "stock untouched");
        let remaining: i64 = cart_items::table
            .count()
            .get_result(&mut conn)
            .expect("count");
        assert_eq!(remaining, 1, "cart untouched");
        assert_eq!(
            orders.list(Some(user_id), None, 1, 20).expect("list").total,
            0,
            "no order persisted"
        );
    }

    #[tokio::test]
    async fn place_empty_cart_fails() {
        let (_container, pool) = setup_db().await;
        let orders = DieselOrderRepository::new(pool);
        let err = orders
            .place(Uuid::new_v4(), place_input(ShippingMethod::Standard))
            .expect_err("empty cart must fail");
        assert!(matches!(err, DomainError::EmptyCart));
    }

    #[tokio::test]
    async fn order_numbers_increase_within_a_day() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 10)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        let mut sequences = Vec::new();
        for _ in 0..3 {
            carts
                .add_item(
                    user_id,
                    AddItemInput {
                        product_id,
                        sku: "DJ-M-BLK".to_string(),
                        quantity: 1,
                    },
                )
                .expect("add");
            let order = orders
                .place(user_id, place_input(ShippingMethod::Pickup))
                .expect("place");
            let seq: u32 = order
                .order_number
                .rsplit('-')
                .next()
                .expect("sequence part")
                .parse()
                .expect("numeric sequence");
            sequences.push(seq);
        }

        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn concurrent_placement_of_last_unit_oversells_nothing() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 1)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();
        for user in [user_a, user_b] {
            carts
                .add_item(
                    user,
                    AddItemInput {
                        product_id,
                        sku: "DJ-M-BLK".to_string(),
                        quantity: 1,
                    },
                )
                .expect("add");
        }

        let handles: Vec<_> = [user_a, user_b]
            .into_iter()
            .map(|user| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    DieselOrderRepository::new(pool).place(user, place_input(ShippingMethod::Pickup))
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one placement may win the last unit");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DomainError::InsufficientStock(_)))));

        let mut conn = pool.get().expect("conn");
        assert_eq!(variant_stock(&mut conn, "DJ-M-BLK"), 0);
    }

    #[tokio::test]
    async fn snapshot_prices_survive_live_price_changes() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 5)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        carts
            .add_item(
                user_id,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 2,
                },
            )
            .expect("add");

        {
            use crate::schema::products;
            let mut conn = pool.get().expect("conn");
            diesel::update(products::table.find(product_id))
                .set(products::price.eq(BigDecimal::from(9999)))
                .execute(&mut conn)
                .expect("reprice");
        }

        let order = orders
            .place(user_id, place_input(ShippingMethod::Pickup))
            .expect("place");
        assert_eq!(order.subtotal, BigDecimal::from(2000));
        assert_eq!(order.items[0].unit_price, BigDecimal::from(1000));
    }

    #[tokio::test]
    async fn cancel_pending_restores_stock() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 5)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        carts
            .add_item(
                user_id,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 3,
                },
            )
            .expect("add");
        let order = orders
            .place(user_id, place_input(ShippingMethod::Standard))
            .expect("place");
        {
            let mut conn = pool.get().expect("conn");
            assert_eq!(variant_stock(&mut conn, "DJ-M-BLK"), 2);
        }

        let cancelled = orders.cancel(user_id, order.id).expect("cancel");
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        let mut conn = pool.get().expect("conn");
        assert_eq!(variant_stock(&mut conn, "DJ-M-BLK"), 5);
    }

    #[tokio::test]
    async fn cancel_shipped_fails_and_leaves_stock() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 5)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        carts
            .add_item(
                user_id,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 2,
                },
            )
            .expect("add");
        let order = orders
            .place(user_id, place_input(ShippingMethod::Express))
            .expect("place");

        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
        ] {
            orders
                .update_status(order.id, status, no_tracking())
                .expect("advance");
        }

        let err = orders
            .cancel(user_id, order.id)
            .expect_err("shipped orders cannot be cancelled");
        assert!(matches!(err, DomainError::InvalidStatusTransition { .. }));

        let mut conn = pool.get().expect("conn");
        assert_eq!(variant_stock(&mut conn, "DJ-M-BLK"), 3, "stock unchanged");
    }

    #[tokio::test]
    async fn cancel_other_users_order_is_forbidden() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 5)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let owner = Uuid::new_v4();

        carts
            .add_item(
                owner,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 1,
                },
            )
            .expect("add");
        let order = orders
            .place(owner, place_input(ShippingMethod::Standard))
            .expect("place");

        let err = orders
            .cancel(Uuid::new_v4(), order.id)
            .expect_err("stranger must not cancel");
        assert!(matches!(err, DomainError::Forbidden));
    }

    #[tokio::test]
    async fn admin_cannot_jump_pending_to_delivered() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 5)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        carts
            .add_item(
                user_id,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 1,
                },
            )
            .expect("add");
        let order = orders
            .place(user_id, place_input(ShippingMethod::Standard))
            .expect("place");

        let err = orders
            .update_status(order.id, OrderStatus::Delivered, no_tracking())
            .expect_err("pending -> delivered is illegal");
        assert!(matches!(err, DomainError::InvalidStatusTransition { .. }));
    }

    #[tokio::test]
    async fn delivery_stamps_timestamp_without_touching_payment() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 5)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        carts
            .add_item(
                user_id,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 1,
                },
            )
            .expect("add");
        let order = orders
            .place(user_id, place_input(ShippingMethod::Standard))
            .expect("place");

        for status in [OrderStatus::Confirmed, OrderStatus::Processing] {
            orders
                .update_status(order.id, status, no_tracking())
                .expect("advance");
        }
        let shipped = orders
            .update_status(
                order.id,
                OrderStatus::Shipped,
                TrackingUpdate {
                    tracking_number: Some("TRK-1".to_string()),
                    tracking_url: Some("https://courier.example/TRK-1".to_string()),
                },
            )
            .expect("ship");
        assert_eq!(shipped.tracking_number.as_deref(), Some("TRK-1"));

        let delivered = orders
            .update_status(order.id, OrderStatus::Delivered, no_tracking())
            .expect("deliver");
        assert!(delivered.delivered_at.is_some());
        assert_eq!(
            delivered.payment_status,
            PaymentStatus::Pending,
            "delivery must not settle payment"
        );

        // Settlement is its own explicitly gated update.
        let settled = orders
            .update_payment_status(order.id, PaymentStatus::Completed)
            .expect("settle");
        assert_eq!(settled.payment_status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn payment_webhook_confirms_pending_order() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 5)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        carts
            .add_item(
                user_id,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 1,
                },
            )
            .expect("add");
        let order = orders
            .place(user_id, place_input(ShippingMethod::Standard))
            .expect("place");

        let updated = orders
            .record_payment_result(&order.order_number, PaymentStatus::Completed)
            .expect("webhook");
        assert_eq!(updated.payment_status, PaymentStatus::Completed);
        assert_eq!(updated.status, OrderStatus::Confirmed);

        let err = orders
            .record_payment_result("ORD-000000-9999", PaymentStatus::Completed)
            .expect_err("unknown order number");
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_payment_leaves_order_pending() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 5)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        carts
            .add_item(
                user_id,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 1,
                },
            )
            .expect("add");
        let order = orders
            .place(user_id, place_input(ShippingMethod::Standard))
            .expect("place");

        let updated = orders
            .record_payment_result(&order.order_number, PaymentStatus::Failed)
            .expect("webhook");
        assert_eq!(updated.payment_status, PaymentStatus::Failed);
        assert_eq!(updated.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn list_paginates_and_filters() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 10)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        let mut placed = Vec::new();
        for _ in 0..5 {
            carts
                .add_item(
                    user_id,
                    AddItemInput {
                        product_id,
                        sku: "DJ-M-BLK".to_string(),
                        quantity: 1,
                    },
                )
                .expect("add");
            placed.push(
                orders
                    .place(user_id, place_input(ShippingMethod::Pickup))
                    .expect("place"),
            );
        }
        orders
            .update_status(placed[0].id, OrderStatus::Confirmed, no_tracking())
            .expect("confirm one");

        let page1 = orders.list(Some(user_id), None, 1, 3).expect("page 1");
        assert_eq!(page1.total, 5);
        assert_eq!(page1.items.len(), 3);
        let page2 = orders.list(Some(user_id), None, 2, 3).expect("page 2");
        assert_eq!(page2.items.len(), 2);

        let confirmed = orders
            .list(Some(user_id), Some(OrderStatus::Confirmed), 1, 20)
            .expect("filtered");
        assert_eq!(confirmed.total, 1);

        // Scoped to the owner: a stranger sees nothing.
        let stranger = orders
            .list(Some(Uuid::new_v4()), None, 1, 20)
            .expect("stranger");
        assert_eq!(stranger.total, 0);
    }

    #[tokio::test]
    async fn find_by_number_round_trips() {
        let (_container, pool) = setup_db().await;
        let product_id = {
            let mut conn = pool.get().expect("conn");
            seed_product(&mut conn, "Denim Jacket", 1000, "DJ-M-BLK", 5)
        };
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let user_id = Uuid::new_v4();

        carts
            .add_item(
                user_id,
                AddItemInput {
                    product_id,
                    sku: "DJ-M-BLK".to_string(),
                    quantity: 1,
                },
            )
            .expect("add");
        let order = orders
            .place(user_id, place_input(ShippingMethod::Standard))
            .expect("place");

        let found = orders
            .find_by_number(&order.order_number)
            .expect("find")
            .expect("exists");
        assert_eq!(found.id, order.id);

        assert!(orders
            .find_by_number("ORD-000000-0000")
            .expect("find")
            .is_none());
    }
}
