use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{
    AddItemInput, CartLineView, CartView, CouponView, DiscountType, MAX_LINE_QUANTITY,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::domain::pricing;
use crate::schema::{cart_items, carts, coupons, product_variants, products};

use super::models::{
    CartItemRow, CartRow, CouponRow, NewCartItemRow, NewCartRow, ProductRow, VariantRow,
};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fetch the user's cart row, creating an empty one on first touch.
fn get_or_create_row(conn: &mut PgConnection, user_id: Uuid) -> Result<CartRow, DomainError> {
    // do_nothing + re-select keeps concurrent first touches from erroring
    // on the unique user_id constraint.
    diesel::insert_into(carts::table)
        .values(&NewCartRow {
            id: Uuid::new_v4(),
            user_id,
        })
        .on_conflict(carts::user_id)
        .do_nothing()
        .execute(conn)?;

    carts::table
        .filter(carts::user_id.eq(user_id))
        .select(CartRow::as_select())
        .first(conn)
        .map_err(Into::into)
}

fn touch(conn: &mut PgConnection, cart_id: Uuid) -> Result<(), DomainError> {
    diesel::update(carts::table.find(cart_id))
        .set(carts::updated_at.eq(diesel::dsl::now))
        .execute(conn)?;
    Ok(())
}

fn coupon_view(conn: &mut PgConnection, coupon_id: Uuid) -> Result<CouponView, DomainError> {
    let row: CouponRow = coupons::table
        .find(coupon_id)
        .select(CouponRow::as_select())
        .first(conn)?;
    Ok(CouponView {
        discount_type: DiscountType::parse(&row.discount_type)?,
        code: row.code,
        amount: row.amount,
    })
}

/// Assemble the cart view: lines with product display fields, plus totals
/// recomputed from the line snapshots.
fn load_view(conn: &mut PgConnection, cart: CartRow) -> Result<CartView, DomainError> {
    let rows: Vec<(CartItemRow, String, Option<String>)> = cart_items::table
        .inner_join(products::table)
        .filter(cart_items::cart_id.eq(cart.id))
        .order(cart_items::created_at.asc())
        .select((
            CartItemRow::as_select(),
            products::name,
            products::image_url,
        ))
        .load(conn)?;

    let coupon = match cart.coupon_id {
        Some(id) => Some(coupon_view(conn, id)?),
        None => None,
    };

    let lines: Vec<CartLineView> = rows
        .into_iter()
        .map(|(item, name, image_url)| CartLineView {
            id: item.id,
            product_id: item.product_id,
            product_name: name,
            image_url,
            sku: item.variant_sku,
            size: item.size,
            color: item.color,
            quantity: item.quantity,
            line_total: pricing::line_total(&item.unit_price, item.quantity),
            unit_price: item.unit_price,
        })
        .collect();

    let totals = pricing::cart_totals(
        lines.iter().map(|l| (&l.unit_price, l.quantity)),
        coupon.as_ref(),
    );

    Ok(CartView {
        id: cart.id,
        user_id: cart.user_id,
        lines,
        coupon,
        subtotal: totals.subtotal,
        discount: totals.discount,
        total: totals.total,
    })
}

fn find_variant(
    conn: &mut PgConnection,
    product: &ProductRow,
    sku: &str,
) -> Result<VariantRow, DomainError> {
    product_variants::table
        .filter(
            product_variants::sku
                .eq(sku)
                .and(product_variants::product_id.eq(product.id)),
        )
        .select(VariantRow::as_select())
        .first(conn)
        .optional()?
        // An unknown variant is treated the same as one that cannot cover
        // the requested quantity.
        .ok_or_else(|| DomainError::InsufficientStock(product.name.clone()))
}

impl CartRepository for DieselCartRepository {
    fn get_or_create(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = get_or_create_row(conn, user_id)?;
            load_view(conn, cart)
        })
    }

    fn add_item(&self, user_id: Uuid, input: AddItemInput) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = get_or_create_row(conn, user_id)?;

            let product: ProductRow = products::table
                .find(input.product_id)
                .filter(products::active.eq(true))
                .select(ProductRow::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| DomainError::NotFound("product".to_string()))?;

            let variant = find_variant(conn, &product, &input.sku)?;

            let existing: Option<CartItemRow> = cart_items::table
                .filter(
                    cart_items::cart_id
                        .eq(cart.id)
                        .and(cart_items::product_id.eq(product.id))
                        .and(cart_items::variant_sku.eq(&input.sku)),
                )
                .select(CartItemRow::as_select())
                .first(conn)
                .optional()?;

            match existing {
                Some(line) => {
                    // The combined quantity is validated, not just the delta.
                    let combined = line.quantity + input.quantity;
                    if combined > MAX_LINE_QUANTITY {
                        return Err(DomainError::InvalidInput(format!(
                            "quantity per item is limited to {}",
                            MAX_LINE_QUANTITY
                        )));
                    }
                    if combined > variant.stock {
                        return Err(DomainError::InsufficientStock(product.name));
                    }
                    diesel::update(cart_items::table.find(line.id))
                        .set(cart_items::quantity.eq(combined))
                        .execute(conn)?;
                }
                None => {
                    if input.quantity > variant.stock {
                        return Err(DomainError::InsufficientStock(product.name));
                    }
                    diesel::insert_into(cart_items::table)
                        .values(&NewCartItemRow {
                            id: Uuid::new_v4(),
                            cart_id: cart.id,
                            product_id: product.id,
                            variant_sku: variant.sku,
                            size: variant.size,
                            color: variant.color,
                            quantity: input.quantity,
                            unit_price: product.price,
                        })
                        .execute(conn)?;
                }
            }

            touch(conn, cart.id)?;
            load_view(conn, cart)
        })
    }

    fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = get_or_create_row(conn, user_id)?;

            let item: CartItemRow = cart_items::table
                .filter(
                    cart_items::id
                        .eq(item_id)
                        .and(cart_items::cart_id.eq(cart.id)),
                )
                .select(CartItemRow::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| DomainError::NotFound("cart item".to_string()))?;

            let product: ProductRow = products::table
                .find(item.product_id)
                .select(ProductRow::as_select())
                .first(conn)?;

            let variant = find_variant(conn, &product, &item.variant_sku)?;
            if quantity > variant.stock {
                return Err(DomainError::InsufficientStock(product.name));
            }

            diesel::update(cart_items::table.find(item.id))
                .set(cart_items::quantity.eq(quantity))
                .execute(conn)?;

            touch(conn, cart.id)?;
            load_view(conn, cart)
        })
    }

    fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = get_or_create_row(conn, user_id)?;
            // Deleting an absent line is a no-op.
            diesel::delete(
                cart_items::table.filter(
                    cart_items::id
                        .eq(item_id)
                        .and(cart_items::cart_id.eq(cart.id)),
                ),
            )
            .execute(conn)?;

            touch(conn, cart.id)?;
            load_view(conn, cart)
        })
    }

    fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = get_or_create_row(conn, user_id)?;
            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;
            let cart: CartRow = diesel::update(carts::table.find(cart.id))
                .set((
                    carts::coupon_id.eq(None::<Uuid>),
                    carts::updated_at.eq(diesel::dsl::now),
                ))
                .returning(CartRow::as_returning())
                .get_result(conn)?;
            load_view(conn, cart)
        })
    }

    fn apply_coupon(&self, user_id: Uuid, code: &str) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = get_or_create_row(conn, user_id)?;

            let coupon: CouponRow = coupons::table
                .filter(coupons::code.eq(code))
                .select(CouponRow::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| DomainError::InvalidCoupon(code.to_string()))?;

            let now = chrono::Utc::now();
            let exhausted = coupon
                .usage_limit
                .is_some_and(|limit| coupon.times_used >= limit);
            if !coupon.active || now < coupon.valid_from || now > coupon.valid_until || exhausted {
                return Err(DomainError::InvalidCoupon(code.to_string()));
            }

            let cart: CartRow = diesel::update(carts::table.find(cart.id))
                .set((
                    carts::coupon_id.eq(Some(coupon.id)),
                    carts::updated_at.eq(diesel::dsl::now),
                ))
                .returning(CartRow::as_returning())
                .get_result(conn)?;
            load_view(conn, cart)
        })
    }
}
