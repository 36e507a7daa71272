//! Monetary arithmetic for carts and orders.
//!
//! Totals are always recomputed from line data; nothing here is cached or
//! persisted. All values are `BigDecimal` end to end.

use bigdecimal::BigDecimal;

use super::cart::{CouponView, DiscountType};
use super::order::ShippingMethod;

/// VAT applied to the order subtotal, as a percentage.
pub const VAT_PERCENT: i32 = 16;

#[derive(Debug, Clone)]
pub struct CartTotals {
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderTotals {
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub tax: BigDecimal,
    pub discount: BigDecimal,
    pub grand_total: BigDecimal,
}

pub fn line_total(unit_price: &BigDecimal, quantity: i32) -> BigDecimal {
    unit_price * BigDecimal::from(quantity)
}

pub fn subtotal<'a, I>(lines: I) -> BigDecimal
where
    I: IntoIterator<Item = (&'a BigDecimal, i32)>,
{
    lines
        .into_iter()
        .fold(BigDecimal::from(0), |acc, (price, qty)| {
            acc + line_total(price, qty)
        })
}

/// Discount granted by `coupon` against `subtotal`.
///
/// Percentage coupons take their cut of the subtotal; fixed coupons apply
/// their full amount without clipping to the subtotal. The floor-at-zero
/// guarantee lives in the total computation, not here.
pub fn discount(subtotal: &BigDecimal, coupon: Option<&CouponView>) -> BigDecimal {
    match coupon {
        None => BigDecimal::from(0),
        Some(c) => match c.discount_type {
            DiscountType::Percentage => (subtotal * &c.amount) / BigDecimal::from(100),
            DiscountType::Fixed => c.amount.clone(),
        },
    }
}

pub fn shipping_fee(method: ShippingMethod) -> BigDecimal {
    match method {
        ShippingMethod::Standard => BigDecimal::from(300),
        ShippingMethod::Express => BigDecimal::from(500),
        ShippingMethod::Pickup => BigDecimal::from(0),
    }
}

pub fn vat(subtotal: &BigDecimal) -> BigDecimal {
    (subtotal * BigDecimal::from(VAT_PERCENT)) / BigDecimal::from(100)
}

pub fn cart_totals<'a, I>(lines: I, coupon: Option<&CouponView>) -> CartTotals
where
    I: IntoIterator<Item = (&'a BigDecimal, i32)>,
{
    let subtotal = subtotal(lines);
    let discount = discount(&subtotal, coupon);
    let total = &subtotal - &discount;
    let total = if total < BigDecimal::from(0) {
        BigDecimal::from(0)
    } else {
        total
    };
    CartTotals {
        subtotal,
        discount,
        total,
    }
}

pub fn order_totals(
    subtotal: BigDecimal,
    method: ShippingMethod,
    coupon: Option<&CouponView>,
) -> OrderTotals {
    let shipping_cost = shipping_fee(method);
    let tax = vat(&subtotal);
    let discount = discount(&subtotal, coupon);
    let grand_total = &subtotal + &shipping_cost + &tax - &discount;
    OrderTotals {
        subtotal,
        shipping_cost,
        tax,
        discount,
        grand_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> BigDecimal {
        BigDecimal::from(v)
    }

    fn percentage(amount: i64) -> CouponView {
        CouponView {
            code: "SAVE".to_string(),
            discount_type: DiscountType::Percentage,
            amount: dec(amount),
        }
    }

    fn fixed(amount: i64) -> CouponView {
        CouponView {
            code: "FLAT".to_string(),
            discount_type: DiscountType::Fixed,
            amount: dec(amount),
        }
    }

    #[test]
    fn subtotal_is_sum_of_price_times_quantity() {
        let p1 = dec(1000);
        let p2 = dec(250);
        let total = subtotal([(&p1, 2), (&p2, 4)]);
        assert_eq!(total, dec(3000));
    }

    #[test]
    fn subtotal_of_empty_cart_is_zero() {
        assert_eq!(subtotal([]), dec(0));
    }

    #[test]
    fn percentage_coupon_takes_cut_of_subtotal() {
        // 2000 at 10% -> 200 off, cart total 1800.
        let price = dec(1000);
        let totals = cart_totals([(&price, 2)], Some(&percentage(10)));
        assert_eq!(totals.subtotal, dec(2000));
        assert_eq!(totals.discount, dec(200));
        assert_eq!(totals.total, dec(1800));
    }

    #[test]
    fn fixed_coupon_subtracts_full_amount() {
        let price = dec(500);
        let totals = cart_totals([(&price, 2)], Some(&fixed(300)));
        assert_eq!(totals.discount, dec(300));
        assert_eq!(totals.total, dec(700));
    }

    #[test]
    fn cart_total_is_floored_at_zero_not_clipped() {
        // A fixed discount larger than the subtotal leaves the discount
        // untouched and floors only the total.
        let price = dec(100);
        let totals = cart_totals([(&price, 1)], Some(&fixed(500)));
        assert_eq!(totals.subtotal, dec(100));
        assert_eq!(totals.discount, dec(500));
        assert_eq!(totals.total, dec(0));
    }

    #[test]
    fn vat_is_sixteen_percent_exactly() {
        assert_eq!(vat(&dec(2000)), dec(320));
        assert_eq!(vat(&dec(0)), dec(0));
    }

    #[test]
    fn shipping_fees_by_method() {
        assert_eq!(shipping_fee(ShippingMethod::Standard), dec(300));
        assert_eq!(shipping_fee(ShippingMethod::Express), dec(500));
        assert_eq!(shipping_fee(ShippingMethod::Pickup), dec(0));
    }

    #[test]
    fn order_totals_worked_example() {
        // subtotal 2000, standard shipping 300, tax 320, 10% coupon 200
        // -> grand total 2420.
        let totals = order_totals(dec(2000), ShippingMethod::Standard, Some(&percentage(10)));
        assert_eq!(totals.subtotal, dec(2000));
        assert_eq!(totals.shipping_cost, dec(300));
        assert_eq!(totals.tax, dec(320));
        assert_eq!(totals.discount, dec(200));
        assert_eq!(totals.grand_total, dec(2420));
    }

    #[test]
    fn order_totals_without_coupon() {
        let totals = order_totals(dec(1000), ShippingMethod::Pickup, None);
        assert_eq!(totals.shipping_cost, dec(0));
        assert_eq!(totals.tax, dec(160));
        assert_eq!(totals.discount, dec(0));
        assert_eq!(totals.grand_total, dec(1160));
    }
}
