//! Notification adapter. The actual delivery channel (email/SMS provider)
//! sits behind ops tooling that tails the structured log stream, so this
//! adapter renders the message and emits it through `log`.

use crate::domain::errors::DomainError;
use crate::domain::order::OrderView;
use crate::domain::ports::Notifier;

pub struct LogNotifier;

fn render_order_confirmation(order: &OrderView) -> String {
    let item_lines: Vec<String> = order
        .items
        .iter()
        .map(|i| format!("  {} x{} @ {}", i.product_name, i.quantity, i.unit_price))
        .collect();
    format!(
        "Hi {}, your order {} has been received.\n{}\nTotal: {}",
        order.shipping_address.full_name,
        order.order_number,
        item_lines.join("\n"),
        order.grand_total
    )
}

fn render_payment_received(order: &OrderView) -> String {
    format!(
        "Hi {}, we have received your payment of {} for order {}.",
        order.shipping_address.full_name, order.grand_total, order.order_number
    )
}

impl Notifier for LogNotifier {
    fn order_confirmation(&self, order: &OrderView) -> Result<(), DomainError> {
        log::info!(
            "notification [order_confirmation] -> user {}: {}",
            order.user_id,
            render_order_confirmation(order)
        );
        Ok(())
    }

    fn payment_received(&self, order: &OrderView) -> Result<(), DomainError> {
        log::info!(
            "notification [payment_received] -> user {}: {}",
            order.user_id,
            render_payment_received(order)
        );
        Ok(())
    }
}
