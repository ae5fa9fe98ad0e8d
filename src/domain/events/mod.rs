//! Domain events
use crate::domain::aggregates::{OrderStatus, PaymentMethod};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: Uuid, order_number: String, customer_id: Option<Uuid>, total: Decimal },
    OrderStatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    OrderPaid { order_id: Uuid, method: PaymentMethod, reference: String },
    ProductCreated { product_id: Uuid, slug: String },
    ProductDeleted { product_id: Uuid },
    CustomerRegistered { customer_id: Uuid, email: String },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "storefront.order.placed",
            Self::OrderStatusChanged { .. } => "storefront.order.status_changed",
            Self::OrderPaid { .. } => "storefront.order.paid",
            Self::ProductCreated { .. } => "storefront.product.created",
            Self::ProductDeleted { .. } => "storefront.product.deleted",
            Self::CustomerRegistered { .. } => "storefront.customer.registered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_event_payload_is_tagged() {
        let e = DomainEvent::OrderStatusChanged { order_id: Uuid::nil(), from: OrderStatus::Pending, to: OrderStatus::Shipped };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "order_status_changed");
        assert_eq!(v["to"], "shipped");
        assert_eq!(e.subject(), "storefront.order.status_changed");
    }
}
