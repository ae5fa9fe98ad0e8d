//! Order lifecycle vocabulary
//!
//! Admins may move an order between any two statuses; nothing here enforces a
//! transition graph. The one rule the storefront applies is on the customer
//! side: a customer may only cancel an order that is still pending.

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed, Refunded }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod { Card, Stripe, ApplePay, GooglePay, Swiss, CashOnDelivery }

impl OrderStatus {
    pub fn can_be_cancelled_by_customer(self) -> bool { self == OrderStatus::Pending }
    /// Orders in these states no longer count towards revenue.
    pub fn is_void(self) -> bool { self == OrderStatus::Cancelled }
}

/// `ORD-20240131-7KQ2ZP`
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_status_strings() {
        assert_eq!(OrderStatus::from_str("shipped").unwrap(), OrderStatus::Shipped);
        assert_eq!(OrderStatus::Cancelled.as_ref(), "cancelled");
        assert!(OrderStatus::from_str("lost").is_err());
        assert_eq!(PaymentMethod::from_str("apple_pay").unwrap(), PaymentMethod::ApplePay);
        assert_eq!(PaymentStatus::Refunded.to_string(), "refunded");
        for status in OrderStatus::iter() {
            assert_eq!(OrderStatus::from_str(status.as_ref()).unwrap(), status);
        }
    }

    #[test]
    fn test_customer_cancellation_window() {
        assert!(OrderStatus::Pending.can_be_cancelled_by_customer());
        assert!(!OrderStatus::Processing.can_be_cancelled_by_customer());
        assert!(!OrderStatus::Delivered.can_be_cancelled_by_customer());
    }

    #[test]
    fn test_order_number_format() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let n = generate_order_number(now);
        assert!(n.starts_with("ORD-20240131-"));
        assert_eq!(n.len(), "ORD-20240131-".len() + 6);
        assert!(n[13..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
