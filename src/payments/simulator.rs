//! Simulated wallet and Swiss gateways.
//!
//! None of these talk to a real processor: they wait a fixed delay, decline
//! anything above a per-gateway ceiling and fabricate a receipt otherwise.

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::domain::aggregates::PaymentMethod;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Gateway { ApplePay, GooglePay, Swiss }

impl Gateway {
    /// Largest single charge the gateway approves.
    pub fn limit(self) -> Decimal {
        match self {
            Gateway::ApplePay | Gateway::GooglePay => Decimal::new(10_000, 0),
            Gateway::Swiss => Decimal::new(5_000, 0),
        }
    }

    pub fn accepts_currency(self, currency: &str) -> bool {
        match self {
            Gateway::Swiss => matches!(currency, "CHF" | "EUR"),
            Gateway::ApplePay | Gateway::GooglePay => currency.len() == 3,
        }
    }

    pub fn method(self) -> PaymentMethod {
        match self {
            Gateway::ApplePay => PaymentMethod::ApplePay,
            Gateway::GooglePay => PaymentMethod::GooglePay,
            Gateway::Swiss => PaymentMethod::Swiss,
        }
    }

    fn prefix(self) -> &'static str {
        match self { Gateway::ApplePay => "ap", Gateway::GooglePay => "gp", Gateway::Swiss => "ch" }
    }
}

#[derive(Clone, Debug)]
pub struct ChargeRequest {
    pub gateway: Gateway,
    pub amount: Decimal,
    pub currency: String,
    /// Wallet token or Swiss account/IBAN, used only for the masked receipt field
    pub source: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Receipt {
    pub transaction_id: String,
    pub receipt_number: String,
    pub status: &'static str,
    pub gateway: Gateway,
    pub amount: Decimal,
    pub currency: String,
    pub source_last4: String,
    pub processed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChargeError {
    InvalidAmount,
    UnsupportedCurrency(String),
    Declined { reason: String },
}

impl std::error::Error for ChargeError {}
impl std::fmt::Display for ChargeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAmount => write!(f, "Amount must be greater than zero"),
            Self::UnsupportedCurrency(c) => write!(f, "Currency {} is not supported by this gateway", c),
            Self::Declined { reason } => write!(f, "Payment declined: {}", reason),
        }
    }
}

/// Rejects requests no gateway would accept, before any simulated latency.
pub fn check_input(req: &ChargeRequest) -> Result<(), ChargeError> {
    if req.amount <= Decimal::ZERO { return Err(ChargeError::InvalidAmount); }
    if !req.gateway.accepts_currency(&req.currency) { return Err(ChargeError::UnsupportedCurrency(req.currency.clone())); }
    Ok(())
}

pub fn check_limit(req: &ChargeRequest) -> Result<(), ChargeError> {
    if req.amount > req.gateway.limit() {
        return Err(ChargeError::Declined { reason: format!("amount exceeds the {} limit of {}", req.gateway, req.gateway.limit()) });
    }
    Ok(())
}

pub async fn charge(req: ChargeRequest, delay: Duration) -> Result<Receipt, ChargeError> {
    check_input(&req)?;
    // Declines take as long as approvals.
    tokio::time::sleep(delay).await;
    check_limit(&req)?;
    let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(10).map(|b| (b as char).to_ascii_uppercase()).collect();
    let source_last4 = req.source.as_deref()
        .map(|s| s.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|s| s.len() >= 4)
        .map(|s| s[s.len() - 4..].to_string())
        .unwrap_or_else(|| format!("{:04}", rand::thread_rng().gen_range(0..10_000)));
    let now = Utc::now();
    Ok(Receipt {
        transaction_id: format!("{}_{}", req.gateway.prefix(), Uuid::new_v4().simple()),
        receipt_number: format!("RCPT-{}-{}", now.format("%Y%m%d"), suffix),
        status: "succeeded",
        gateway: req.gateway,
        amount: req.amount,
        currency: req.currency,
        source_last4,
        processed_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(gateway: Gateway, amount: i64, currency: &str) -> ChargeRequest {
        ChargeRequest { gateway, amount: Decimal::new(amount, 2), currency: currency.into(), source: Some("tok_4242 4242 4242 1881".into()) }
    }

    #[test]
    fn test_thresholds() {
        assert!(check_limit(&req(Gateway::ApplePay, 1_000_000, "USD")).is_ok());
        assert!(matches!(check_limit(&req(Gateway::ApplePay, 1_000_001, "USD")), Err(ChargeError::Declined { .. })));
        assert!(check_limit(&req(Gateway::Swiss, 500_000, "CHF")).is_ok());
        assert!(matches!(check_limit(&req(Gateway::Swiss, 500_001, "CHF")), Err(ChargeError::Declined { .. })));
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(check_input(&req(Gateway::GooglePay, 0, "USD")), Err(ChargeError::InvalidAmount));
        assert_eq!(check_input(&req(Gateway::Swiss, 100, "USD")), Err(ChargeError::UnsupportedCurrency("USD".into())));
        assert!(check_input(&req(Gateway::Swiss, 100, "EUR")).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_fields() {
        let r = charge(req(Gateway::GooglePay, 2599, "USD"), Duration::from_millis(1500)).await.unwrap();
        assert!(r.transaction_id.starts_with("gp_"));
        assert!(r.receipt_number.starts_with("RCPT-"));
        assert_eq!(r.source_last4, "1881");
        assert_eq!(r.amount, Decimal::new(2599, 2));
        assert_eq!(r.status, "succeeded");
    }

    #[tokio::test(start_paused = true)]
    async fn test_charge_waits_for_delay() {
        let start = tokio::time::Instant::now();
        charge(req(Gateway::ApplePay, 100, "USD"), Duration::from_millis(1500)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }
}
