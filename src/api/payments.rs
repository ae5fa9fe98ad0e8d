use axum::extract::State;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use super::orders::parse_status;
use crate::domain::aggregates::{PaymentMethod, PaymentStatus};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Money;
use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::models::Order;
use crate::payments::{self, ChargeError, ChargeRequest, Gateway, Receipt};
use crate::settings::StoreSettings;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub currency: Option<String>,
    /// When set, the order is marked paid (or failed) with the outcome
    pub order_id: Option<Uuid>,
    /// Wallet payment token
    pub token: Option<String>,
    /// Swiss bank account / IBAN
    pub account: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    #[serde(flatten)]
    pub receipt: Receipt,
    pub order_id: Option<Uuid>,
}

pub async fn apple_pay(State(s): State<AppState>, Json(r): Json<PaymentRequest>) -> ApiResult<Json<PaymentResponse>> {
    process(&s, Gateway::ApplePay, r).await
}

pub async fn google_pay(State(s): State<AppState>, Json(r): Json<PaymentRequest>) -> ApiResult<Json<PaymentResponse>> {
    process(&s, Gateway::GooglePay, r).await
}

pub async fn swiss(State(s): State<AppState>, Json(r): Json<PaymentRequest>) -> ApiResult<Json<PaymentResponse>> {
    process(&s, Gateway::Swiss, r).await
}

async fn payable_order(s: &AppState, order_id: Uuid) -> ApiResult<Order> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(&s.db).await?
        .ok_or_else(|| ApiError::not_found("Order"))?;
    if order.payment_status == PaymentStatus::Paid.as_ref() {
        return Err(ApiError::BadRequest("Order is already paid".into()));
    }
    if parse_status(&order.status).is_void() {
        return Err(ApiError::BadRequest("Order has been cancelled".into()));
    }
    Ok(order)
}

async fn process(s: &AppState, gateway: Gateway, r: PaymentRequest) -> ApiResult<Json<PaymentResponse>> {
    let order = match r.order_id {
        Some(id) => Some(payable_order(s, id).await?),
        None => None,
    };
    if let Some(order) = &order {
        if order.total != r.amount {
            return Err(ApiError::BadRequest(format!("Amount {} does not match order total {}", r.amount, order.total)));
        }
    }
    let currency = match charge_currency(r.currency.as_deref(), order.as_ref().map(|o| o.currency.as_str()))? {
        Some(c) => c,
        None => StoreSettings::load(&s.db).await?.currency(),
    };

    let request = ChargeRequest { gateway, amount: r.amount, currency, source: r.token.or(r.account) };
    let delay = Duration::from_millis(s.config.payment_delay_ms);
    match payments::charge(request, delay).await {
        Ok(receipt) => {
            tracing::info!(%gateway, transaction_id = %receipt.transaction_id, amount = %receipt.amount, "payment approved");
            if let Some(order) = &order {
                mark_paid(s, order.id, gateway.method(), &receipt.transaction_id).await?;
            }
            Ok(Json(PaymentResponse { receipt, order_id: order.map(|o| o.id) }))
        }
        Err(e @ ChargeError::Declined { .. }) => {
            tracing::warn!(%gateway, error = %e, "payment declined");
            if let Some(order) = &order {
                if !mark_failed(&s.db, order.id, gateway.method()).await? {
                    tracing::warn!(order_id = %order.id, "order settled before the decline was recorded");
                }
            }
            Err(ApiError::PaymentDeclined(e.to_string()))
        }
        Err(e) => Err(ApiError::BadRequest(e.to_string())),
    }
}

/// Currency to charge in. A requested currency must match the order's;
/// `None` means neither was given and the store default applies.
pub fn charge_currency(requested: Option<&str>, order_currency: Option<&str>) -> ApiResult<Option<String>> {
    let requested = requested.map(|c| c.trim().to_uppercase()).filter(|c| !c.is_empty());
    match (requested, order_currency) {
        (Some(c), Some(o)) if !c.eq_ignore_ascii_case(o) => {
            Err(ApiError::BadRequest(format!("Currency {} does not match order currency {}", c, o)))
        }
        (Some(c), _) => Ok(Some(c)),
        (None, o) => Ok(o.map(str::to_uppercase)),
    }
}

const SETTLEABLE: &str = "payment_status <> 'paid' AND status <> 'cancelled'";

/// Records a successful payment; pending orders move on to processing.
/// Conflicts when the order was paid or cancelled since it was read.
pub async fn mark_paid(s: &AppState, order_id: Uuid, method: PaymentMethod, reference: &str) -> ApiResult<()> {
    let result = sqlx::query(&format!(
        "UPDATE orders SET payment_status = 'paid', payment_method = $2, payment_reference = $3, \
         status = CASE WHEN status = 'pending' THEN 'processing' ELSE status END, updated_at = NOW() \
         WHERE id = $1 AND {}", SETTLEABLE
    )).bind(order_id).bind(method.as_ref()).bind(reference).execute(&s.db).await?;
    if result.rows_affected() == 0 {
        tracing::warn!(%order_id, reference, "payment approved for an order that is no longer payable");
        return Err(ApiError::Conflict("Order was paid or cancelled while the payment was processing".into()));
    }
    s.events.publish(DomainEvent::OrderPaid { order_id, method, reference: reference.to_string() }).await;
    Ok(())
}

/// Marks the payment failed unless the order was settled meanwhile.
pub async fn mark_failed(db: &PgPool, order_id: Uuid, method: PaymentMethod) -> ApiResult<bool> {
    let result = sqlx::query(&format!(
        "UPDATE orders SET payment_status = 'failed', payment_method = $2, updated_at = NOW() WHERE id = $1 AND {}", SETTLEABLE
    )).bind(order_id).bind(method.as_ref()).execute(db).await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Deserialize)]
pub struct StripeIntentRequest { pub order_id: Uuid }

#[derive(Debug, Serialize)]
pub struct StripeIntentResponse { pub payment_intent_id: String, pub client_secret: Option<String>, pub amount: i64, pub currency: String }

pub async fn stripe_intent(State(s): State<AppState>, Json(r): Json<StripeIntentRequest>) -> ApiResult<Json<StripeIntentResponse>> {
    let stripe = s.stripe.as_ref().ok_or_else(|| ApiError::BadRequest("Stripe payments are not enabled".into()))?;
    let order = payable_order(&s, r.order_id).await?;
    let amount = Money::new(order.total, &order.currency).minor_units();
    let metadata = HashMap::from([
        ("order_id".to_string(), order.id.to_string()),
        ("order_number".to_string(), order.order_number.clone()),
    ]);
    let intent = stripe.create_payment_intent(amount, &order.currency, metadata).await?;
    sqlx::query("UPDATE orders SET payment_method = $2, payment_reference = $3, updated_at = NOW() WHERE id = $1")
        .bind(order.id).bind(PaymentMethod::Stripe.as_ref()).bind(&intent.id).execute(&s.db).await?;
    Ok(Json(StripeIntentResponse { payment_intent_id: intent.id, client_secret: intent.client_secret, amount: intent.amount, currency: intent.currency }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_follows_order() {
        assert_eq!(charge_currency(None, Some("EUR")).unwrap().as_deref(), Some("EUR"));
        assert_eq!(charge_currency(Some(" eur "), Some("EUR")).unwrap().as_deref(), Some("EUR"));
        assert_eq!(charge_currency(Some("chf"), None).unwrap().as_deref(), Some("CHF"));
        assert_eq!(charge_currency(None, None).unwrap(), None);
        assert_eq!(charge_currency(Some("  "), None).unwrap(), None);
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let err = charge_currency(Some("USD"), Some("CHF")).unwrap_err();
        assert!(matches!(&err, ApiError::BadRequest(m) if m == "Currency USD does not match order currency CHF"));
    }
}
