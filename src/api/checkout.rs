use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::catalog::{validate_lines, LineRequest};
use super::orders::{insert_order, NewOrder};
use crate::auth::MaybeCustomer;
use crate::domain::aggregates::{generate_order_number, Cart, CartItem, PaymentMethod, StockLevel};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{Email, Money};
use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::models::{Address, OrderWithItems, Product, ShippingAddress};
use crate::settings::StoreSettings;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 50))]
    pub items: Vec<LineRequest>,
    /// Required for guests; signed-in customers always use their account email
    pub email: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    /// A saved address of the signed-in customer
    pub address_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

async fn resolve_email(s: &AppState, customer: Option<Uuid>, given: Option<&str>) -> ApiResult<String> {
    if let Some(id) = customer {
        let (email,): (String,) = sqlx::query_as("SELECT email FROM customers WHERE id = $1").bind(id).fetch_optional(&s.db).await?
            .ok_or_else(ApiError::unauthorized)?;
        return Ok(email);
    }
    let given = given.ok_or_else(|| ApiError::BadRequest("email is required for guest checkout".into()))?;
    Email::parse(given).map(|e| e.as_str().to_string()).map_err(|e| ApiError::BadRequest(e.to_string()))
}

async fn resolve_address(s: &AppState, customer: Option<Uuid>, r: &CheckoutRequest) -> ApiResult<ShippingAddress> {
    match (r.address_id, &r.shipping_address) {
        (Some(address_id), _) => {
            let customer = customer.ok_or_else(|| ApiError::BadRequest("address_id requires a signed-in customer".into()))?;
            let address = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1 AND customer_id = $2")
                .bind(address_id).bind(customer).fetch_optional(&s.db).await?
                .ok_or_else(|| ApiError::not_found("Address"))?;
            Ok(ShippingAddress::from(&address))
        }
        (None, Some(address)) => {
            address.validate()?;
            Ok(address.clone())
        }
        (None, None) => Err(ApiError::BadRequest("shipping_address or address_id is required".into())),
    }
}

/// Places an order: reserves stock under row locks, prices the cart with the
/// store's tax and shipping settings and records the order in one transaction.
pub async fn checkout(State(s): State<AppState>, customer: MaybeCustomer, Json(r): Json<CheckoutRequest>) -> ApiResult<(StatusCode, Json<OrderWithItems>)> {
    r.validate()?;
    validate_lines(&r.items)?;
    let customer_id = customer.0.map(|p| p.id);
    let email = resolve_email(&s, customer_id, r.email.as_deref()).await?;
    let address = resolve_address(&s, customer_id, &r).await?;
    let settings = StoreSettings::load(&s.db).await?;
    let currency = settings.currency();

    let mut ids: Vec<Uuid> = r.items.iter().map(|i| i.product_id).collect();
    ids.sort();
    ids.dedup();

    let mut tx = s.db.begin().await?;
    // Locks are taken in id order so concurrent checkouts cannot deadlock.
    let products: HashMap<Uuid, Product> = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(&ids).fetch_all(&mut *tx).await?
        .into_iter().map(|p| (p.id, p)).collect();

    let mut cart = Cart::new(&currency);
    for line in &r.items {
        let p = products.get(&line.product_id).ok_or_else(|| ApiError::NotFound(format!("Product {} not found", line.product_id)))?;
        cart.add_item(CartItem { product_id: p.id, name: p.name.clone(), quantity: line.quantity, unit_price: Money::new(p.price, &currency) })?;
    }
    for item in cart.items() {
        let p = &products[&item.product_id];
        let remaining = StockLevel::new(p.id, &p.name, p.active, p.stock).reserve(item.quantity)?;
        sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(p.id).bind(remaining.value() as i32).execute(&mut *tx).await?;
    }

    let totals = cart.totals(&settings.pricing());
    let order = insert_order(&mut *tx, NewOrder {
        order_number: generate_order_number(Utc::now()),
        customer_id,
        email,
        payment_method: r.payment_method,
        totals,
        shipping_address: address,
        notes: r.notes.clone(),
        items: cart.items().to_vec(),
    }).await?;
    tx.commit().await?;

    tracing::info!(order_id = %order.order.id, order_number = %order.order.order_number, total = %order.order.total, "order placed");
    s.events.publish(DomainEvent::OrderPlaced {
        order_id: order.order.id,
        order_number: order.order.order_number.clone(),
        customer_id,
        total: order.order.total,
    }).await;
    Ok((StatusCode::CREATED, Json(order)))
}
