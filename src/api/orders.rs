//! Admin order management, plus the order persistence shared with checkout
//! and the customer account pages.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminSession;
use crate::domain::aggregates::{CartItem, OrderStatus, PaymentMethod, PaymentStatus, Totals};
use crate::domain::events::DomainEvent;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::models::{ListParams, Order, OrderItem, OrderWithItems, PaginatedResponse, ShippingAddress};
use crate::AppState;

pub struct NewOrder {
    pub order_number: String,
    pub customer_id: Option<Uuid>,
    pub email: String,
    pub payment_method: PaymentMethod,
    pub totals: Totals,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub items: Vec<CartItem>,
}

pub async fn insert_order(conn: &mut PgConnection, o: NewOrder) -> ApiResult<OrderWithItems> {
    let order = sqlx::query_as::<_, Order>("INSERT INTO orders (id, order_number, customer_id, email, status, payment_status, payment_method, subtotal, shipping_cost, tax, total, currency, shipping_address, notes, created_at, updated_at) VALUES ($1, $2, $3, $4, 'pending', 'pending', $5, $6, $7, $8, $9, $10, $11, $12, NOW(), NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(&o.order_number).bind(o.customer_id).bind(&o.email).bind(o.payment_method.as_ref())
        .bind(o.totals.subtotal).bind(o.totals.shipping).bind(o.totals.tax).bind(o.totals.total).bind(&o.totals.currency)
        .bind(sqlx::types::Json(&o.shipping_address)).bind(&o.notes)
        .fetch_one(&mut *conn).await?;
    let mut items = Vec::with_capacity(o.items.len());
    for item in &o.items {
        let row = sqlx::query_as::<_, OrderItem>("INSERT INTO order_items (id, order_id, product_id, product_name, unit_price, quantity, line_total) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *")
            .bind(Uuid::now_v7()).bind(order.id).bind(item.product_id).bind(&item.name)
            .bind(item.unit_price.amount()).bind(item.quantity as i32).bind(item.line_total().amount())
            .fetch_one(&mut *conn).await?;
        items.push(row);
    }
    Ok(OrderWithItems { order, items })
}

pub async fn load_items(db: &PgPool, order_id: Uuid) -> ApiResult<Vec<OrderItem>> {
    Ok(sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY product_name").bind(order_id).fetch_all(db).await?)
}

pub async fn fetch_order(db: &PgPool, id: Uuid, customer_id: Option<Uuid>) -> ApiResult<OrderWithItems> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND ($2::uuid IS NULL OR customer_id = $2)")
        .bind(id).bind(customer_id).fetch_optional(db).await?
        .ok_or_else(|| ApiError::not_found("Order"))?;
    let items = load_items(db, order.id).await?;
    Ok(OrderWithItems { order, items })
}

/// Puts the stock of every line of an order back on the shelf.
pub async fn restock(conn: &mut PgConnection, order_id: Uuid) -> ApiResult<()> {
    sqlx::query("UPDATE products p SET stock = p.stock + oi.quantity, updated_at = NOW() FROM order_items oi WHERE oi.order_id = $1 AND oi.product_id = p.id")
        .bind(order_id).execute(&mut *conn).await?;
    Ok(())
}

pub fn parse_status(raw: &str) -> OrderStatus { OrderStatus::from_str(raw).unwrap_or_default() }

#[derive(Debug, Deserialize)]
pub struct OrderFilters {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Matches order number or email
    pub search: Option<String>,
}

impl OrderFilters {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(status) = self.status { qb.push(" AND status = ").push_bind(status.as_ref().to_string()); }
        if let Some(ps) = self.payment_status { qb.push(" AND payment_status = ").push_bind(ps.as_ref().to_string()); }
        let params = ListParams { page: None, per_page: None, search: self.search.clone() };
        if let Some(pattern) = params.search_pattern() {
            qb.push(" AND (order_number ILIKE ").push_bind(pattern.clone()).push(" OR email ILIKE ").push_bind(pattern).push(")");
        }
    }
}

pub async fn list_orders(State(s): State<AppState>, _admin: AdminSession, Query(f): Query<OrderFilters>) -> ApiResult<Json<PaginatedResponse<Order>>> {
    let params = ListParams { page: f.page, per_page: f.per_page, search: None };
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
    f.push_where(&mut count);
    let (total,): (i64,) = count.build_query_as().fetch_one(&s.db).await?;

    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM orders");
    f.push_where(&mut select);
    select.push(" ORDER BY created_at DESC LIMIT ").push_bind(params.per_page() as i64).push(" OFFSET ").push_bind(params.offset());
    let data = select.build_query_as::<Order>().fetch_all(&s.db).await?;
    Ok(Json(PaginatedResponse { data, total, page: params.page(), per_page: params.per_page() }))
}

pub async fn get_order(State(s): State<AppState>, _admin: AdminSession, Path(id): Path<Uuid>) -> ApiResult<Json<OrderWithItems>> {
    Ok(Json(fetch_order(&s.db, id, None).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    #[validate(length(min = 1, max = 100))]
    pub tracking_number: Option<String>,
}

/// Any status may follow any other; the back-office is trusted.
pub async fn update_status(State(s): State<AppState>, AdminSession(admin): AdminSession, Path(id): Path<Uuid>, Json(r): Json<UpdateStatusRequest>) -> ApiResult<Json<Order>> {
    r.validate()?;
    let mut tx = s.db.begin().await?;
    let (previous,): (String,) = sqlx::query_as("SELECT status FROM orders WHERE id = $1 FOR UPDATE").bind(id).fetch_optional(&mut *tx).await?
        .ok_or_else(|| ApiError::not_found("Order"))?;
    let order = sqlx::query_as::<_, Order>("UPDATE orders SET status = $2, tracking_number = COALESCE($3, tracking_number), updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(r.status.as_ref()).bind(&r.tracking_number).fetch_one(&mut *tx).await?;
    tx.commit().await?;
    let from = parse_status(&previous);
    tracing::info!(order_id = %id, %from, to = %r.status, admin_id = %admin.id, "order status changed");
    if from != r.status {
        s.events.publish(DomainEvent::OrderStatusChanged { order_id: id, from, to: r.status }).await;
    }
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest { pub payment_status: PaymentStatus }

pub async fn update_payment_status(State(s): State<AppState>, _admin: AdminSession, Path(id): Path<Uuid>, Json(r): Json<UpdatePaymentRequest>) -> ApiResult<Json<Order>> {
    let order = sqlx::query_as::<_, Order>("UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(r.payment_status.as_ref()).fetch_optional(&s.db).await?
        .ok_or_else(|| ApiError::not_found("Order"))?;
    tracing::info!(order_id = %id, payment_status = %r.payment_status, "payment status updated");
    Ok(Json(order))
}

pub async fn delete_order(State(s): State<AppState>, _admin: AdminSession, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let done = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&s.db).await?;
    if done.rows_affected() == 0 { return Err(ApiError::not_found("Order")); }
    tracing::info!(order_id = %id, "order deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_stored_status_reads_as_pending() {
        assert_eq!(parse_status("delivered"), OrderStatus::Delivered);
        assert_eq!(parse_status("archived"), OrderStatus::Pending);
    }

    #[test]
    fn test_status_request_parsing() {
        let r: UpdateStatusRequest = serde_json::from_value(json!({"status": "shipped", "tracking_number": "1Z999"})).unwrap();
        assert_eq!(r.status, OrderStatus::Shipped);
        assert!(r.validate().is_ok());
        assert!(serde_json::from_value::<UpdateStatusRequest>(json!({"status": "teleported"})).is_err());
        let r: UpdateStatusRequest = serde_json::from_value(json!({"status": "cancelled", "tracking_number": ""})).unwrap();
        assert!(r.validate().is_err());
    }
}
