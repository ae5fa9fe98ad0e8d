//! Signed-in customer's profile and order history.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::orders::{fetch_order, parse_status, restock};
use crate::auth::{password, session, CustomerSession, Role};
use crate::domain::aggregates::OrderStatus;
use crate::domain::events::DomainEvent;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::models::{Customer, ListParams, Order, OrderWithItems, PaginatedResponse};
use crate::AppState;

pub async fn profile(State(s): State<AppState>, customer: CustomerSession) -> ApiResult<Json<Customer>> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1").bind(customer.customer_id()).fetch_optional(&s.db).await?
        .map(Json).ok_or_else(|| ApiError::not_found("Customer"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))] pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))] pub last_name: Option<String>,
    #[validate(length(max = 40))] pub phone: Option<String>,
}

pub async fn update_profile(State(s): State<AppState>, customer: CustomerSession, Json(r): Json<UpdateProfileRequest>) -> ApiResult<Json<Customer>> {
    r.validate()?;
    let c = sqlx::query_as::<_, Customer>("UPDATE customers SET first_name = COALESCE($2, first_name), last_name = COALESCE($3, last_name), phone = COALESCE($4, phone), updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(customer.customer_id()).bind(r.first_name.as_deref().map(str::trim)).bind(r.last_name.as_deref().map(str::trim)).bind(&r.phone)
        .fetch_optional(&s.db).await?
        .ok_or_else(|| ApiError::not_found("Customer"))?;
    Ok(Json(c))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))] pub current_password: String,
    #[validate(length(min = 8, max = 128))] pub new_password: String,
}

/// Also signs out every other session of this customer.
pub async fn change_password(State(s): State<AppState>, CustomerSession(principal): CustomerSession, Json(r): Json<ChangePasswordRequest>) -> ApiResult<StatusCode> {
    r.validate()?;
    let (hash,): (String,) = sqlx::query_as("SELECT password_hash FROM customers WHERE id = $1").bind(principal.id).fetch_optional(&s.db).await?
        .ok_or_else(|| ApiError::not_found("Customer"))?;
    if !password::verify_password(&hash, &r.current_password)? {
        return Err(ApiError::BadRequest("Current password is incorrect".into()));
    }
    let new_hash = password::hash_password(&r.new_password)?;
    sqlx::query("UPDATE customers SET password_hash = $2, updated_at = NOW() WHERE id = $1").bind(principal.id).bind(&new_hash).execute(&s.db).await?;
    session::revoke_all_except(&s.db, Role::Customer, principal.id, principal.session_id).await?;
    tracing::info!(customer_id = %principal.id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_orders(State(s): State<AppState>, customer: CustomerSession, Query(p): Query<ListParams>) -> ApiResult<Json<PaginatedResponse<Order>>> {
    let id = customer.customer_id();
    let data = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3")
        .bind(id).bind(p.per_page() as i64).bind(p.offset()).fetch_all(&s.db).await?;
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE customer_id = $1").bind(id).fetch_one(&s.db).await?;
    Ok(Json(PaginatedResponse { data, total, page: p.page(), per_page: p.per_page() }))
}

/// Orders of other customers read as not found.
pub async fn get_order(State(s): State<AppState>, customer: CustomerSession, Path(id): Path<Uuid>) -> ApiResult<Json<OrderWithItems>> {
    Ok(Json(fetch_order(&s.db, id, Some(customer.customer_id())).await?))
}

/// Customers may cancel while the order is still pending; stock is returned.
pub async fn cancel_order(State(s): State<AppState>, customer: CustomerSession, Path(id): Path<Uuid>) -> ApiResult<Json<OrderWithItems>> {
    let mut tx = s.db.begin().await?;
    let (status,): (String,) = sqlx::query_as("SELECT status FROM orders WHERE id = $1 AND customer_id = $2 FOR UPDATE")
        .bind(id).bind(customer.customer_id()).fetch_optional(&mut *tx).await?
        .ok_or_else(|| ApiError::not_found("Order"))?;
    let from = parse_status(&status);
    if !from.can_be_cancelled_by_customer() {
        return Err(ApiError::BadRequest(format!("Orders that are {} can no longer be cancelled", from)));
    }
    sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1").bind(id).bind(OrderStatus::Cancelled.as_ref()).execute(&mut *tx).await?;
    restock(&mut *tx, id).await?;
    tx.commit().await?;
    tracing::info!(order_id = %id, customer_id = %customer.customer_id(), "order cancelled by customer");
    s.events.publish(DomainEvent::OrderStatusChanged { order_id: id, from, to: OrderStatus::Cancelled }).await;
    Ok(Json(fetch_order(&s.db, id, Some(customer.customer_id())).await?))
}
