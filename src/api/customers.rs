use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::models::{Address, Customer, ListParams, Order, PaginatedResponse};
use crate::AppState;

/// Customer row with lifetime figures; cancelled orders do not count towards spend.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub order_count: i64,
    pub total_spent: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub addresses: Vec<Address>,
    pub orders: Vec<Order>,
}

fn push_search(qb: &mut QueryBuilder<'_, Postgres>, params: &ListParams) {
    if let Some(pattern) = params.search_pattern() {
        qb.push(" WHERE (c.email ILIKE ").push_bind(pattern.clone())
            .push(" OR c.first_name ILIKE ").push_bind(pattern.clone())
            .push(" OR c.last_name ILIKE ").push_bind(pattern).push(")");
    }
}

pub async fn list_customers(State(s): State<AppState>, _admin: AdminSession, Query(p): Query<ListParams>) -> ApiResult<Json<PaginatedResponse<CustomerSummary>>> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customers c");
    push_search(&mut count, &p);
    let (total,): (i64,) = count.build_query_as().fetch_one(&s.db).await?;

    let mut select = QueryBuilder::<Postgres>::new(
        "SELECT c.id, c.email, c.first_name, c.last_name, c.phone, c.created_at, \
         COUNT(o.id) AS order_count, \
         COALESCE(SUM(o.total) FILTER (WHERE o.status <> 'cancelled'), 0) AS total_spent \
         FROM customers c LEFT JOIN orders o ON o.customer_id = c.id",
    );
    push_search(&mut select, &p);
    select.push(" GROUP BY c.id ORDER BY c.created_at DESC LIMIT ").push_bind(p.per_page() as i64).push(" OFFSET ").push_bind(p.offset());
    let data = select.build_query_as::<CustomerSummary>().fetch_all(&s.db).await?;
    Ok(Json(PaginatedResponse { data, total, page: p.page(), per_page: p.per_page() }))
}

pub async fn get_customer(State(s): State<AppState>, _admin: AdminSession, Path(id): Path<Uuid>) -> ApiResult<Json<CustomerDetail>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1").bind(id).fetch_optional(&s.db).await?
        .ok_or_else(|| ApiError::not_found("Customer"))?;
    let addresses = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE customer_id = $1 ORDER BY is_default DESC, created_at").bind(id).fetch_all(&s.db).await?;
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC").bind(id).fetch_all(&s.db).await?;
    Ok(Json(CustomerDetail { customer, addresses, orders }))
}

/// Addresses, wishlist and sessions go with the customer; orders are kept
/// for the books with the customer reference cleared.
pub async fn delete_customer(State(s): State<AppState>, AdminSession(admin): AdminSession, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let mut tx = s.db.begin().await?;
    let done = sqlx::query("DELETE FROM customers WHERE id = $1").bind(id).execute(&mut *tx).await?;
    if done.rows_affected() == 0 { return Err(ApiError::not_found("Customer")); }
    sqlx::query("DELETE FROM sessions WHERE principal = 'customer' AND principal_id = $1").bind(id).execute(&mut *tx).await?;
    tx.commit().await?;
    tracing::info!(customer_id = %id, admin_id = %admin.id, "customer deleted");
    Ok(StatusCode::NO_CONTENT)
}
