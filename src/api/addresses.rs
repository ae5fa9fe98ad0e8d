//! Saved shipping addresses. A customer has at most one default address; the
//! first one saved becomes the default.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::auth::CustomerSession;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path};
use crate::models::Address;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(max = 50))] pub label: Option<String>,
    #[validate(length(min = 1, max = 200))] pub full_name: String,
    #[validate(length(min = 1, max = 200))] pub line1: String,
    #[validate(length(max = 200))] pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))] pub city: String,
    #[validate(length(max = 100))] pub state: Option<String>,
    #[validate(length(min = 1, max = 20))] pub postal_code: String,
    #[validate(length(min = 2, max = 56))] pub country: String,
    #[validate(length(max = 40))] pub phone: Option<String>,
    pub is_default: Option<bool>,
}

async fn clear_default(conn: &mut PgConnection, customer_id: Uuid) -> ApiResult<()> {
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE customer_id = $1 AND is_default").bind(customer_id).execute(&mut *conn).await?;
    Ok(())
}

pub async fn list_addresses(State(s): State<AppState>, customer: CustomerSession) -> ApiResult<Json<Vec<Address>>> {
    let rows = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE customer_id = $1 ORDER BY is_default DESC, created_at")
        .bind(customer.customer_id()).fetch_all(&s.db).await?;
    Ok(Json(rows))
}

pub async fn create_address(State(s): State<AppState>, customer: CustomerSession, Json(a): Json<AddressInput>) -> ApiResult<(StatusCode, Json<Address>)> {
    a.validate()?;
    let customer_id = customer.customer_id();
    let mut tx = s.db.begin().await?;
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM addresses WHERE customer_id = $1").bind(customer_id).fetch_one(&mut *tx).await?;
    let make_default = existing == 0 || a.is_default.unwrap_or(false);
    if make_default { clear_default(&mut *tx, customer_id).await?; }
    let address = sqlx::query_as::<_, Address>("INSERT INTO addresses (id, customer_id, label, full_name, line1, line2, city, state, postal_code, country, phone, is_default, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(customer_id).bind(&a.label).bind(&a.full_name).bind(&a.line1).bind(&a.line2)
        .bind(&a.city).bind(&a.state).bind(&a.postal_code).bind(&a.country).bind(&a.phone).bind(make_default)
        .fetch_one(&mut *tx).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn update_address(State(s): State<AppState>, customer: CustomerSession, Path(id): Path<Uuid>, Json(a): Json<AddressInput>) -> ApiResult<Json<Address>> {
    a.validate()?;
    let customer_id = customer.customer_id();
    let mut tx = s.db.begin().await?;
    if a.is_default == Some(true) { clear_default(&mut *tx, customer_id).await?; }
    let address = sqlx::query_as::<_, Address>("UPDATE addresses SET label = $3, full_name = $4, line1 = $5, line2 = $6, city = $7, state = $8, postal_code = $9, country = $10, phone = $11, is_default = COALESCE($12, is_default) WHERE id = $1 AND customer_id = $2 RETURNING *")
        .bind(id).bind(customer_id).bind(&a.label).bind(&a.full_name).bind(&a.line1).bind(&a.line2)
        .bind(&a.city).bind(&a.state).bind(&a.postal_code).bind(&a.country).bind(&a.phone).bind(a.is_default)
        .fetch_optional(&mut *tx).await?
        .ok_or_else(|| ApiError::not_found("Address"))?;
    tx.commit().await?;
    Ok(Json(address))
}

/// Deleting the default promotes the most recently added remaining address.
pub async fn delete_address(State(s): State<AppState>, customer: CustomerSession, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let customer_id = customer.customer_id();
    let mut tx = s.db.begin().await?;
    let (was_default,): (bool,) = sqlx::query_as("DELETE FROM addresses WHERE id = $1 AND customer_id = $2 RETURNING is_default")
        .bind(id).bind(customer_id).fetch_optional(&mut *tx).await?
        .ok_or_else(|| ApiError::not_found("Address"))?;
    if was_default {
        sqlx::query("UPDATE addresses SET is_default = TRUE WHERE id = (SELECT id FROM addresses WHERE customer_id = $1 ORDER BY created_at DESC LIMIT 1)")
            .bind(customer_id).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_default_address(State(s): State<AppState>, customer: CustomerSession, Path(id): Path<Uuid>) -> ApiResult<Json<Address>> {
    let customer_id = customer.customer_id();
    let mut tx = s.db.begin().await?;
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM addresses WHERE id = $1 AND customer_id = $2").bind(id).bind(customer_id).fetch_optional(&mut *tx).await?;
    if exists.is_none() { return Err(ApiError::not_found("Address")); }
    clear_default(&mut *tx, customer_id).await?;
    let address = sqlx::query_as::<_, Address>("UPDATE addresses SET is_default = TRUE WHERE id = $1 RETURNING *").bind(id).fetch_one(&mut *tx).await?;
    tx.commit().await?;
    Ok(Json(address))
}
