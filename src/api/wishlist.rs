use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CustomerSession;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path};
use crate::models::{Product, WishlistItem};
use crate::AppState;

/// A wishlist entry with the product it points at.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct WishlistEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub added_at: DateTime<Utc>,
}

pub async fn list_wishlist(State(s): State<AppState>, customer: CustomerSession) -> ApiResult<Json<Vec<WishlistEntry>>> {
    let rows = sqlx::query_as::<_, WishlistEntry>("SELECT p.*, w.created_at AS added_at FROM wishlist_items w JOIN products p ON p.id = w.product_id WHERE w.customer_id = $1 ORDER BY w.created_at DESC")
        .bind(customer.customer_id()).fetch_all(&s.db).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct AddToWishlist { pub product_id: Uuid }

/// Adding a product twice is not an error; the existing entry comes back with 200.
pub async fn add_to_wishlist(State(s): State<AppState>, customer: CustomerSession, Json(r): Json<AddToWishlist>) -> ApiResult<(StatusCode, Json<WishlistItem>)> {
    let customer_id = customer.customer_id();
    let known: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1").bind(r.product_id).fetch_optional(&s.db).await?;
    if known.is_none() { return Err(ApiError::not_found("Product")); }

    let inserted = sqlx::query_as::<_, WishlistItem>("INSERT INTO wishlist_items (id, customer_id, product_id, created_at) VALUES ($1, $2, $3, NOW()) ON CONFLICT (customer_id, product_id) DO NOTHING RETURNING *")
        .bind(Uuid::now_v7()).bind(customer_id).bind(r.product_id).fetch_optional(&s.db).await?;
    match inserted {
        Some(item) => Ok((StatusCode::CREATED, Json(item))),
        None => {
            let item = sqlx::query_as::<_, WishlistItem>("SELECT * FROM wishlist_items WHERE customer_id = $1 AND product_id = $2")
                .bind(customer_id).bind(r.product_id).fetch_one(&s.db).await?;
            Ok((StatusCode::OK, Json(item)))
        }
    }
}

pub async fn remove_from_wishlist(State(s): State<AppState>, customer: CustomerSession, Path(product_id): Path<Uuid>) -> ApiResult<StatusCode> {
    let done = sqlx::query("DELETE FROM wishlist_items WHERE customer_id = $1 AND product_id = $2")
        .bind(customer.customer_id()).bind(product_id).execute(&s.db).await?;
    if done.rows_affected() == 0 { return Err(ApiError::not_found("Wishlist item")); }
    Ok(StatusCode::NO_CONTENT)
}
