//! Back-office product management.

use axum::{extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::catalog::{query_products, ProductFilters};
use crate::auth::AdminSession;
use crate::domain::aggregates::adjusted_stock;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Slug;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::models::{PaginatedResponse, Product};
use crate::AppState;

fn non_negative(d: &Decimal) -> Result<(), ValidationError> {
    if d.is_sign_negative() { Err(ValidationError::new("negative")) } else { Ok(()) }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Derived from the name when absent
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(custom = "non_negative")]
    pub price: Decimal,
    #[validate(custom = "non_negative")]
    pub compare_at_price: Option<Decimal>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(custom = "non_negative")]
    pub price: Option<Decimal>,
    #[validate(custom = "non_negative")]
    pub compare_at_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub images: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub active: Option<bool>,
}

fn slug_for(explicit: Option<&str>, name: &str) -> ApiResult<String> {
    Slug::new(explicit.unwrap_or(name)).map(Slug::into_inner).map_err(|e| ApiError::BadRequest(format!("slug: {}", e)))
}

pub async fn list_products(State(s): State<AppState>, _admin: AdminSession, Query(f): Query<ProductFilters>) -> ApiResult<Json<PaginatedResponse<Product>>> {
    Ok(Json(query_products(&s, &f, false).await?))
}

pub async fn create_product(State(s): State<AppState>, _admin: AdminSession, Json(p): Json<ProductInput>) -> ApiResult<(StatusCode, Json<Product>)> {
    p.validate()?;
    let slug = slug_for(p.slug.as_deref(), &p.name)?;
    let product = sqlx::query_as::<_, Product>("INSERT INTO products (id, name, slug, description, category, price, compare_at_price, stock, images, featured, active, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(p.name.trim()).bind(&slug).bind(&p.description)
        .bind(p.category.as_deref().map(str::trim).unwrap_or("uncategorized"))
        .bind(p.price).bind(p.compare_at_price).bind(p.stock).bind(&p.images).bind(p.featured).bind(p.active.unwrap_or(true))
        .fetch_one(&s.db).await?;
    tracing::info!(product_id = %product.id, slug = %product.slug, "product created");
    s.events.publish(DomainEvent::ProductCreated { product_id: product.id, slug: product.slug.clone() }).await;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(State(s): State<AppState>, _admin: AdminSession, Path(id): Path<Uuid>) -> ApiResult<Json<Product>> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&s.db).await?
        .map(Json).ok_or_else(|| ApiError::not_found("Product"))
}

/// Partial update; absent fields keep their current value.
pub async fn update_product(State(s): State<AppState>, _admin: AdminSession, Path(id): Path<Uuid>, Json(p): Json<ProductUpdate>) -> ApiResult<Json<Product>> {
    p.validate()?;
    let slug = match p.slug.as_deref() {
        Some(raw) => Some(slug_for(Some(raw), raw)?),
        None => None,
    };
    let product = sqlx::query_as::<_, Product>("UPDATE products SET name = COALESCE($2, name), slug = COALESCE($3, slug), description = COALESCE($4, description), category = COALESCE($5, category), price = COALESCE($6, price), compare_at_price = COALESCE($7, compare_at_price), stock = COALESCE($8, stock), images = COALESCE($9, images), featured = COALESCE($10, featured), active = COALESCE($11, active), updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(p.name.as_deref().map(str::trim)).bind(slug).bind(&p.description).bind(p.category.as_deref().map(str::trim))
        .bind(p.price).bind(p.compare_at_price).bind(p.stock).bind(&p.images).bind(p.featured).bind(p.active)
        .fetch_optional(&s.db).await?
        .ok_or_else(|| ApiError::not_found("Product"))?;
    tracing::info!(product_id = %id, "product updated");
    Ok(Json(product))
}

/// Past order lines keep their snapshot; their product reference is cleared.
pub async fn delete_product(State(s): State<AppState>, _admin: AdminSession, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&s.db).await?;
    if done.rows_affected() == 0 { return Err(ApiError::not_found("Product")); }
    tracing::info!(product_id = %id, "product deleted");
    s.events.publish(DomainEvent::ProductDeleted { product_id: id }).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Either an absolute `stock` or a relative `adjust`, never both.
#[derive(Debug, Deserialize)]
pub struct StockUpdate { pub stock: Option<i32>, pub adjust: Option<i32> }

impl StockUpdate {
    fn apply(&self, current: i32) -> ApiResult<i32> {
        match (self.stock, self.adjust) {
            (Some(stock), None) if stock >= 0 => Ok(stock),
            (Some(_), None) => Err(ApiError::BadRequest("stock must not be negative".into())),
            (None, Some(adjust)) => Ok(adjusted_stock(current, adjust)),
            _ => Err(ApiError::BadRequest("provide exactly one of stock or adjust".into())),
        }
    }
}

pub async fn update_stock(State(s): State<AppState>, _admin: AdminSession, Path(id): Path<Uuid>, Json(r): Json<StockUpdate>) -> ApiResult<Json<Product>> {
    r.apply(0)?;
    let mut tx = s.db.begin().await?;
    let (current,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1 FOR UPDATE").bind(id).fetch_optional(&mut *tx).await?
        .ok_or_else(|| ApiError::not_found("Product"))?;
    let stock = r.apply(current)?;
    let product = sqlx::query_as::<_, Product>("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(stock).fetch_one(&mut *tx).await?;
    tx.commit().await?;
    tracing::info!(product_id = %id, from = current, to = stock, "stock updated");
    Ok(Json(product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stock_update_modes() {
        let set = StockUpdate { stock: Some(12), adjust: None };
        assert_eq!(set.apply(3).unwrap(), 12);
        let adjust = StockUpdate { stock: None, adjust: Some(-5) };
        assert_eq!(adjust.apply(3).unwrap(), 0);
        assert_eq!(adjust.apply(9).unwrap(), 4);
        assert!(StockUpdate { stock: Some(1), adjust: Some(1) }.apply(0).is_err());
        assert!(StockUpdate { stock: None, adjust: None }.apply(0).is_err());
        assert!(StockUpdate { stock: Some(-1), adjust: None }.apply(0).is_err());
    }

    #[test]
    fn test_slug_derived_from_name() {
        assert_eq!(slug_for(None, "Linen Shirt (Blue)").unwrap(), "linen-shirt-blue");
        assert_eq!(slug_for(Some("Summer Sale"), "ignored").unwrap(), "summer-sale");
        assert!(slug_for(None, "!!!").is_err());
    }

    #[test]
    fn test_product_input_validation() {
        let p: ProductInput = serde_json::from_value(json!({"name": "Mug", "price": "12.50"})).unwrap();
        assert!(p.validate().is_ok());
        assert_eq!(p.stock, 0);
        let p: ProductInput = serde_json::from_value(json!({"name": "Mug", "price": "-1", "stock": -3})).unwrap();
        let errors = p.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));
        assert!(errors.field_errors().contains_key("stock"));
    }
}
