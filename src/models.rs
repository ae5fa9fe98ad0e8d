//! Row types mapped from the relational schema in `migrations/`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid, pub name: String, pub slug: String, pub description: String, pub category: String,
    pub price: Decimal, pub compare_at_price: Option<Decimal>, pub stock: i32, pub images: Vec<String>,
    pub featured: bool, pub active: bool,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid, pub email: String,
    #[serde(skip_serializing)] pub password_hash: String,
    pub first_name: String, pub last_name: String, pub phone: Option<String>,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Admin {
    pub id: Uuid, pub email: String,
    #[serde(skip_serializing)] pub password_hash: String,
    pub name: String, pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: Uuid, pub customer_id: Uuid, pub label: Option<String>, pub full_name: String,
    pub line1: String, pub line2: Option<String>, pub city: String, pub state: Option<String>,
    pub postal_code: String, pub country: String, pub phone: Option<String>,
    pub is_default: bool, pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid, pub order_number: String, pub customer_id: Option<Uuid>, pub email: String,
    pub status: String, pub payment_status: String, pub payment_method: String, pub payment_reference: Option<String>,
    pub subtotal: Decimal, pub shipping_cost: Decimal, pub tax: Decimal, pub total: Decimal, pub currency: String,
    pub shipping_address: serde_json::Value, pub notes: Option<String>, pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid, pub order_id: Uuid, pub product_id: Option<Uuid>, pub product_name: String,
    pub unit_price: Decimal, pub quantity: i32, pub line_total: Decimal,
}

/// An order together with its line items, as returned by detail endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WishlistItem { pub id: Uuid, pub customer_id: Uuid, pub product_id: Uuid, pub created_at: DateTime<Utc> }

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Setting { pub key: String, pub value: serde_json::Value, pub updated_at: DateTime<Utc> }

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session { pub id: Uuid, pub principal: String, pub principal_id: Uuid, pub expires_at: DateTime<Utc> }

/// Shipping address snapshot stored on an order; addresses can change or be
/// deleted after the fact, so orders keep their own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, validator::Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 200))] pub full_name: String,
    #[validate(length(min = 1, max = 200))] pub line1: String,
    #[serde(default)] pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))] pub city: String,
    #[serde(default)] pub state: Option<String>,
    #[validate(length(min = 1, max = 20))] pub postal_code: String,
    #[validate(length(min = 2, max = 56))] pub country: String,
    #[serde(default)] pub phone: Option<String>,
}

impl From<&Address> for ShippingAddress {
    fn from(a: &Address) -> Self {
        Self {
            full_name: a.full_name.clone(), line1: a.line1.clone(), line2: a.line2.clone(), city: a.city.clone(),
            state: a.state.clone(), postal_code: a.postal_code.clone(), country: a.country.clone(), phone: a.phone.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>, pub per_page: Option<u32>, pub search: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn per_page(&self) -> u32 { self.per_page.unwrap_or(20).clamp(1, 100) }
    pub fn offset(&self) -> i64 { (i64::from(self.page()) - 1) * i64::from(self.per_page()) }
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")))
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> { pub data: Vec<T>, pub total: i64, pub page: u32, pub per_page: u32 }
