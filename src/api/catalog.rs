//! Public catalog: product browsing, categories and cart quotes.

use axum::extract::State;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Cart, CartItem, StockLevel, Totals};
use crate::domain::value_objects::Money;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::models::{ListParams, PaginatedResponse, Product};
use crate::settings::StoreSettings;
use crate::AppState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort { #[default] Newest, PriceAsc, PriceDesc, Name }

impl ProductSort {
    fn order_by(self) -> &'static str {
        match self {
            ProductSort::Newest => " ORDER BY created_at DESC, id",
            ProductSort::PriceAsc => " ORDER BY price ASC, id",
            ProductSort::PriceDesc => " ORDER BY price DESC, id",
            ProductSort::Name => " ORDER BY name ASC, id",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilters {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<ProductSort>,
    /// Admin listing only; the storefront always shows active products.
    pub active: Option<bool>,
}

impl ProductFilters {
    pub fn list_params(&self) -> ListParams {
        ListParams { page: self.page, per_page: self.per_page, search: self.search.clone() }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>, storefront: bool) {
        qb.push(" WHERE TRUE");
        if storefront {
            qb.push(" AND active");
        } else if let Some(active) = self.active {
            qb.push(" AND active = ").push_bind(active);
        }
        if let Some(category) = self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            qb.push(" AND category = ").push_bind(category.to_string());
        }
        if let Some(pattern) = self.list_params().search_pattern() {
            qb.push(" AND (name ILIKE ").push_bind(pattern.clone()).push(" OR description ILIKE ").push_bind(pattern).push(")");
        }
        if let Some(featured) = self.featured {
            qb.push(" AND featured = ").push_bind(featured);
        }
        if let Some(min) = self.min_price {
            qb.push(" AND price >= ").push_bind(min);
        }
        if let Some(max) = self.max_price {
            qb.push(" AND price <= ").push_bind(max);
        }
    }
}

/// Shared by the storefront and admin product listings.
pub async fn query_products(s: &AppState, f: &ProductFilters, storefront: bool) -> ApiResult<PaginatedResponse<Product>> {
    let params = f.list_params();
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
    f.push_where(&mut count, storefront);
    let (total,): (i64,) = count.build_query_as().fetch_one(&s.db).await?;

    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM products");
    f.push_where(&mut select, storefront);
    select.push(f.sort.unwrap_or_default().order_by());
    select.push(" LIMIT ").push_bind(params.per_page() as i64).push(" OFFSET ").push_bind(params.offset());
    let data = select.build_query_as::<Product>().fetch_all(&s.db).await?;
    Ok(PaginatedResponse { data, total, page: params.page(), per_page: params.per_page() })
}

pub async fn list_products(State(s): State<AppState>, Query(f): Query<ProductFilters>) -> ApiResult<Json<PaginatedResponse<Product>>> {
    Ok(Json(query_products(&s, &f, true).await?))
}

/// `key` is either the product id or its slug.
pub async fn get_product(State(s): State<AppState>, Path(key): Path<String>) -> ApiResult<Json<Product>> {
    let query = match Uuid::parse_str(&key) {
        Ok(id) => sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND active").bind(id),
        Err(_) => sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1 AND active").bind(key),
    };
    query.fetch_optional(&s.db).await?.map(Json).ok_or_else(|| ApiError::not_found("Product"))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CategorySummary { pub category: String, pub product_count: i64 }

pub async fn list_categories(State(s): State<AppState>) -> ApiResult<Json<Vec<CategorySummary>>> {
    let rows = sqlx::query_as::<_, CategorySummary>("SELECT category, COUNT(*) AS product_count FROM products WHERE active GROUP BY category ORDER BY category")
        .fetch_all(&s.db).await?;
    Ok(Json(rows))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 100))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(length(min = 1, max = 50))]
    pub items: Vec<LineRequest>,
}

#[derive(Debug, Serialize)]
pub struct QuoteLine {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    pub available_stock: i32,
    pub in_stock: bool,
}

#[derive(Debug, Serialize)]
pub struct Quote {
    pub items: Vec<QuoteLine>,
    /// Requested products that no longer exist or are hidden
    pub unavailable: Vec<Uuid>,
    pub totals: Totals,
}

/// Validates every requested line; quantities must be 1..=100.
pub fn validate_lines(lines: &[LineRequest]) -> ApiResult<()> {
    for line in lines { line.validate()?; }
    Ok(())
}

/// Prices the requested lines against catalog rows, merging repeated products.
pub fn build_quote(lines: &[LineRequest], products: &HashMap<Uuid, Product>, settings: &StoreSettings) -> ApiResult<Quote> {
    let currency = settings.currency();
    let mut cart = Cart::new(&currency);
    let mut unavailable = vec![];
    for line in lines {
        match products.get(&line.product_id).filter(|p| p.active) {
            Some(p) => cart.add_item(CartItem { product_id: p.id, name: p.name.clone(), quantity: line.quantity, unit_price: Money::new(p.price, &currency) })?,
            None if !unavailable.contains(&line.product_id) => unavailable.push(line.product_id),
            None => {}
        }
    }
    let items = cart.items().iter().filter_map(|item| {
        let p = products.get(&item.product_id)?;
        let stock = StockLevel::new(p.id, &p.name, p.active, p.stock);
        Some(QuoteLine {
            product_id: p.id,
            name: p.name.clone(),
            slug: p.slug.clone(),
            image: p.images.first().cloned(),
            unit_price: p.price,
            quantity: item.quantity,
            line_total: item.line_total().amount(),
            available_stock: p.stock,
            in_stock: stock.reserve(item.quantity).is_ok(),
        })
    }).collect();
    Ok(Quote { items, unavailable, totals: cart.totals(&settings.pricing()) })
}

pub async fn quote_cart(State(s): State<AppState>, Json(r): Json<QuoteRequest>) -> ApiResult<Json<Quote>> {
    r.validate()?;
    validate_lines(&r.items)?;
    let ids: Vec<Uuid> = r.items.iter().map(|i| i.product_id).collect();
    let products: HashMap<Uuid, Product> = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
        .bind(&ids).fetch_all(&s.db).await?
        .into_iter().map(|p| (p.id, p)).collect();
    let settings = StoreSettings::load(&s.db).await?;
    Ok(Json(build_quote(&r.items, &products, &settings)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Setting;
    use chrono::Utc;
    use serde_json::json;

    fn product(name: &str, cents: i64, stock: i32, active: bool) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(), name: name.into(), slug: name.to_lowercase(), description: String::new(), category: "mugs".into(),
            price: Decimal::new(cents, 2), compare_at_price: None, stock, images: vec!["https://img/1.jpg".into()],
            featured: false, active, created_at: now, updated_at: now,
        }
    }

    fn settings() -> StoreSettings {
        StoreSettings::from_rows(vec![
            Setting { key: "tax_rate".into(), value: json!("0.10"), updated_at: Utc::now() },
            Setting { key: "flat_shipping".into(), value: json!(5), updated_at: Utc::now() },
        ])
    }

    #[test]
    fn test_quote_merges_and_flags_stock() {
        let mug = product("Mug", 1200, 3, true);
        let lamp = product("Lamp", 4500, 0, true);
        let gone = Uuid::new_v4();
        let products: HashMap<Uuid, Product> = [(mug.id, mug.clone()), (lamp.id, lamp.clone())].into_iter().collect();
        let lines = vec![
            LineRequest { product_id: mug.id, quantity: 2 },
            LineRequest { product_id: lamp.id, quantity: 1 },
            LineRequest { product_id: mug.id, quantity: 2 },
            LineRequest { product_id: gone, quantity: 1 },
        ];
        let quote = build_quote(&lines, &products, &settings()).unwrap();
        assert_eq!(quote.items.len(), 2);
        assert_eq!(quote.items[0].quantity, 4);
        assert!(!quote.items[0].in_stock);
        assert!(!quote.items[1].in_stock);
        assert_eq!(quote.unavailable, vec![gone]);
        assert_eq!(quote.totals.subtotal, Decimal::new(9300, 2));
        assert_eq!(quote.totals.tax, Decimal::new(930, 2));
        assert_eq!(quote.totals.shipping, Decimal::new(5, 0));
        assert_eq!(quote.totals.total, Decimal::new(10730, 2));
    }

    #[test]
    fn test_inactive_products_are_unavailable() {
        let hidden = product("Hidden", 100, 10, false);
        let products: HashMap<Uuid, Product> = [(hidden.id, hidden.clone())].into_iter().collect();
        let quote = build_quote(&[LineRequest { product_id: hidden.id, quantity: 1 }], &products, &settings()).unwrap();
        assert!(quote.items.is_empty());
        assert_eq!(quote.unavailable, vec![hidden.id]);
        assert_eq!(quote.totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_line_quantity_bounds() {
        let id = Uuid::new_v4();
        assert!(validate_lines(&[LineRequest { product_id: id, quantity: 0 }]).is_err());
        assert!(validate_lines(&[LineRequest { product_id: id, quantity: 101 }]).is_err());
        assert!(validate_lines(&[LineRequest { product_id: id, quantity: 100 }]).is_ok());
    }

    #[test]
    fn test_quote_request_item_count() {
        let line = LineRequest { product_id: Uuid::new_v4(), quantity: 1 };
        assert!(QuoteRequest { items: vec![] }.validate().is_err());
        assert!(QuoteRequest { items: vec![line.clone(); 50] }.validate().is_ok());
        let errors = QuoteRequest { items: vec![line; 51] }.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn test_sort_parsing() {
        let f: ProductFilters = serde_json::from_value(json!({"sort": "price_desc", "featured": true})).unwrap();
        assert_eq!(f.sort, Some(ProductSort::PriceDesc));
        assert_eq!(ProductSort::default().order_by(), " ORDER BY created_at DESC, id");
    }
}
