//! Store settings kept as key → JSON rows in the `settings` table.

use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use std::str::FromStr;

use crate::domain::aggregates::PricingRules;
use crate::error::{ApiError, ApiResult};
use crate::models::Setting;

pub const STORE_NAME: &str = "store_name";
pub const CURRENCY: &str = "currency";
pub const TAX_RATE: &str = "tax_rate";
pub const FLAT_SHIPPING: &str = "flat_shipping";
pub const FREE_SHIPPING_THRESHOLD: &str = "free_shipping_threshold";
pub const LOW_STOCK_THRESHOLD: &str = "low_stock_threshold";
pub const CONTACT_EMAIL: &str = "contact_email";

/// Keys visible to anonymous storefront visitors.
pub const PUBLIC_KEYS: &[&str] = &[STORE_NAME, CURRENCY, TAX_RATE, FLAT_SHIPPING, FREE_SHIPPING_THRESHOLD, CONTACT_EMAIL];

pub fn defaults() -> Vec<(&'static str, Value)> {
    vec![
        (STORE_NAME, json!("Storefront")),
        (CURRENCY, json!("USD")),
        (TAX_RATE, json!("0")),
        (FLAT_SHIPPING, json!("0")),
        (FREE_SHIPPING_THRESHOLD, Value::Null),
        (LOW_STOCK_THRESHOLD, json!(5)),
        (CONTACT_EMAIL, Value::Null),
    ]
}

/// Settings resolved against defaults.
#[derive(Clone, Debug)]
pub struct StoreSettings(Map<String, Value>);

impl StoreSettings {
    pub fn from_rows(rows: Vec<Setting>) -> Self {
        let mut map: Map<String, Value> = defaults().into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        for row in rows { map.insert(row.key, row.value); }
        Self(map)
    }

    pub async fn load(db: &PgPool) -> ApiResult<Self> {
        let rows = sqlx::query_as::<_, Setting>("SELECT * FROM settings").fetch_all(db).await?;
        Ok(Self::from_rows(rows))
    }

    pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }
    pub fn as_map(&self) -> &Map<String, Value> { &self.0 }

    pub fn public(&self) -> Map<String, Value> {
        self.0.iter().filter(|(k, _)| PUBLIC_KEYS.contains(&k.as_str())).map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn currency(&self) -> String {
        self.get(CURRENCY).and_then(Value::as_str).unwrap_or("USD").to_uppercase()
    }

    pub fn low_stock_threshold(&self) -> i32 {
        self.get(LOW_STOCK_THRESHOLD).and_then(Value::as_i64).and_then(|v| i32::try_from(v).ok()).unwrap_or(5)
    }

    pub fn pricing(&self) -> PricingRules {
        PricingRules {
            tax_rate: self.get(TAX_RATE).and_then(json_decimal).unwrap_or(Decimal::ZERO),
            flat_shipping: self.get(FLAT_SHIPPING).and_then(json_decimal).unwrap_or(Decimal::ZERO),
            free_shipping_threshold: self.get(FREE_SHIPPING_THRESHOLD).and_then(json_decimal),
        }
    }
}

/// Reads a decimal stored either as a JSON number or a numeric string.
pub fn json_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Checks a single key/value pair before it is written.
pub fn validate_entry(key: &str, value: &Value) -> ApiResult<()> {
    let bad = |msg: &str| Err(ApiError::BadRequest(format!("{}: {}", key, msg)));
    if key.is_empty() || key.len() > 64 || !key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(ApiError::BadRequest(format!("invalid setting key '{}'", key)));
    }
    match key {
        STORE_NAME => match value.as_str() { Some(s) if !s.trim().is_empty() => Ok(()), _ => bad("must be a non-empty string") },
        CURRENCY => match value.as_str() { Some(s) if s.len() == 3 && s.chars().all(|c| c.is_ascii_alphabetic()) => Ok(()), _ => bad("must be a 3-letter ISO code") },
        TAX_RATE => match json_decimal(value) { Some(d) if d >= Decimal::ZERO && d < Decimal::ONE => Ok(()), _ => bad("must be a rate between 0 and 1") },
        FLAT_SHIPPING => match json_decimal(value) { Some(d) if d >= Decimal::ZERO => Ok(()), _ => bad("must be a non-negative amount") },
        FREE_SHIPPING_THRESHOLD if value.is_null() => Ok(()),
        FREE_SHIPPING_THRESHOLD => match json_decimal(value) { Some(d) if d >= Decimal::ZERO => Ok(()), _ => bad("must be a non-negative amount or null") },
        LOW_STOCK_THRESHOLD => match value.as_i64() { Some(n) if (0..=i64::from(i32::MAX)).contains(&n) => Ok(()), _ => bad("must be an integer between 0 and 2147483647") },
        _ => Ok(()),
    }
}

pub async fn seed_defaults(db: &PgPool) -> Result<(), sqlx::Error> {
    for (key, value) in defaults() {
        sqlx::query("INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, NOW()) ON CONFLICT (key) DO NOTHING")
            .bind(key).bind(value).execute(db).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(key: &str, value: Value) -> Setting { Setting { key: key.into(), value, updated_at: Utc::now() } }

    #[test]
    fn test_rows_override_defaults() {
        let s = StoreSettings::from_rows(vec![row(TAX_RATE, json!(0.08)), row(FREE_SHIPPING_THRESHOLD, json!("75.00")), row(CURRENCY, json!("chf"))]);
        let p = s.pricing();
        assert_eq!(p.tax_rate, Decimal::new(8, 2));
        assert_eq!(p.free_shipping_threshold, Some(Decimal::new(75, 0)));
        assert_eq!(p.flat_shipping, Decimal::ZERO);
        assert_eq!(s.currency(), "CHF");
        assert_eq!(s.low_stock_threshold(), 5);
    }

    #[test]
    fn test_out_of_range_threshold_falls_back() {
        let s = StoreSettings::from_rows(vec![row(LOW_STOCK_THRESHOLD, json!(4_294_967_301_i64))]);
        assert_eq!(s.low_stock_threshold(), 5);
        let s = StoreSettings::from_rows(vec![row(LOW_STOCK_THRESHOLD, json!(12))]);
        assert_eq!(s.low_stock_threshold(), 12);
    }

    #[test]
    fn test_public_subset() {
        let s = StoreSettings::from_rows(vec![row("internal_note", json!("x"))]);
        let public = s.public();
        assert!(public.contains_key(STORE_NAME));
        assert!(!public.contains_key(LOW_STOCK_THRESHOLD));
        assert!(!public.contains_key("internal_note"));
    }

    #[test]
    fn test_validate_entry() {
        assert!(validate_entry(TAX_RATE, &json!("0.2")).is_ok());
        assert!(validate_entry(TAX_RATE, &json!(1.5)).is_err());
        assert!(validate_entry(CURRENCY, &json!("EURO")).is_err());
        assert!(validate_entry(FREE_SHIPPING_THRESHOLD, &Value::Null).is_ok());
        assert!(validate_entry("Bad Key", &json!(1)).is_err());
        assert!(validate_entry(LOW_STOCK_THRESHOLD, &json!(10)).is_ok());
        assert!(validate_entry(LOW_STOCK_THRESHOLD, &json!(3_000_000_000_i64)).is_err());
        assert!(validate_entry(LOW_STOCK_THRESHOLD, &json!(-1)).is_err());
        assert!(validate_entry("banner_text", &json!({"any": "shape"})).is_ok());
    }
}
