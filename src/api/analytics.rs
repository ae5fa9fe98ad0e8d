//! Back-office dashboard figures over a trailing window of days.

use axum::extract::State;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Query};
use crate::settings::StoreSettings;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery { pub days: Option<i64> }

impl AnalyticsQuery {
    pub fn days(&self) -> ApiResult<i64> {
        match self.days.unwrap_or(30) {
            d @ 1..=365 => Ok(d),
            _ => Err(ApiError::BadRequest("days must be between 1 and 365".into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRevenue { pub date: NaiveDate, pub revenue: Decimal, pub orders: i64 }

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StatusCount { pub status: String, pub count: i64 }

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProduct { pub product_id: Option<Uuid>, pub name: String, pub units: i64, pub revenue: Decimal }

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LowStockProduct { pub id: Uuid, pub name: String, pub slug: String, pub stock: i32 }

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub days: i64,
    pub since: DateTime<Utc>,
    pub revenue: Decimal,
    pub order_count: i64,
    pub average_order_value: Decimal,
    pub new_customers: i64,
    pub total_customers: i64,
    pub total_products: i64,
    pub orders_by_status: Vec<StatusCount>,
    pub daily_revenue: Vec<DailyRevenue>,
    pub top_products: Vec<TopProduct>,
    pub low_stock: Vec<LowStockProduct>,
    pub generated_at: DateTime<Utc>,
}

/// Zero when there are no orders; otherwise rounded to cents.
pub fn average_order_value(revenue: Decimal, orders: i64) -> Decimal {
    if orders <= 0 { return Decimal::ZERO; }
    (revenue / Decimal::from(orders)).round_dp(2)
}

/// One point per day from `start` through `end`, days without sales at zero.
pub fn fill_daily_series(start: NaiveDate, end: NaiveDate, rows: Vec<(NaiveDate, Decimal, i64)>) -> Vec<DailyRevenue> {
    let by_day: HashMap<NaiveDate, (Decimal, i64)> = rows.into_iter().map(|(d, r, n)| (d, (r, n))).collect();
    start.iter_days().take_while(|d| *d <= end)
        .map(|date| {
            let (revenue, orders) = by_day.get(&date).copied().unwrap_or((Decimal::ZERO, 0));
            DailyRevenue { date, revenue, orders }
        })
        .collect()
}

const PAID: &str = "payment_status = 'paid' AND status <> 'cancelled'";

pub async fn dashboard(State(s): State<AppState>, _admin: AdminSession, Query(q): Query<AnalyticsQuery>) -> ApiResult<Json<Dashboard>> {
    let days = q.days()?;
    let now = Utc::now();
    let first_day = (now - Duration::days(days - 1)).date_naive();
    let since = first_day.and_time(chrono::NaiveTime::MIN).and_utc();

    let (revenue, order_count): (Decimal, i64) = sqlx::query_as(&format!(
        "SELECT COALESCE(SUM(total), 0), COUNT(*) FROM orders WHERE {} AND created_at >= $1", PAID
    )).bind(since).fetch_one(&s.db).await?;
    let (new_customers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers WHERE created_at >= $1").bind(since).fetch_one(&s.db).await?;
    let (total_customers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers").fetch_one(&s.db).await?;
    let (total_products,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(&s.db).await?;

    let orders_by_status = sqlx::query_as::<_, StatusCount>("SELECT status, COUNT(*) AS count FROM orders WHERE created_at >= $1 GROUP BY status ORDER BY status")
        .bind(since).fetch_all(&s.db).await?;

    let daily: Vec<(NaiveDate, Decimal, i64)> = sqlx::query_as(&format!(
        "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, SUM(total), COUNT(*) FROM orders WHERE {} AND created_at >= $1 GROUP BY day", PAID
    )).bind(since).fetch_all(&s.db).await?;

    let top_products = sqlx::query_as::<_, TopProduct>(
        "SELECT oi.product_id, MAX(oi.product_name) AS name, SUM(oi.quantity)::bigint AS units, SUM(oi.line_total) AS revenue \
         FROM order_items oi JOIN orders o ON o.id = oi.order_id \
         WHERE o.status <> 'cancelled' AND o.created_at >= $1 \
         GROUP BY oi.product_id ORDER BY units DESC, revenue DESC LIMIT 5",
    ).bind(since).fetch_all(&s.db).await?;

    let threshold = StoreSettings::load(&s.db).await?.low_stock_threshold();
    let low_stock = sqlx::query_as::<_, LowStockProduct>("SELECT id, name, slug, stock FROM products WHERE active AND stock <= $1 ORDER BY stock, name")
        .bind(threshold).fetch_all(&s.db).await?;

    Ok(Json(Dashboard {
        days,
        since,
        revenue,
        order_count,
        average_order_value: average_order_value(revenue, order_count),
        new_customers,
        total_customers,
        total_products,
        orders_by_status,
        daily_revenue: fill_daily_series(first_day, now.date_naive(), daily),
        top_products,
        low_stock,
        generated_at: now,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 2, d).unwrap() }

    #[test]
    fn test_days_bounds() {
        assert_eq!(AnalyticsQuery { days: None }.days().unwrap(), 30);
        assert_eq!(AnalyticsQuery { days: Some(365) }.days().unwrap(), 365);
        assert!(AnalyticsQuery { days: Some(0) }.days().is_err());
        assert!(AnalyticsQuery { days: Some(366) }.days().is_err());
    }

    #[test]
    fn test_average_order_value() {
        assert_eq!(average_order_value(Decimal::ZERO, 0), Decimal::ZERO);
        assert_eq!(average_order_value(Decimal::new(10000, 2), 3), Decimal::new(3333, 2));
    }

    #[test]
    fn test_series_is_zero_filled() {
        let series = fill_daily_series(day(27), day(29) + Duration::days(1), vec![(day(28), Decimal::new(4250, 2), 2)]);
        assert_eq!(series.len(), 4);
        assert_eq!(series[0], DailyRevenue { date: day(27), revenue: Decimal::ZERO, orders: 0 });
        assert_eq!(series[1].revenue, Decimal::new(4250, 2));
        assert_eq!(series[3].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_single_day_window() {
        let series = fill_daily_series(day(5), day(5), vec![]);
        assert_eq!(series, vec![DailyRevenue { date: day(5), revenue: Decimal::ZERO, orders: 0 }]);
    }
}
