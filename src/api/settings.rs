use axum::extract::State;
use serde_json::{Map, Value};

use crate::auth::AdminSession;
use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::settings::{validate_entry, StoreSettings};
use crate::AppState;

pub async fn public_settings(State(s): State<AppState>) -> ApiResult<Json<Map<String, Value>>> {
    Ok(Json(StoreSettings::load(&s.db).await?.public()))
}

pub async fn all_settings(State(s): State<AppState>, _admin: AdminSession) -> ApiResult<Json<Map<String, Value>>> {
    Ok(Json(StoreSettings::load(&s.db).await?.as_map().clone()))
}

/// Upserts every key in the body; keys not mentioned are left alone.
pub async fn update_settings(State(s): State<AppState>, AdminSession(admin): AdminSession, Json(body): Json<Map<String, Value>>) -> ApiResult<Json<Map<String, Value>>> {
    if body.is_empty() { return Err(ApiError::BadRequest("no settings given".into())); }
    for (key, value) in &body { validate_entry(key, value)?; }

    let mut tx = s.db.begin().await?;
    for (key, value) in &body {
        let value = match key.as_str() {
            crate::settings::CURRENCY => Value::String(value.as_str().unwrap_or_default().to_uppercase()),
            _ => value.clone(),
        };
        sqlx::query("INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, NOW()) ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()")
            .bind(key).bind(value).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(admin_id = %admin.id, keys = ?body.keys().collect::<Vec<_>>(), "settings updated");
    Ok(Json(StoreSettings::load(&s.db).await?.as_map().clone()))
}
