use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{password, AdminSession};
use crate::domain::value_objects::Email;
use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::models::Admin;
use crate::AppState;

pub async fn list_admins(State(s): State<AppState>, _admin: AdminSession) -> ApiResult<Json<Vec<Admin>>> {
    let rows = sqlx::query_as::<_, Admin>("SELECT * FROM admins ORDER BY created_at").fetch_all(&s.db).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(email)] pub email: String,
    #[validate(length(min = 8, max = 128))] pub password: String,
    #[validate(length(min = 1, max = 100))] pub name: String,
}

pub async fn create_admin(State(s): State<AppState>, AdminSession(by): AdminSession, Json(r): Json<CreateAdminRequest>) -> ApiResult<(StatusCode, Json<Admin>)> {
    r.validate()?;
    let email = Email::parse(&r.email).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let hash = password::hash_password(&r.password)?;
    let admin = sqlx::query_as::<_, Admin>("INSERT INTO admins (id, email, password_hash, name, created_at) VALUES ($1, $2, $3, $4, NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(email.as_str()).bind(&hash).bind(r.name.trim())
        .fetch_one(&s.db).await?;
    tracing::info!(admin_id = %admin.id, created_by = %by.id, "admin created");
    Ok((StatusCode::CREATED, Json(admin)))
}
