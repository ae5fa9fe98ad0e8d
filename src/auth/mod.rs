//! Authentication and authorization
//!
//! Admins and customers live in separate tables and log in through the same
//! credentials flow. A session row records which kind of principal it
//! belongs to; the `/api/admin` and `/api/account` namespaces are each gated
//! to one kind by [`require_admin`] and [`require_customer`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;
use validator::Validate;

pub mod password;
pub mod session;

use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Email;
use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::models::{Admin, Customer};
use crate::AppState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role { Admin, Customer }

/// Whoever owns the session attached to the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal { pub role: Role, pub id: Uuid, pub session_id: Uuid }

#[axum::async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(p) = parts.extensions.get::<Principal>() { return Ok(*p); }
        let token = session::token_from_headers(&parts.headers).ok_or_else(ApiError::unauthorized)?;
        let principal = session::lookup(&state.db, &token).await?
            .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".into()))?;
        parts.extensions.insert(principal);
        Ok(principal)
    }
}

/// A signed-in admin.
#[derive(Clone, Copy, Debug)]
pub struct AdminSession(pub Principal);

/// A signed-in customer.
#[derive(Clone, Copy, Debug)]
pub struct CustomerSession(pub Principal);

impl CustomerSession {
    pub fn customer_id(&self) -> Uuid { self.0.id }
}

/// A signed-in customer if there is one; guests and admins read as `None`.
#[derive(Clone, Copy, Debug)]
pub struct MaybeCustomer(pub Option<Principal>);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let p = Principal::from_request_parts(parts, state).await?;
        match p.role {
            Role::Admin => Ok(Self(p)),
            Role::Customer => Err(ApiError::Forbidden("Admin access required".into())),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CustomerSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let p = Principal::from_request_parts(parts, state).await?;
        match p.role {
            Role::Customer => Ok(Self(p)),
            Role::Admin => Err(ApiError::Forbidden("Customer account required".into())),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeCustomer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Principal::from_request_parts(parts, state).await {
            Ok(p) if p.role == Role::Customer => Ok(Self(Some(p))),
            Ok(_) | Err(ApiError::Unauthorized(_)) => Ok(Self(None)),
            Err(e) => Err(e),
        }
    }
}

async fn gate<T>(state: AppState, request: Request, next: Next) -> Result<Response, ApiError>
where
    T: FromRequestParts<AppState, Rejection = ApiError>,
{
    let (mut parts, body) = request.into_parts();
    T::from_request_parts(&mut parts, &state).await?;
    Ok(next.run(Request::from_parts(parts, body)).await)
}

pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    gate::<AdminSession>(state, request, next).await
}

pub async fn require_customer(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    gate::<CustomerSession>(state, request, next).await
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)] pub email: String,
    #[validate(length(min = 8, max = 128))] pub password: String,
    #[validate(length(min = 1, max = 100))] pub first_name: String,
    #[validate(length(min = 1, max = 100))] pub last_name: String,
    #[validate(length(max = 40))] pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))] pub email: String,
    #[validate(length(min = 1))] pub password: String,
    #[serde(default)] pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum SessionUser {
    Admin { user: Admin },
    Customer { user: Customer },
}

pub async fn register(State(s): State<AppState>, Json(r): Json<RegisterRequest>) -> ApiResult<Response> {
    r.validate()?;
    let email = Email::parse(&r.email).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let hash = password::hash_password(&r.password)?;
    let customer = sqlx::query_as::<_, Customer>("INSERT INTO customers (id, email, password_hash, first_name, last_name, phone, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(email.as_str()).bind(&hash).bind(r.first_name.trim()).bind(r.last_name.trim()).bind(&r.phone)
        .fetch_one(&s.db).await?;
    tracing::info!(customer_id = %customer.id, "customer registered");
    s.events.publish(DomainEvent::CustomerRegistered { customer_id: customer.id, email: customer.email.clone() }).await;
    let token = session::create(&s.db, Role::Customer, customer.id, s.config.session_ttl_hours).await?;
    let cookie = session::session_cookie(&token, s.config.session_ttl_hours, s.config.cookie_secure);
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(SessionUser::Customer { user: customer })).into_response())
}

pub async fn login(State(s): State<AppState>, Json(r): Json<LoginRequest>) -> ApiResult<Response> {
    r.validate()?;
    let invalid = || ApiError::Unauthorized("Invalid email or password".into());
    let email = Email::parse(&r.email).map_err(|_| invalid())?;
    let role = r.role.unwrap_or(Role::Customer);
    let found = match role {
        Role::Admin => sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE email = $1").bind(email.as_str()).fetch_optional(&s.db).await?
            .map(|admin| (admin.id, admin.password_hash.clone(), SessionUser::Admin { user: admin })),
        Role::Customer => sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE email = $1").bind(email.as_str()).fetch_optional(&s.db).await?
            .map(|customer| (customer.id, customer.password_hash.clone(), SessionUser::Customer { user: customer })),
    };
    let Some((id, hash, user)) = found else {
        password::verify_dummy(&r.password);
        tracing::warn!(%role, "failed login attempt");
        return Err(invalid());
    };
    if !password::verify_password(&hash, &r.password)? {
        tracing::warn!(%role, "failed login attempt");
        return Err(invalid());
    }
    if let Err(e) = session::purge_expired(&s.db).await { tracing::warn!(error = %e, "failed to purge expired sessions"); }
    let token = session::create(&s.db, role, id, s.config.session_ttl_hours).await?;
    tracing::info!(%role, principal_id = %id, "signed in");
    let cookie = session::session_cookie(&token, s.config.session_ttl_hours, s.config.cookie_secure);
    Ok(([(header::SET_COOKIE, cookie)], Json(user)).into_response())
}

pub async fn logout(State(s): State<AppState>, principal: Principal) -> ApiResult<Response> {
    session::revoke(&s.db, principal.session_id).await?;
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, session::clear_cookie())]).into_response())
}

pub async fn current_session(State(s): State<AppState>, principal: Principal) -> ApiResult<Json<SessionUser>> {
    let user = match principal.role {
        Role::Admin => SessionUser::Admin {
            user: sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = $1").bind(principal.id).fetch_optional(&s.db).await?.ok_or_else(ApiError::unauthorized)?,
        },
        Role::Customer => SessionUser::Customer {
            user: sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1").bind(principal.id).fetch_optional(&s.db).await?.ok_or_else(ApiError::unauthorized)?,
        },
    };
    Ok(Json(user))
}

/// Creates the first admin from configured credentials when none exists.
pub async fn bootstrap_admin(db: &sqlx::PgPool, email: Option<&str>, password: Option<&str>) -> anyhow::Result<()> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admins").fetch_one(db).await?;
    if count > 0 { return Ok(()); }
    let (Some(email), Some(pw)) = (email, password) else {
        tracing::warn!("no admin account exists; set STOREFRONT_BOOTSTRAP_ADMIN_EMAIL and STOREFRONT_BOOTSTRAP_ADMIN_PASSWORD to create one");
        return Ok(());
    };
    let email = Email::parse(email).map_err(|e| anyhow::anyhow!("bootstrap admin: {}", e))?;
    let hash = password::hash_password(pw).map_err(|e| anyhow::anyhow!("bootstrap admin: {}", e))?;
    sqlx::query("INSERT INTO admins (id, email, password_hash, name, created_at) VALUES ($1, $2, $3, 'Administrator', NOW())")
        .bind(Uuid::now_v7()).bind(email.as_str()).bind(&hash).execute(db).await?;
    tracing::info!(email = %email, "bootstrap admin created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_strings() {
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
        assert_eq!(Role::Customer.as_ref(), "customer");
        let r: LoginRequest = serde_json::from_str(r#"{"email":"a@b.co","password":"x","role":"admin"}"#).unwrap();
        assert_eq!(r.role, Some(Role::Admin));
    }

    #[test]
    fn test_register_validation() {
        let r = RegisterRequest { email: "not-an-email".into(), password: "short".into(), first_name: "".into(), last_name: "Doe".into(), phone: None };
        let errors = r.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("first_name"));
        assert!(!fields.contains_key("last_name"));
    }

    fn state() -> AppState {
        let config = crate::AppConfig::for_tests();
        let pool = sqlx::postgres::PgPoolOptions::new().connect_lazy(&config.database_url).unwrap();
        AppState::new(pool, config, crate::events::EventPublisher::disabled())
    }

    fn parts_with(principal: Option<Principal>) -> Parts {
        let (mut parts, _) = axum::http::Request::get("/").body(()).unwrap().into_parts();
        if let Some(p) = principal { parts.extensions.insert(p); }
        parts
    }

    #[tokio::test]
    async fn test_gated_principal_is_reused_without_lookup() {
        let state = state();
        let admin = Principal { role: Role::Admin, id: Uuid::new_v4(), session_id: Uuid::new_v4() };
        let AdminSession(p) = AdminSession::from_request_parts(&mut parts_with(Some(admin)), &state).await.unwrap();
        assert_eq!(p, admin);

        let customer = Principal { role: Role::Customer, ..admin };
        let err = AdminSession::from_request_parts(&mut parts_with(Some(customer)), &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        let MaybeCustomer(found) = MaybeCustomer::from_request_parts(&mut parts_with(Some(customer)), &state).await.unwrap();
        assert_eq!(found, Some(customer));
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let state = state();
        let err = Principal::from_request_parts(&mut parts_with(None), &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        let MaybeCustomer(found) = MaybeCustomer::from_request_parts(&mut parts_with(None), &state).await.unwrap();
        assert!(found.is_none());
    }
}
