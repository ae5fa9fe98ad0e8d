//! Opaque session tokens.
//!
//! The client holds a random token (cookie or bearer header); the database
//! only ever sees its SHA-256 digest.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use super::{Principal, Role};
use crate::error::{ApiError, ApiResult};
use crate::models::Session;

pub const COOKIE_NAME: &str = "session";

pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Session token from the `session` cookie, falling back to `Authorization: Bearer`.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == COOKIE_NAME && !value.is_empty())
        .map(|(_, value)| value.to_string());
    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
    })
}

pub fn session_cookie(token: &str, ttl_hours: i64, secure: bool) -> HeaderValue {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}", COOKIE_NAME, token, ttl_hours * 3600);
    if secure { cookie.push_str("; Secure"); }
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("session=; Path=/; Max-Age=0"))
}

pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Stores a new session and returns the raw token to hand to the client.
pub async fn create(db: &PgPool, role: Role, principal_id: Uuid, ttl_hours: i64) -> ApiResult<String> {
    let token = generate_token();
    sqlx::query("INSERT INTO sessions (id, token_hash, principal, principal_id, expires_at, created_at) VALUES ($1, $2, $3, $4, $5, NOW())")
        .bind(Uuid::now_v7()).bind(hash_token(&token)).bind(role.as_ref()).bind(principal_id)
        .bind(Utc::now() + Duration::hours(ttl_hours))
        .execute(db).await?;
    Ok(token)
}

pub async fn lookup(db: &PgPool, token: &str) -> ApiResult<Option<Principal>> {
    let session = sqlx::query_as::<_, Session>("SELECT id, principal, principal_id, expires_at FROM sessions WHERE token_hash = $1 AND expires_at > NOW()")
        .bind(hash_token(token)).fetch_optional(db).await?;
    let Some(session) = session else { return Ok(None) };
    let role = Role::from_str(&session.principal).map_err(|_| ApiError::Internal(format!("unknown principal kind '{}'", session.principal)))?;
    Ok(Some(Principal { role, id: session.principal_id, session_id: session.id }))
}

pub async fn revoke(db: &PgPool, session_id: Uuid) -> ApiResult<()> {
    sqlx::query("DELETE FROM sessions WHERE id = $1").bind(session_id).execute(db).await?;
    Ok(())
}

/// Drops every session of one principal, e.g. after a password change.
pub async fn revoke_all_except(db: &PgPool, role: Role, principal_id: Uuid, keep: Uuid) -> ApiResult<()> {
    sqlx::query("DELETE FROM sessions WHERE principal = $1 AND principal_id = $2 AND id <> $3")
        .bind(role.as_ref()).bind(principal_id).bind(keep).execute(db).await?;
    Ok(())
}

pub async fn purge_expired(db: &PgPool) -> Result<u64, sqlx::Error> {
    let done = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()").execute(db).await?;
    Ok(done.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let a = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, generate_token());
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), a);
    }

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=abc123; other=1"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session=from-cookie"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_missing_or_empty_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(token_from_headers(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let c = session_cookie("tok", 2, true);
        let c = c.to_str().unwrap();
        assert!(c.starts_with("session=tok;"));
        assert!(c.contains("HttpOnly") && c.contains("Max-Age=7200") && c.ends_with("; Secure"));
        assert!(clear_cookie().to_str().unwrap().contains("Max-Age=0"));
    }
}
