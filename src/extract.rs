//! `Json`, `Query` and `Path` wrappers whose rejections render as
//! [`ApiError`] bodies (a 400 with `{"error": "..."}`) instead of axum's
//! plain-text defaults.

use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Line { qty: u32 }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let req = Request::post("/").header("content-type", "application/json").body(Body::from("{\"qty\": \"x\"}")).unwrap();
        let err = Json::<Line>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() {
        let req = Request::post("/").body(Body::from("{\"qty\": 1}")).unwrap();
        let err = Json::<Line>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_query_is_bad_request() {
        let (mut parts, _) = Request::get("/?qty=abc").body(()).unwrap().into_parts();
        let err = Query::<Line>::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let (mut parts, _) = Request::get("/?qty=3").body(()).unwrap().into_parts();
        let Query(q) = Query::<Line>::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(q.qty, 3);
    }
}
