//! JSON body extractor for admin requests
//!
//! An empty body is read as `{}`. Malformed JSON becomes a 400 carrying the
//! request id, instead of axum's plain-text rejection. Well-formed JSON with
//! missing or out-of-range fields is a failed call like any other and maps to 500.

use super::{errors::ApiError, middleware::RequestId};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

pub struct AdminBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AdminBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(RequestId::generate);

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(&request_id, e.to_string()))?;

        let raw: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(raw).map(AdminBody).map_err(|e| {
            let message = format!("invalid request body: {}", e);
            match e.classify() {
                Category::Data => ApiError::internal(&request_id, message),
                Category::Syntax | Category::Eof | Category::Io => {
                    ApiError::bad_request(&request_id, message)
                }
            }
        })
    }
}
