//! CORS and request tracking

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer, ExposeHeaders};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Permissive when origins are empty or contain `*`
pub fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_headers(Any)
        .expose_headers(ExposeHeaders::list([HeaderName::from_static(REQUEST_ID_HEADER)]));

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        base.allow_origin(Any).allow_methods(Any)
    } else {
        base.allow_origin(
            allowed_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([Method::GET, Method::POST])
    }
}

/// Reuse the caller's `x-request-id` or mint one, and echo it on the response
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    /// Fallback when a handler runs without the middleware
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}
