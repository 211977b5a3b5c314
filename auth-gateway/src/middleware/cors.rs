//! CORS policy: an explicit allow-list from configuration, credentials disabled. This
//! gateway issues bearer tokens rather than cookies, but an allow-list still keeps the
//! authorization surface auditable.

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub fn make_middleware(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(AllowOrigin::list(origins))
        .max_age(std::time::Duration::from_secs(7200))
        .allow_credentials(false)
}
