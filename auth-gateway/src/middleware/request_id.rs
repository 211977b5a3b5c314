//! Request-id propagation: every response carries an `X-Request-Id`
//! header, generated if absent on the inbound request, and that identifier is attached
//! to every log line emitted while handling the request via [`crate::middleware::log`].

use axum::http::{HeaderName, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub fn request_id_header() -> HeaderName {
    HeaderName::from_static("x-request-id")
}

#[derive(Clone, Copy, Default)]
pub struct MakeUuidRequestId;

impl MakeRequestId for MakeUuidRequestId {
    fn make_request_id<B>(&mut self, request: &Request<B>) -> Option<RequestId> {
        let existing = request
            .headers()
            .get(request_id_header())
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty());

        let id = existing
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        id.parse().ok().map(RequestId::new)
    }
}
