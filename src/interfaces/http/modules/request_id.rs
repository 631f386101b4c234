//! Request ID middleware
//!
//! Every request gets an `X-Request-Id` (reused from the client when it is
//! short and printable). Handling runs inside a `request` span carrying the
//! id, and the id is echoed on the response.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{debug, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Extract in handlers with `Extension<RequestId>`.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

fn client_id(request: &Request<Body>) -> Option<String> {
    let raw = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let ok = !raw.is_empty() && raw.len() <= 128 && raw.chars().all(|c| c.is_ascii_graphic());
    ok.then(|| raw.to_string())
}

pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = client_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    );

    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| debug!(status = response.status().as_u16(), "Request finished"));
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_header(value: &str) -> Request<Body> {
        Request::builder()
            .header(REQUEST_ID_HEADER, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn reuses_well_formed_client_ids() {
        assert_eq!(client_id(&with_header("abc-123")).as_deref(), Some("abc-123"));
    }

    #[test]
    fn rejects_blank_or_spaced_ids() {
        assert_eq!(client_id(&with_header("")), None);
        assert_eq!(client_id(&with_header("two words")), None);
        assert_eq!(client_id(&with_header(&"x".repeat(200))), None);
    }
}
