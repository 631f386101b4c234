//! Session middleware for Axum
//!
//! The visitor's session id travels in a cookie. [`session_middleware`]
//! resolves it against the registry and hands the [`AuthSession`] to
//! handlers through request extensions; [`require_auth`] rejects anonymous
//! visitors on protected routes.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::SharedSessionRegistry;
use crate::config::SecurityConfig;
use crate::domain::AuthSession;
use crate::interfaces::http::common::ApiResponse;

/// Session cookie settings plus the registry it points into
#[derive(Clone)]
pub struct SessionLayerState {
    pub registry: SharedSessionRegistry,
    pub cookie_name: String,
    pub max_age_secs: i64,
    pub secure: bool,
}

impl SessionLayerState {
    pub fn new(registry: SharedSessionRegistry, security: &SecurityConfig) -> Self {
        Self {
            registry,
            cookie_name: security.session_cookie.clone(),
            max_age_secs: security.session_ttl_minutes * 60,
            secure: security.secure_cookie,
        }
    }

    /// `Set-Cookie` value binding the browser to `session_id`.
    pub fn issue_cookie(&self, session_id: &str) -> Option<HeaderValue> {
        self.cookie(session_id, self.max_age_secs)
    }

    /// `Set-Cookie` value that makes the browser drop the session.
    pub fn clear_cookie(&self) -> Option<HeaderValue> {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> Option<HeaderValue> {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).ok()
    }
}

/// Value of cookie `name` from the `Cookie` request header(s).
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

/// Resolve the cookie to a session and attach it to the request.
pub async fn session_middleware(
    State(state): State<SessionLayerState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let session = state
        .registry
        .resolve(read_cookie(request.headers(), &state.cookie_name));
    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Reject anonymous visitors. Must run after [`session_middleware`].
pub async fn require_auth(request: Request<Body>, next: Next) -> Response {
    let authenticated = request
        .extensions()
        .get::<AuthSession>()
        .is_some_and(|s| s.is_authenticated());
    if !authenticated {
        let body = Json(ApiResponse::<()>::error("Login required"));
        return (StatusCode::UNAUTHORIZED, body).into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_id=abc-123; lang=en"),
        );
        assert_eq!(read_cookie(&headers, "session_id"), Some("abc-123"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session_id="));
        assert_eq!(read_cookie(&headers, "session_id"), None);
    }

    #[test]
    fn cookie_attributes() {
        let mut security = SecurityConfig::default();
        security.secure_cookie = true;
        let state = SessionLayerState::new(crate::application::SessionRegistry::shared(5), &security);

        let issued = state.issue_cookie("abc").unwrap();
        let issued = issued.to_str().unwrap();
        assert!(issued.starts_with("session_id=abc;"));
        assert!(issued.contains("HttpOnly"));
        assert!(issued.contains("SameSite=Lax"));
        assert!(issued.contains("Max-Age=300"));
        assert!(issued.ends_with("; Secure"));

        let cleared = state.clear_cookie().unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }
}
