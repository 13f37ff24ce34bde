use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use cookie::{Cookie, SameSite};
use tracing::{error, warn};

use crate::error::AppError;
use crate::services::admin_auth_service;
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "admin_session";

#[derive(Clone, Debug)]
pub struct AuthenticatedAdmin {
    pub username: String,
}

/// Session token from the `admin_session` cookie, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|hv| hv.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_string())
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(String::new(), secure);
    cookie.make_removal();
    cookie
}

pub fn with_cookie(mut response: Response, cookie: &Cookie<'_>) -> Response {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => error!("Invalid Set-Cookie header: {}", e),
    }
    response
}

/// Gate for admin routes. The session is checked before any handler touches
/// the store; `/api/` callers get a 401 body, browsers go to the login page.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token(request.headers()) {
        match admin_auth_service::resolve_session(&state.pool, &token).await {
            Ok(Some(username)) => {
                request
                    .extensions_mut()
                    .insert(AuthenticatedAdmin { username });
                return next.run(request).await;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Session lookup failed: {}", e);
                return e.into_response();
            }
        }
    }

    if request.uri().path().starts_with("/api/") {
        AppError::Unauthorized.into_response()
    } else {
        Redirect::to("/admin/login").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; admin_session=abc123; lang=pt"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_or_empty_cookie_yields_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("admin_session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn cookies_are_http_only_and_removable() {
        let set = session_cookie("tok".to_string(), true).to_string();
        assert!(set.contains("admin_session=tok"));
        assert!(set.contains("HttpOnly"));
        assert!(set.contains("SameSite=Lax"));
        assert!(set.contains("Secure"));

        let removal = removal_cookie(false).to_string();
        assert!(removal.contains("Max-Age=0"));
    }
}
