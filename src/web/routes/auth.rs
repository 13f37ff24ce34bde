use askama::Template;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AppError;
use crate::services::admin_auth_service;
use crate::web::middleware::auth::{removal_cookie, session_cookie, session_token, with_cookie};
use crate::web::routes::error_page;
use crate::web::state::AppState;
use crate::web::{render_page, render_page_with_status};

#[derive(Template)]
#[template(path = "admin_login.html")]
pub struct LoginTemplate {
    pub username: String,
    pub error: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

pub async fn login_page() -> Response {
    render_page(&LoginTemplate {
        username: String::new(),
        error: String::new(),
    })
}

pub async fn login_handler(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let session = admin_auth_service::login(
        &state.pool,
        &form.username,
        &form.password,
        state.config.session_ttl,
    )
    .await;

    match session {
        Ok(Some(session)) => {
            let cookie = session_cookie(session.token, state.config.cookie_secure);
            with_cookie(Redirect::to("/admin").into_response(), &cookie)
        }
        Ok(None) => render_page_with_status(
            StatusCode::UNAUTHORIZED,
            &LoginTemplate {
                username: form.username,
                error: "Invalid username or password.".to_string(),
            },
        ),
        Err(e) => {
            warn!("Admin login failed: {}", e);
            error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login unavailable",
                "Logging in is not possible right now. Please try again.",
                "/admin/login",
            )
        }
    }
}

pub async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = admin_auth_service::logout(&state.pool, &token).await {
            warn!("Session delete failed on logout: {}", e);
        }
    }

    let cookie = removal_cookie(state.config.cookie_secure);
    with_cookie(Redirect::to("/admin/login").into_response(), &cookie)
}

pub async fn session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionStatus>, AppError> {
    let username = match session_token(&headers) {
        Some(token) => admin_auth_service::resolve_session(&state.pool, &token).await?,
        None => None,
    };

    Ok(Json(SessionStatus {
        authenticated: username.is_some(),
        username,
    }))
}
