pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;

pub use router::build_router;
pub use state::AppState;

/// Stamped by build.rs.
pub const BUILD_ID: &str = env!("RACE_BUILD_ID");

pub(crate) fn render_page<T: Template>(template: &T) -> Response {
    render_page_with_status(StatusCode::OK, template)
}

pub(crate) fn render_page_with_status<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Template render failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
