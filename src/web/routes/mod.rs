pub mod admin;
pub mod admin_api;
pub mod auth;
pub mod ranking;
pub mod registration;

use askama::Template;
use axum::{http::StatusCode, response::Response};
use serde::Deserialize;

use crate::web::render_page_with_status;

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub message: String,
    pub back_href: String,
}

pub(crate) fn error_page(status: StatusCode, title: &str, message: &str, back_href: &str) -> Response {
    render_page_with_status(
        status,
        &ErrorTemplate {
            title: title.to_string(),
            message: message.to_string(),
            back_href: back_href.to_string(),
        },
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

impl SearchQuery {
    pub fn text(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or("")
    }
}

/// "12 of 100 spots taken." style label; empty when the cap is disabled.
pub(crate) fn capacity_label(taken: i64, capacity: Option<u32>) -> String {
    match capacity {
        Some(limit) => format!("{} of {} spots taken", taken, limit),
        None => String::new(),
    }
}
