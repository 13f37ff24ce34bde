use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{PaymentStatus, Registrant, RegistrationStats};
use crate::services::{export_service, registration_service};
use crate::web::middleware::auth::AuthenticatedAdmin;
use crate::web::render_page;
use crate::web::routes::error_page;
use crate::web::state::AppState;

pub struct RegistrantRowView {
    pub id: String,
    pub bib: i64,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub status: PaymentStatus,
    pub is_confirmed: bool,
}

impl From<Registrant> for RegistrantRowView {
    fn from(r: Registrant) -> Self {
        Self {
            created_at: r.created_at_label(),
            is_confirmed: r.is_confirmed(),
            status: r.payment_status,
            id: r.id,
            bib: r.bib,
            name: r.name,
            email: r.email.unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
pub struct DashboardTemplate {
    pub username: String,
    pub notice: String,
    pub query: String,
    pub stats: RegistrationStats,
    pub capacity_label: String,
    pub registrants: Vec<RegistrantRowView>,
    pub allow_revert: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct DashboardQuery {
    pub q: Option<String>,
    pub notice: Option<String>,
}

fn notice_message(code: &str) -> &'static str {
    match code {
        "status_updated" => "Payment status updated.",
        "transition_refused" => "A confirmed payment cannot be moved back to pending.",
        "cleared" => "All registrants were deleted.",
        _ => "",
    }
}

pub async fn dashboard_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let search = query.q.as_deref().map(str::trim).unwrap_or("").to_string();

    let registrants = match registration_service::search_registrants(&state.pool, &search).await {
        Ok(v) => v,
        Err(e) => {
            warn!("Dashboard load failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let stats = match registration_service::load_stats(&state.pool).await {
        Ok(v) => v,
        Err(e) => {
            warn!("Dashboard stats failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let capacity_label = match state.policy().max_participants {
        Some(limit) => format!("{} left", i64::from(limit).saturating_sub(stats.total).max(0)),
        None => "unlimited".to_string(),
    };

    let template = DashboardTemplate {
        username: admin.username,
        notice: notice_message(query.notice.as_deref().unwrap_or("")).to_string(),
        query: search,
        stats,
        capacity_label,
        registrants: registrants.into_iter().map(RegistrantRowView::from).collect(),
        allow_revert: state.policy().allow_payment_revert,
    };
    render_page(&template)
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub payment_status: PaymentStatus,
}

pub async fn status_form_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
    State(state): State<AppState>,
    Form(form): Form<StatusForm>,
) -> Response {
    match registration_service::update_payment_status(
        &state.pool,
        state.policy(),
        &id,
        form.payment_status,
    )
    .await
    {
        Ok(Some(_)) => {
            info!(admin = %admin.username, id = %id, to = %form.payment_status, "status changed from dashboard");
            Redirect::to("/admin?notice=status_updated").into_response()
        }
        Ok(None) => error_page(
            StatusCode::NOT_FOUND,
            "Registrant not found",
            "This registrant no longer exists.",
            "/admin",
        ),
        Err(AppError::InvalidTransition { .. }) => {
            Redirect::to("/admin?notice=transition_refused").into_response()
        }
        Err(e) => {
            warn!("Status update failed for {}: {}", id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn clear_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(state): State<AppState>,
) -> Response {
    match registration_service::clear_registrants(&state.pool).await {
        Ok(deleted) => {
            info!(admin = %admin.username, deleted, "registrants cleared from dashboard");
            Redirect::to("/admin?notice=cleared").into_response()
        }
        Err(e) => {
            warn!("Clear failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn export_csv_handler(
    Extension(_admin): Extension<AuthenticatedAdmin>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let csv = export_service::export_registrants_csv(&state.pool).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_service::export_file_name(Utc::now())
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}
