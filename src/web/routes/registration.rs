use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    Form, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AppError;
use crate::models::{PaymentStatus, Registrant, RegistrationStats};
use crate::services::registration_service::{self, NewRegistrantInput};
use crate::web::routes::{capacity_label, error_page, SearchQuery};
use crate::web::state::AppState;
use crate::web::{render_page, render_page_with_status};

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub name: String,
    pub email: String,
    pub error: String,
    pub capacity_label: String,
}

#[derive(Template)]
#[template(path = "registered.html")]
pub struct RegisteredTemplate {
    pub name: String,
    pub bib: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Registrant as shown to the public: no id, no email.
#[derive(Debug, Serialize)]
pub struct PublicRegistrant {
    pub bib: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
}

impl From<Registrant> for PublicRegistrant {
    fn from(r: Registrant) -> Self {
        Self {
            bib: r.bib,
            name: r.name,
            created_at: r.created_at,
            payment_status: r.payment_status,
        }
    }
}

async fn intake_capacity_label(state: &AppState) -> String {
    let Some(limit) = state.policy().max_participants else {
        return "Registration is open.".to_string();
    };
    match registration_service::load_stats(&state.pool).await {
        Ok(stats) => format!("{}.", capacity_label(stats.total, Some(limit))),
        Err(e) => {
            warn!("Stats load failed for register page: {}", e);
            String::new()
        }
    }
}

pub async fn register_page(State(state): State<AppState>) -> Response {
    let template = RegisterTemplate {
        name: String::new(),
        email: String::new(),
        error: String::new(),
        capacity_label: intake_capacity_label(&state).await,
    };
    render_page(&template)
}

pub async fn register_handler(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let input = NewRegistrantInput {
        name: form.name.clone(),
        email: Some(form.email.clone()),
    };

    match registration_service::register(
        &state.pool,
        state.allocator.as_ref(),
        state.policy(),
        &input,
    )
    .await
    {
        Ok(registrant) => render_page(&RegisteredTemplate {
            name: registrant.name,
            bib: registrant.bib,
        }),
        Err(e @ AppError::Validation { .. }) => {
            let template = RegisterTemplate {
                name: form.name,
                email: form.email,
                error: e.to_string(),
                capacity_label: intake_capacity_label(&state).await,
            };
            render_page_with_status(StatusCode::UNPROCESSABLE_ENTITY, &template)
        }
        Err(e @ (AppError::CapacityReached { .. } | AppError::AllocationExhausted { .. })) => {
            error_page(
                StatusCode::CONFLICT,
                "Registration closed",
                &format!("We could not register you: {}.", e),
                "/ranking",
            )
        }
        Err(e) => {
            warn!("Registration failed: {}", e);
            error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                "Your registration was not saved. Please try again.",
                "/register",
            )
        }
    }
}

pub async fn create_registrant_api(
    State(state): State<AppState>,
    Json(input): Json<NewRegistrantInput>,
) -> Result<(StatusCode, Json<Registrant>), AppError> {
    let registrant = registration_service::register(
        &state.pool,
        state.allocator.as_ref(),
        state.policy(),
        &input,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(registrant)))
}

pub async fn list_registrants_api(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PublicRegistrant>>, AppError> {
    let registrants = registration_service::search_registrants(&state.pool, query.text()).await?;
    Ok(Json(registrants.into_iter().map(PublicRegistrant::from).collect()))
}

pub async fn stats_api(State(state): State<AppState>) -> Result<Json<RegistrationStats>, AppError> {
    Ok(Json(registration_service::load_stats(&state.pool).await?))
}
