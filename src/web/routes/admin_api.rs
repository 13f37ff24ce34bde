use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::models::{PaymentStatus, Registrant};
use crate::services::registration_service;
use crate::web::middleware::auth::AuthenticatedAdmin;
use crate::web::routes::SearchQuery;
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusUpdateBody {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub deleted: u64,
}

/// Full records, emails included.
pub async fn list_registrants_handler(
    Extension(_admin): Extension<AuthenticatedAdmin>,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Registrant>>, AppError> {
    Ok(Json(
        registration_service::search_registrants(&state.pool, query.text()).await?,
    ))
}

pub async fn get_registrant_handler(
    Extension(_admin): Extension<AuthenticatedAdmin>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Registrant>, AppError> {
    registration_service::find_registrant(&state.pool, &id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn update_status_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateBody>,
) -> Result<Json<Registrant>, AppError> {
    let updated = registration_service::update_payment_status(
        &state.pool,
        state.policy(),
        &id,
        body.payment_status,
    )
    .await?
    .ok_or(AppError::NotFound)?;

    info!(admin = %admin.username, id = %id, to = %updated.payment_status, "status changed via api");
    Ok(Json(updated))
}

pub async fn clear_registrants_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, AppError> {
    let deleted = registration_service::clear_registrants(&state.pool).await?;
    info!(admin = %admin.username, deleted, "registrants cleared via api");
    Ok(Json(ClearResponse { deleted }))
}
