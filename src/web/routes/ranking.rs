use askama::Template;
use axum::{extract::State, http::StatusCode, response::Response, Json};
use tracing::warn;

use crate::error::AppError;
use crate::services::ranking_service::{self, RankingBoard};
use crate::web::render_page;
use crate::web::routes::{capacity_label, error_page};
use crate::web::state::AppState;

#[derive(Template)]
#[template(path = "ranking.html")]
pub struct RankingTemplate {
    pub board: RankingBoard,
    pub capacity_label: String,
}

pub async fn ranking_page(State(state): State<AppState>) -> Response {
    let board = match ranking_service::load_ranking(&state.pool, state.policy()).await {
        Ok(board) => board,
        Err(e) => {
            warn!("Ranking load failed: {}", e);
            return error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Ranking unavailable",
                "The ranking could not be loaded right now.",
                "/register",
            );
        }
    };

    let taken = i64::try_from(board.total).unwrap_or(i64::MAX);
    let template = RankingTemplate {
        capacity_label: capacity_label(taken, board.capacity),
        board,
    };
    render_page(&template)
}

/// Polled by the ranking page.
pub async fn ranking_api(State(state): State<AppState>) -> Result<Json<RankingBoard>, AppError> {
    Ok(Json(
        ranking_service::load_ranking(&state.pool, state.policy()).await?,
    ))
}
