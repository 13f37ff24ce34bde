use axum::{
    middleware,
    response::Redirect,
    routing::{get, get_service, patch, post},
    Router,
};
use http::header::{HeaderName, HeaderValue, CACHE_CONTROL};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::web::middleware::auth as auth_middleware;
use crate::web::routes::{admin, admin_api, auth, ranking, registration};
use crate::web::state::AppState;
use crate::web::BUILD_ID;

pub fn build_router(state: AppState) -> Router {
    // Everything here sits behind the admin session check.
    let protected_routes = Router::new()
        .route("/admin", get(admin::dashboard_handler))
        .route("/admin/logout", post(auth::logout_handler))
        .route(
            "/admin/registrants/:id/status",
            post(admin::status_form_handler),
        )
        .route("/admin/registrants/clear", post(admin::clear_handler))
        .route("/admin/export.csv", get(admin::export_csv_handler))
        .route(
            "/api/admin/registrants",
            get(admin_api::list_registrants_handler).delete(admin_api::clear_registrants_handler),
        )
        .route(
            "/api/admin/registrants/:id",
            get(admin_api::get_registrant_handler),
        )
        .route(
            "/api/admin/registrants/:id/status",
            patch(admin_api::update_status_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_admin,
        ));

    Router::new()
        // Public routes
        .route("/", get(|| async { Redirect::to("/register") }))
        .route(
            "/register",
            get(registration::register_page).post(registration::register_handler),
        )
        .route("/ranking", get(ranking::ranking_page))
        .route("/admin/login", get(auth::login_page).post(auth::login_handler))
        .route(
            "/api/registrants",
            get(registration::list_registrants_api).post(registration::create_registrant_api),
        )
        .route("/api/stats", get(registration::stats_api))
        .route("/api/ranking", get(ranking::ranking_api))
        .route("/api/session", get(auth::session_handler))
        // Admin routes
        .merge(protected_routes)
        // Static files
        .nest_service("/assets", get_service(ServeDir::new("assets")))
        // Layers
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-build-id"),
            HeaderValue::from_static(BUILD_ID),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
