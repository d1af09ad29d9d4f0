//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every request passes through the route guard first, then the auth provider
//! layer, then the handler. The guard bounces cookie-less navigations to the
//! login page; the provider rebuilds the session from the cookie and writes
//! any change back as `Set-Cookie` on the way out.

pub mod auth;
pub mod gears;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::guard::require_session;
use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(gears::dashboard))
        .route("/login", get(auth::login_page))
        .route("/login/oauth/{provider}", get(auth::oauth_start))
        .route("/auth/callback", get(auth::auth_callback))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::session))
        .route("/gears", get(gears::list).post(gears::create))
        .route("/gears/{id}", patch(gears::update).delete(gears::delete))
        .route("/search", get(gears::search_parts))
        .route("/healthz", get(healthz))
        .nest_service("/static", static_files)
        .layer(middleware::from_fn_with_state(state.clone(), auth::provide_auth))
        .layer(middleware::from_fn(require_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
