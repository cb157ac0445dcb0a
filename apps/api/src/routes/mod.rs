pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::scout::handlers as scout;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Scout API
        .route("/api/v1/scout", post(scout::handle_scout))
        .route("/api/v1/candidates", get(scout::handle_list_candidates))
        .route("/api/v1/candidates/:handle", get(scout::handle_get_candidate))
        .route(
            "/api/v1/candidates/:handle/stage",
            patch(scout::handle_update_stage),
        )
        // X OAuth
        .route("/auth/twitter/login", get(auth::handle_login))
        .route("/auth/twitter/callback", get(auth::handle_callback))
        .with_state(state)
}
