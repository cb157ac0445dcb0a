use anyhow::anyhow;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::oauth_state::authorization_url;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub auth_url: String,
    pub state: String,
}

/// GET /auth/twitter/login
pub async fn handle_login(State(state): State<AppState>) -> Result<Json<LoginResponse>, AppError> {
    let client_id = state
        .config
        .twitter_client_id
        .as_deref()
        .ok_or_else(|| anyhow!("TWITTER_CLIENT_ID is not set"))?;

    let pending = state.oauth_states.begin();
    let url = authorization_url(client_id, &state.config.twitter_oauth_callback_url, &pending)?;
    info!("Started OAuth authorization");

    Ok(Json(LoginResponse {
        auth_url: url.to_string(),
        state: pending.state,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET /auth/twitter/callback
pub async fn handle_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackQuery>,
) -> Result<(), AppError> {
    let verifier = params
        .state
        .as_deref()
        .and_then(|s| state.oauth_states.take(s));
    if verifier.is_none() {
        warn!("OAuth callback with unknown or expired state");
        return Err(AppError::Validation("Invalid or expired OAuth state".to_string()));
    }
    if params.code.is_none() {
        return Err(AppError::Validation("Missing authorization code".to_string()));
    }

    // state and code are valid; the token exchange itself is not offered
    Err(AppError::NotImplemented)
}
