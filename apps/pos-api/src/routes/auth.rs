//! Login and logout.

use axum::extract::State;
use axum::routing::post;
use axum::{Extension, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use pos_core::validation::validate_username;
use pos_core::User;

use crate::auth::{verify_password, Actor};
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::response::ApiResponse;
use crate::routes::ApiResult;
use crate::AppState;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

const INVALID_CREDENTIALS: &str = "invalid username or password";

async fn login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let username = validate_username(&body.username)?;
    if body.password.is_empty() {
        return Err(ApiError::validation("password is required"));
    }

    let user = state
        .db
        .users()
        .find_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    if user.is_deleted() {
        warn!(username = %username, "Login rejected: account deleted");
        return Err(ApiError::unauthorized("account has been deleted"));
    }
    if !verify_password(&body.password, &user.password_hash) {
        warn!(username = %username, "Login rejected: wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let token = state.jwt.issue(&user)?;
    state.db.users().set_current_token(user.id, Some(&token)).await?;

    info!(user_id = user.id, "User logged in");

    Ok(ApiResponse::ok(
        "successfully logged in",
        LoginResponse { token, user },
    ))
}

async fn logout(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<()> {
    state.db.users().set_current_token(actor.user_id, None).await?;

    info!(user_id = actor.user_id, "User logged out");

    Ok(ApiResponse::message("successfully logged out"))
}
