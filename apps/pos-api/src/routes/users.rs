//! Account management (admin only, enforced by `require_admin`).

use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Extension, Router};
use serde::Deserialize;
use tracing::info;

use pos_core::validation::{validate_name, validate_password, validate_username};
use pos_core::{Paginated, Role, User};
use pos_db::repository::user::{NewUser, UserUpdate};

use crate::auth::{hash_password, Actor};
use crate::error::ApiError;
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::response::ApiResponse;
use crate::routes::{ApiResult, PageQuery, CREATED, DELETED, RETRIEVED, SOFT_DELETED, UPDATED};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(create).get(list))
        .route("/users/deleted", get(list_deleted))
        .route("/users/{id}", get(show).put(update).delete(destroy))
        .route("/users/{id}/soft", delete(soft_delete))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
}

/// An empty or absent `password` keeps the current one.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    pub role: Role,
    pub full_name: String,
}

async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidJson(body): ValidJson<CreateUserRequest>,
) -> ApiResult<User> {
    let username = validate_username(&body.username)?;
    validate_password(&body.password)?;
    let full_name = validate_name("full_name", &body.full_name, 100)?;

    let user = state
        .db
        .users()
        .create(
            &NewUser {
                username,
                password_hash: hash_password(&body.password)?,
                role: body.role,
                full_name,
            },
            Some(actor.user_id),
        )
        .await?;

    info!(user_id = user.id, role = %user.role, "User created");

    Ok(ApiResponse::created(CREATED, user))
}

async fn list(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Paginated<User>> {
    let page = state.db.users().list(query.page_request()?).await?;
    Ok(ApiResponse::ok(RETRIEVED, page))
}

async fn list_deleted(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Paginated<User>> {
    let page = state.db.users().list_deleted(query.page_request()?).await?;
    Ok(ApiResponse::ok(RETRIEVED, page))
}

async fn show(State(state): State<AppState>, ValidPath(id): ValidPath<i64>) -> ApiResult<User> {
    let user = state
        .db
        .users()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("user", id))?;
    Ok(ApiResponse::ok(RETRIEVED, user))
}

async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(body): ValidJson<UpdateUserRequest>,
) -> ApiResult<User> {
    let username = validate_username(&body.username)?;
    let full_name = validate_name("full_name", &body.full_name, 100)?;
    let password_hash = match body.password.filter(|p| !p.is_empty()) {
        Some(password) => {
            validate_password(&password)?;
            Some(hash_password(&password)?)
        }
        None => None,
    };

    let user = state
        .db
        .users()
        .update(
            id,
            &UserUpdate {
                username,
                role: body.role,
                full_name,
                password_hash,
            },
            actor.user_id,
        )
        .await?;
    Ok(ApiResponse::ok(UPDATED, user))
}

async fn destroy(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<()> {
    ensure_not_self(&actor, id)?;
    state.db.users().hard_delete(id).await?;
    Ok(ApiResponse::message(DELETED))
}

async fn soft_delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<()> {
    ensure_not_self(&actor, id)?;
    state.db.users().soft_delete(id, actor.user_id).await?;
    Ok(ApiResponse::message(SOFT_DELETED))
}

fn ensure_not_self(actor: &Actor, id: i64) -> Result<(), ApiError> {
    if actor.user_id == id {
        return Err(ApiError::conflict("cannot delete your own account"));
    }
    Ok(())
}
