//! # pos-api: HTTP Server for Till POS
//!
//! axum router, JWT sessions and the JSON envelope around the pos-db
//! repositories and workflows.
//!
//! ## Route Layout
//! ```text
//! /api/v1
//! ├── GET  /                         public
//! ├── POST /auth/login               public
//! └── require_auth ─────────────────────────────────────────────
//!     ├── POST /auth/logout
//!     ├── /categories, /customers, /products   CRUD + soft delete
//!     ├── /product-history           ledger + manual adjustment
//!     ├── /transaction/order         place_order
//!     ├── /transaction/refund        refund_order
//!     ├── /reports/...               orders + monthly rankings
//!     └── require_admin ────────────────────────────────────────
//!         └── /users                 account management
//! ```
//!
//! Unknown paths answer `404` with the failed envelope.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pos_db::Database;

use crate::auth::JwtManager;
use crate::error::ApiError;
use crate::response::ApiResponse;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager) -> Self {
        AppState {
            db,
            jwt: Arc::new(jwt),
        }
    }
}

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(welcome))
        .merge(routes::auth::public_router());

    let admin = routes::users::router().route_layer(middleware::from_fn(auth::require_admin));

    let protected = Router::new()
        .merge(routes::auth::router())
        .merge(routes::categories::router())
        .merge(routes::customers::router())
        .merge(routes::products::router())
        .merge(routes::product_history::router())
        .merge(routes::transactions::router())
        .merge(routes::reports::router())
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .nest("/api/v1", public.merge(protected))
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn welcome() -> ApiResponse<()> {
    ApiResponse::message("welcome to Till POS API")
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("route not found")
}
