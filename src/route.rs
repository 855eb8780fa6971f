//! Route definitions for the tinylink API
//!
//! This module configures all HTTP routes and maps them to their respective
//! handlers. It creates the axum router with the application state.

use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::handler::{
    create_link, delete_link, follow_link, get_link, list_links, list_visits, login, logout,
    register, update_link,
};
use crate::middleware::session_middleware;
use crate::store::AppState;

/// Creates and configures the axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /{id}` - Follows a short link to its original URL (public)
/// - `POST /api/auth/register` - Creates an account and opens a session
/// - `POST /api/auth/login` - Opens a session for an existing account
/// - `POST /api/auth/logout` - Closes the caller's session
/// - `GET /api/urls` - Lists the caller's links
/// - `POST /api/urls` - Creates a new short link
/// - `GET /api/urls/{id}` - Shows one of the caller's links
/// - `PUT /api/urls/{id}` - Updates a link's target URL
/// - `DELETE /api/urls/{id}` - Deletes a link
/// - `GET /api/urls/{id}/visits` - Lists a link's visit log
///
/// Every route passes through the session middleware, which resolves the
/// bearer token into the caller identity; handlers decide whether a login
/// is required.
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/urls", get(list_links).post(create_link))
        .route(
            "/urls/{id}",
            get(get_link).put(update_link).delete(delete_link),
        )
        .route("/urls/{id}/visits", get(list_visits));

    Router::new()
        // Public redirect endpoint - resolves a short link and records the visit
        .route("/{id}", get(follow_link))
        // Mount API routes under /api
        .nest("/api", api_routes)
        // Resolve the session token into the caller identity for all routes
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        // Inject the application state into all handlers
        .with_state(state)
}
