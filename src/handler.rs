//! HTTP request handlers for the tinylink API
//!
//! This module implements the route-facing logic for:
//! - Registering, logging in and logging out users
//! - Creating, listing, updating and deleting short links
//! - Following a short link to its original destination
//! - Per-link visit analytics
//!
//! Handlers resolve the caller identity from the request extension set by
//! the session middleware, call the store, and translate store errors into
//! HTTP status codes and JSON error bodies.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde_json::json;

use crate::id::{generate_id, VISITOR_ID_LEN};
use crate::middleware::{bearer_token, CurrentUser};
use crate::model::{
    AuthRequest, AuthResponse, CreateLinkRequest, LinkRecord, LinkResponse, UpdateLinkRequest,
    UserResponse,
};
use crate::store::{AppState, StoreError};

/// Translates store failures into HTTP status codes and JSON error bodies
///
/// - `NotFound` → **404**
/// - `Forbidden` → **403**
/// - `InvalidInput` → **400**
/// - `AlreadyExists` → **409**
/// - `Unauthorized` → **401**
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            StoreError::NotFound => (StatusCode::NOT_FOUND, "not_found", "Not found".to_string()),
            StoreError::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "You are not the owner of this link".to_string(),
            ),
            StoreError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_input", msg.to_string())
            }
            StoreError::AlreadyExists => (
                StatusCode::CONFLICT,
                "already_exists",
                "A user with this email already exists".to_string(),
            ),
            StoreError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Email and password do not match".to_string(),
            ),
            StoreError::Internal(detail) => {
                tracing::error!(%detail, "internal store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({
                "error": message,
                "code": code
            })),
        )
            .into_response()
    }
}

/// Requires an authenticated caller, or returns a 401 response
fn require_login(current: Option<CurrentUser>) -> Result<CurrentUser, Response> {
    current.ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "You must be logged in",
                "code": "unauthorized"
            })),
        )
            .into_response()
    })
}

/// Builds the public view of a link, including its full short URL
fn link_response(record: &LinkRecord) -> LinkResponse {
    let base_url = std::env::var("URL").unwrap_or_else(|_| "http://localhost".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    LinkResponse {
        id: record.id.clone(),
        short_url: format!("{}:{}/{}", base_url, port, record.id),
        long_url: record.long_url.clone(),
        owner_id: record.owner_id.clone(),
        created_at: record.created_at,
        visit_count: record.visit_count,
        unique_visitors: record.unique_visitors.len() as u64,
    }
}

/// Registers a new user
///
/// On success the user is logged in immediately and a session token is
/// returned alongside the account.
///
/// # Response
///
/// - **201 Created** - Account created, session opened
/// - **400 Bad Request** - Empty or whitespace-only email/password
/// - **409 Conflict** - Email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Response {
    let mut site = state.site.write().unwrap();

    let user = match site.register(&payload.email, &payload.password) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    let token = site.open_session(&user.id);

    (
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserResponse::from(&user),
            token,
        }),
    )
        .into_response()
}

/// Logs a user in with email and password
///
/// # Response
///
/// - **200 OK** - Credentials verified, session opened
/// - **400 Bad Request** - Empty fields
/// - **404 Not Found** - No account with this email
/// - **401 Unauthorized** - Password does not match
pub async fn login(State(state): State<AppState>, Json(payload): Json<AuthRequest>) -> Response {
    let mut site = state.site.write().unwrap();

    let user = match site.authenticate(&payload.email, &payload.password) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    let token = site.open_session(&user.id);

    Json(AuthResponse {
        user: UserResponse::from(&user),
        token,
    })
    .into_response()
}

/// Logs the caller out by closing their session
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<Option<CurrentUser>>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = require_login(current) {
        return response;
    }

    // A resolved CurrentUser implies a valid bearer token was sent
    if let Some(token) = bearer_token(&headers) {
        state.site.write().unwrap().close_session(token);
    }

    Json(json!({ "message": "Logged out" })).into_response()
}

/// Creates a new short link owned by the caller
///
/// A random 6-character identifier is generated and re-generated until it
/// does not collide with an existing link.
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/very/long/url" }
/// ```
///
/// # Response
///
/// - **201 Created** - Link created
/// - **401 Unauthorized** - Caller is not logged in
pub async fn create_link(
    State(state): State<AppState>,
    Extension(current): Extension<Option<CurrentUser>>,
    Json(payload): Json<CreateLinkRequest>,
) -> Response {
    let current = match require_login(current) {
        Ok(current) => current,
        Err(response) => return response,
    };

    let mut site = state.site.write().unwrap();
    let record = site.create_link(payload.url, &current.id);

    (StatusCode::CREATED, Json(link_response(&record))).into_response()
}

/// Lists the caller's links in creation order
///
/// Only links owned by the caller are returned.
pub async fn list_links(
    State(state): State<AppState>,
    Extension(current): Extension<Option<CurrentUser>>,
) -> Response {
    let current = match require_login(current) {
        Ok(current) => current,
        Err(response) => return response,
    };

    let site = state.site.read().unwrap();
    let data: Vec<LinkResponse> = site
        .links_by_owner(&current.id)
        .into_iter()
        .map(link_response)
        .collect();

    Json(json!({
        "total": data.len(),
        "data": data
    }))
    .into_response()
}

/// Shows one of the caller's links, with its visit metrics
///
/// # Response
///
/// - **200 OK** - Link details
/// - **404 Not Found** - Link does not exist
/// - **403 Forbidden** - Caller does not own this link
pub async fn get_link(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(current): Extension<Option<CurrentUser>>,
) -> Response {
    let current = match require_login(current) {
        Ok(current) => current,
        Err(response) => return response,
    };

    let site = state.site.read().unwrap();
    let record = match site.link(&id) {
        Ok(record) => record,
        Err(err) => return err.into_response(),
    };
    if record.owner_id != current.id {
        return StoreError::Forbidden.into_response();
    }

    Json(link_response(record)).into_response()
}

/// Updates the target URL of one of the caller's links
///
/// # Response
///
/// - **200 OK** - Link updated
/// - **404 Not Found** - Link does not exist
/// - **403 Forbidden** - Caller does not own this link
pub async fn update_link(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(current): Extension<Option<CurrentUser>>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Response {
    let current = match require_login(current) {
        Ok(current) => current,
        Err(response) => return response,
    };

    let mut site = state.site.write().unwrap();
    match site.update_link(&id, &current.id, payload.url) {
        Ok(record) => Json(link_response(&record)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Deletes one of the caller's links
///
/// The link's visit records are removed along with it.
///
/// # Response
///
/// - **200 OK** - Link deleted
/// - **404 Not Found** - Link does not exist
/// - **403 Forbidden** - Caller does not own this link
pub async fn delete_link(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(current): Extension<Option<CurrentUser>>,
) -> Response {
    let current = match require_login(current) {
        Ok(current) => current,
        Err(response) => return response,
    };

    let mut site = state.site.write().unwrap();
    match site.delete_link(&id, &current.id) {
        Ok(()) => Json(json!({
            "message": "Short link deleted successfully",
            "deleted_id": id
        }))
        .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Lists the visit log of one of the caller's links, oldest first
pub async fn list_visits(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(current): Extension<Option<CurrentUser>>,
) -> Response {
    let current = match require_login(current) {
        Ok(current) => current,
        Err(response) => return response,
    };

    let site = state.site.read().unwrap();
    match site.visits_for_link(&id, &current.id) {
        Ok(visits) => Json(json!({
            "total": visits.len(),
            "data": visits
        }))
        .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Reads the anonymous visitor id replayed by the browser, if any
fn visitor_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "visitor_id")
        .map(|(_, value)| value.to_string())
}

/// Follows a short link to its original destination
///
/// This is the only route callable without a login. The visit is recorded
/// under the caller's user id when logged in; anonymous visitors get a
/// stable per-browser id persisted in a `visitor_id` cookie, so repeat
/// visits count as one unique visitor.
///
/// # Response
///
/// - **307 Temporary Redirect** - Redirects to the original URL
/// - **404 Not Found** - Short link does not exist
///
/// # Note
///
/// Uses 307 Temporary Redirect instead of 301 Permanent Redirect to:
/// - Allow visit statistics tracking
/// - Enable link updates or deletion
/// - Prevent browser caching
pub async fn follow_link(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(current): Extension<Option<CurrentUser>>,
    headers: HeaderMap,
) -> Response {
    let (visitor_id, is_new_visitor) = match (&current, visitor_cookie(&headers)) {
        (Some(user), _) => (user.id.clone(), false),
        (None, Some(cookie_id)) => (cookie_id, false),
        (None, None) => (generate_id(VISITOR_ID_LEN), true),
    };

    let mut site = state.site.write().unwrap();
    match site.record_visit(&id, &visitor_id) {
        Ok(long_url) => {
            let mut response = Redirect::temporary(&long_url).into_response();
            if is_new_visitor {
                // Hand the fresh anonymous id back so the browser replays it
                let cookie = format!("visitor_id={}; Path=/; HttpOnly", visitor_id);
                if let Ok(value) = cookie.parse() {
                    response.headers_mut().insert(header::SET_COOKIE, value);
                }
            }
            response
        }
        Err(err) => err.into_response(),
    }
}
