use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::store::AppState;

/// The authenticated caller of a request, resolved from the session token
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
}

/// Extracts the bearer token from the `Authorization` header, if any
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Middleware resolving the session token into an `Option<CurrentUser>`
/// request extension
///
/// The middleware never rejects a request: handlers that require a login
/// check for the extension's presence themselves, and the public redirect
/// route uses the identity only to attribute the visit.
pub async fn session_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let current = bearer_token(&headers).and_then(|token| {
        let site = state.site.read().unwrap();
        site.session_user(token).map(|user| CurrentUser {
            id: user.id.clone(),
            email: user.email.clone(),
        })
    });

    request.extensions_mut().insert(current);
    next.run(request).await
}
