//! Data models for the tinylink application
//!
//! This module defines all the data structures used throughout the application:
//! the stored entities (links, visits, users) and the request/response shapes
//! of the JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A stored short-to-long URL mapping
///
/// The `id` is the short identifier under which the record lives in the store.
/// It is generated at creation and never changes; only `long_url` is mutable
/// (and only by the owner).
#[derive(Debug, Clone)]
pub struct LinkRecord {
    /// Short identifier/slug for the link (e.g. "b2xVn2")
    pub id: String,

    /// The original long URL this link redirects to
    pub long_url: String,

    /// Id of the user who created the link; controls update/delete rights
    pub owner_id: String,

    /// Timestamp when this link was created
    pub created_at: DateTime<Utc>,

    /// Number of times this link has been followed
    pub visit_count: u64,

    /// Visitor identities that have followed this link at least once
    pub unique_visitors: HashSet<String>,

    /// Insertion sequence number, used to keep owner listings in
    /// creation order
    pub(crate) seq: u64,
}

/// A single resolution event of a short link
///
/// Visits reference their link by id only; they are removed together with
/// the link when it is deleted.
#[derive(Serialize, Debug, Clone)]
pub struct VisitRecord {
    /// Identity of the visitor (user id or anonymous visitor id)
    pub visitor_id: String,

    /// Short identifier of the link that was followed
    pub link_id: String,

    /// Timestamp of the visit
    pub visited_at: DateTime<Utc>,
}

/// A registered user account
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Unique user id, generated at registration
    pub id: String,

    /// Email address, unique across all users (case-sensitive exact match)
    pub email: String,

    /// Argon2id hash of the user's password; the raw password is never stored
    pub password_hash: String,
}

/// Request payload for registration and login
///
/// # Example
/// ```json
/// {
///   "email": "user@example.com",
///   "password": "hunter2"
/// }
/// ```
#[derive(Deserialize)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

/// Request payload for creating a short link
#[derive(Deserialize)]
pub struct CreateLinkRequest {
    /// The original URL to be shortened
    pub url: String,
}

/// Request payload for updating a link's target URL
#[derive(Deserialize)]
pub struct UpdateLinkRequest {
    /// The new long URL
    pub url: String,
}

/// Public view of a user account, safe to return in API responses
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
        }
    }
}

/// Response returned by register and login, carrying the session token
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    /// Bearer token to send in the `Authorization` header
    pub token: String,
}

/// Public view of a link, including visit metrics
///
/// # Example
/// ```json
/// {
///   "id": "b2xVn2",
///   "short_url": "http://localhost:8080/b2xVn2",
///   "long_url": "http://www.example.com/some/long/path",
///   "owner_id": "a1b2c3d4",
///   "created_at": "2026-08-25T13:40:00Z",
///   "visit_count": 4,
///   "unique_visitors": 2
/// }
/// ```
#[derive(Serialize)]
pub struct LinkResponse {
    pub id: String,

    /// The complete shortened URL (e.g. "http://localhost:8080/b2xVn2")
    pub short_url: String,

    pub long_url: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub visit_count: u64,

    /// Number of distinct visitors, each counted at most once
    pub unique_visitors: u64,
}
