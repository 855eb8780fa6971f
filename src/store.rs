//! In-memory site data and the core store operations
//!
//! All application state lives in a single [`SiteData`] value: the link
//! store, the visit log, the user directory and the active sessions. The
//! value is constructed once at startup and shared across handlers behind
//! one `RwLock` (see [`AppState`]); every operation here is synchronous and
//! CPU-only, so the lock is never held across an await point.
//!
//! Operations return a [`StoreError`] on failure and never partially
//! mutate: a failed update or delete leaves the store exactly as it was.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::id::{generate_id, LINK_ID_LEN, SESSION_TOKEN_LEN, USER_ID_LEN};
use crate::model::{LinkRecord, UserRecord, VisitRecord};
use crate::password;

/// Failure conditions of the core store operations
///
/// All variants are recoverable by the caller; the HTTP layer translates
/// them into status codes.
#[derive(Debug, PartialEq)]
pub enum StoreError {
    /// The referenced entity does not exist
    NotFound,
    /// The caller is authenticated but does not own the entity
    Forbidden,
    /// A required field is empty or whitespace-only
    InvalidInput(&'static str),
    /// A unique key (email) is already taken
    AlreadyExists,
    /// The supplied credentials do not verify
    Unauthorized,
    /// Unexpected internal failure (password hashing)
    Internal(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// All in-memory application state
///
/// Only persists while the process is running; there is no durable
/// storage by design.
#[derive(Default)]
pub struct SiteData {
    /// Short identifier -> link record
    links: HashMap<String, LinkRecord>,

    /// Append-only visit log, pruned only when a link is deleted
    visits: Vec<VisitRecord>,

    /// User id -> user record
    users: HashMap<String, UserRecord>,

    /// Session token -> user id
    sessions: HashMap<String, String>,

    /// Insertion counter for deterministic owner listings
    next_seq: u64,
}

impl SiteData {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Link store ---

    /// Creates a new link owned by `owner_id`
    ///
    /// The short identifier is drawn at random and re-drawn until it does
    /// not collide with any live key, so created links always have a key
    /// distinct from all existing ones.
    pub fn create_link(&mut self, long_url: String, owner_id: &str) -> LinkRecord {
        let id = loop {
            let candidate = generate_id(LINK_ID_LEN);
            if !self.links.contains_key(&candidate) {
                break candidate;
            }
        };

        let record = LinkRecord {
            id: id.clone(),
            long_url,
            owner_id: owner_id.to_string(),
            created_at: Utc::now(),
            visit_count: 0,
            unique_visitors: HashSet::new(),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.links.insert(id, record.clone());
        record
    }

    /// Looks up a link by its short identifier
    pub fn link(&self, id: &str) -> Result<&LinkRecord, StoreError> {
        self.links.get(id).ok_or(StoreError::NotFound)
    }

    /// Replaces the long URL of a link owned by `caller_id`
    ///
    /// Only `long_url` changes; id, owner and visit metrics are untouched.
    pub fn update_link(
        &mut self,
        id: &str,
        caller_id: &str,
        new_long_url: String,
    ) -> Result<LinkRecord, StoreError> {
        let record = self.links.get_mut(id).ok_or(StoreError::NotFound)?;
        if record.owner_id != caller_id {
            return Err(StoreError::Forbidden);
        }
        record.long_url = new_long_url;
        Ok(record.clone())
    }

    /// Deletes a link owned by `caller_id`
    ///
    /// The link's visit records are deleted along with it.
    pub fn delete_link(&mut self, id: &str, caller_id: &str) -> Result<(), StoreError> {
        let record = self.links.get(id).ok_or(StoreError::NotFound)?;
        if record.owner_id != caller_id {
            return Err(StoreError::Forbidden);
        }
        self.links.remove(id);
        self.visits.retain(|visit| visit.link_id != id);
        Ok(())
    }

    /// Returns all links owned by `owner_id`, in creation order
    pub fn links_by_owner(&self, owner_id: &str) -> Vec<&LinkRecord> {
        let mut owned: Vec<&LinkRecord> = self
            .links
            .values()
            .filter(|record| record.owner_id == owner_id)
            .collect();
        owned.sort_by_key(|record| record.seq);
        owned
    }

    /// Records one visit to a link and returns its long URL
    ///
    /// Every call increments `visit_count`; `visitor_id` joins the
    /// unique-visitor set at most once regardless of repeat visits.
    pub fn record_visit(&mut self, id: &str, visitor_id: &str) -> Result<String, StoreError> {
        let record = self.links.get_mut(id).ok_or(StoreError::NotFound)?;
        record.visit_count += 1;
        record.unique_visitors.insert(visitor_id.to_string());
        self.visits.push(VisitRecord {
            visitor_id: visitor_id.to_string(),
            link_id: id.to_string(),
            visited_at: Utc::now(),
        });
        Ok(record.long_url.clone())
    }

    /// Returns the visit log of a link owned by `caller_id`, oldest first
    pub fn visits_for_link(
        &self,
        id: &str,
        caller_id: &str,
    ) -> Result<Vec<&VisitRecord>, StoreError> {
        let record = self.links.get(id).ok_or(StoreError::NotFound)?;
        if record.owner_id != caller_id {
            return Err(StoreError::Forbidden);
        }
        Ok(self
            .visits
            .iter()
            .filter(|visit| visit.link_id == id)
            .collect())
    }

    // --- User directory ---

    /// Registers a new user
    ///
    /// Emails are compared with a case-sensitive exact match; a duplicate
    /// registration fails with `AlreadyExists` and leaves the directory
    /// unchanged.
    pub fn register(&mut self, email: &str, password: &str) -> Result<UserRecord, StoreError> {
        if email.trim().is_empty() || password.trim().is_empty() {
            return Err(StoreError::InvalidInput(
                "email and password must not be empty",
            ));
        }
        if self.users.values().any(|user| user.email == email) {
            return Err(StoreError::AlreadyExists);
        }

        let password_hash = password::hash_password(password)
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let id = loop {
            let candidate = generate_id(USER_ID_LEN);
            if !self.users.contains_key(&candidate) {
                break candidate;
            }
        };

        let user = UserRecord {
            id: id.clone(),
            email: email.to_string(),
            password_hash,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    /// Checks credentials and returns the matching user
    pub fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord, StoreError> {
        if email.trim().is_empty() || password.trim().is_empty() {
            return Err(StoreError::InvalidInput(
                "email and password must not be empty",
            ));
        }
        let user = self
            .users
            .values()
            .find(|user| user.email == email)
            .ok_or(StoreError::NotFound)?;

        let verified = password::verify_password(password, &user.password_hash)
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        if !verified {
            return Err(StoreError::Unauthorized);
        }
        Ok(user.clone())
    }

    // --- Sessions ---

    /// Opens a session for a user and returns the bearer token
    pub fn open_session(&mut self, user_id: &str) -> String {
        let token = loop {
            let candidate = generate_id(SESSION_TOKEN_LEN);
            if !self.sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        self.sessions.insert(token.clone(), user_id.to_string());
        token
    }

    /// Resolves a session token to its user, if the session is still open
    pub fn session_user(&self, token: &str) -> Option<&UserRecord> {
        self.sessions
            .get(token)
            .and_then(|user_id| self.users.get(user_id))
    }

    /// Closes a session; returns whether the token was known
    pub fn close_session(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }
}

/// Application state shared across all request handlers
///
/// Constructed once at process start; the lock serializes all mutations so
/// the uniqueness and ownership invariants hold on a multi-threaded
/// runtime.
#[derive(Clone, Default)]
pub struct AppState {
    pub site: Arc<RwLock<SiteData>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::LINK_ID_LEN;

    fn registered(site: &mut SiteData, email: &str) -> UserRecord {
        site.register(email, "pw123456").expect("register should succeed")
    }

    #[test]
    fn create_link_inserts_a_fresh_record() {
        let mut site = SiteData::new();
        let record = site.create_link("http://example.com".into(), "user-1");

        assert_eq!(record.id.len(), LINK_ID_LEN);
        assert_eq!(record.owner_id, "user-1");
        assert_eq!(record.long_url, "http://example.com");
        assert_eq!(record.visit_count, 0);
        assert!(record.unique_visitors.is_empty());

        let stored = site.link(&record.id).unwrap();
        assert_eq!(stored.long_url, "http://example.com");
    }

    #[test]
    fn link_lookup_fails_for_unknown_id() {
        let site = SiteData::new();
        assert_eq!(site.link("nope42").unwrap_err(), StoreError::NotFound);
    }

    #[test]
    fn update_requires_existence_and_ownership() {
        let mut site = SiteData::new();
        let record = site.create_link("http://example.com".into(), "user-1");

        assert_eq!(
            site.update_link("missing", "user-1", "http://other.com".into())
                .unwrap_err(),
            StoreError::NotFound
        );
        assert_eq!(
            site.update_link(&record.id, "user-2", "http://other.com".into())
                .unwrap_err(),
            StoreError::Forbidden
        );
        // A rejected update leaves the record unchanged
        assert_eq!(site.link(&record.id).unwrap().long_url, "http://example.com");

        let updated = site
            .update_link(&record.id, "user-1", "http://other.com".into())
            .unwrap();
        assert_eq!(updated.long_url, "http://other.com");
        assert_eq!(updated.id, record.id);
        assert_eq!(updated.owner_id, "user-1");
    }

    #[test]
    fn delete_requires_existence_and_ownership() {
        let mut site = SiteData::new();
        let record = site.create_link("http://example.com".into(), "user-1");

        assert_eq!(
            site.delete_link("missing", "user-1").unwrap_err(),
            StoreError::NotFound
        );
        assert_eq!(
            site.delete_link(&record.id, "user-2").unwrap_err(),
            StoreError::Forbidden
        );
        assert!(site.link(&record.id).is_ok());

        site.delete_link(&record.id, "user-1").unwrap();
        assert_eq!(site.link(&record.id).unwrap_err(), StoreError::NotFound);
    }

    #[test]
    fn delete_cascades_to_visit_records() {
        let mut site = SiteData::new();
        let kept = site.create_link("http://example.com/a".into(), "user-1");
        let dropped = site.create_link("http://example.com/b".into(), "user-1");

        site.record_visit(&kept.id, "visitor-A").unwrap();
        site.record_visit(&dropped.id, "visitor-A").unwrap();
        site.record_visit(&dropped.id, "visitor-B").unwrap();

        site.delete_link(&dropped.id, "user-1").unwrap();

        assert_eq!(site.visits_for_link(&kept.id, "user-1").unwrap().len(), 1);
        assert!(site.visits.iter().all(|visit| visit.link_id == kept.id));
    }

    #[test]
    fn listing_is_owner_scoped_and_in_creation_order() {
        let mut site = SiteData::new();
        let first = site.create_link("http://example.com/1".into(), "user-1");
        let other = site.create_link("http://example.com/2".into(), "user-2");
        let second = site.create_link("http://example.com/3".into(), "user-1");

        let owned = site.links_by_owner("user-1");
        let ids: Vec<&str> = owned.iter().map(|record| record.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
        assert!(!ids.contains(&other.id.as_str()));

        assert!(site.links_by_owner("user-3").is_empty());
    }

    #[test]
    fn visits_increment_count_and_dedupe_visitors() {
        let mut site = SiteData::new();
        let record = site.create_link("http://example.com".into(), "user-1");

        let target = site.record_visit(&record.id, "visitor-A").unwrap();
        assert_eq!(target, "http://example.com");
        site.record_visit(&record.id, "visitor-A").unwrap();
        site.record_visit(&record.id, "visitor-B").unwrap();

        let stored = site.link(&record.id).unwrap();
        assert_eq!(stored.visit_count, 3);
        assert_eq!(stored.unique_visitors.len(), 2);

        assert_eq!(
            site.record_visit("missing", "visitor-A").unwrap_err(),
            StoreError::NotFound
        );
    }

    #[test]
    fn visit_log_is_owner_scoped() {
        let mut site = SiteData::new();
        let record = site.create_link("http://example.com".into(), "user-1");
        site.record_visit(&record.id, "visitor-A").unwrap();
        site.record_visit(&record.id, "visitor-B").unwrap();

        let visits = site.visits_for_link(&record.id, "user-1").unwrap();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].visitor_id, "visitor-A");
        assert_eq!(visits[1].visitor_id, "visitor-B");

        assert_eq!(
            site.visits_for_link(&record.id, "user-2").unwrap_err(),
            StoreError::Forbidden
        );
        assert_eq!(
            site.visits_for_link("missing", "user-1").unwrap_err(),
            StoreError::NotFound
        );
    }

    #[test]
    fn register_rejects_blank_fields() {
        let mut site = SiteData::new();
        assert!(matches!(
            site.register("", "pw").unwrap_err(),
            StoreError::InvalidInput(_)
        ));
        assert!(matches!(
            site.register("a@x.com", "   ").unwrap_err(),
            StoreError::InvalidInput(_)
        ));
    }

    #[test]
    fn register_rejects_duplicate_email() {
        let mut site = SiteData::new();
        registered(&mut site, "a@x.com");
        assert_eq!(
            site.register("a@x.com", "pw2").unwrap_err(),
            StoreError::AlreadyExists
        );
        // Exact match only: a different casing is a different account
        assert!(site.register("A@x.com", "pw2").is_ok());
        assert_eq!(site.users.len(), 2);
    }

    #[test]
    fn register_never_stores_the_raw_password() {
        let mut site = SiteData::new();
        let user = registered(&mut site, "a@x.com");
        assert_ne!(user.password_hash, "pw123456");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn authenticate_checks_credentials() {
        let mut site = SiteData::new();
        let user = registered(&mut site, "a@x.com");

        let found = site.authenticate("a@x.com", "pw123456").unwrap();
        assert_eq!(found.id, user.id);

        assert_eq!(
            site.authenticate("b@x.com", "pw123456").unwrap_err(),
            StoreError::NotFound
        );
        assert_eq!(
            site.authenticate("a@x.com", "wrong").unwrap_err(),
            StoreError::Unauthorized
        );
        assert!(matches!(
            site.authenticate("", "pw123456").unwrap_err(),
            StoreError::InvalidInput(_)
        ));
    }

    #[test]
    fn session_round_trip() {
        let mut site = SiteData::new();
        let user = registered(&mut site, "a@x.com");

        let token = site.open_session(&user.id);
        assert_eq!(site.session_user(&token).unwrap().id, user.id);

        assert!(site.close_session(&token));
        assert!(site.session_user(&token).is_none());
        assert!(!site.close_session(&token));
    }
}
