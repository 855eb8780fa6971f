//! Random identifier generation
//!
//! Produces fixed-length URL-safe tokens over the alphanumeric alphabet.
//! The generator is stateless and makes no uniqueness guarantee; callers
//! inserting into a keyed collection must check for collisions and
//! regenerate.

use rand::{distr::Alphanumeric, Rng};

/// Length of short link identifiers
pub const LINK_ID_LEN: usize = 6;

/// Length of user ids
pub const USER_ID_LEN: usize = 8;

/// Length of anonymous visitor ids
pub const VISITOR_ID_LEN: usize = 16;

/// Length of session tokens
pub const SESSION_TOKEN_LEN: usize = 32;

/// Generates a random alphanumeric identifier of the given length
pub fn generate_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
